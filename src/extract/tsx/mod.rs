//! Editor documentation pages written as Next.js `page.tsx` components.
//!
//! The page text lives in JSX text nodes, headings are elements styled with
//! `text-{2..6}xl` classes and code samples are template-literal constants
//! handed to `<CodeBlock code={..}>`.


use chrono::{DateTime, Utc};
use fancy_regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;
use tree_sitter::{Language, Node, Parser};

use super::markdown::{file_modified, slugify};
use crate::records::{CodeBlock, DocumentMetadata, Heading};
use crate::{DocsError, Result};

const DESCRIPTION_MAX_CHARS: usize = 200;
const KEYWORD_LIMIT: usize = 10;

const STOP_WORDS: &[&str] = &[
    "the", "be", "to", "of", "and", "a", "in", "that", "have", "i", "it", "for", "not", "on",
    "with", "he", "as", "you", "do", "at", "this", "but", "his", "by", "from", "they", "we",
    "say", "her", "she", "or", "an", "will", "my", "one", "all", "would", "there", "their",
];

static CSS_DECLARATION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w\s-]+:").expect("valid regex"));

static UTILITY_CLASS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bflex\b|\bgrid\b|\btext-\w+|\bbg-\w+|\bp-\d+|\bm-\d+").expect("valid regex")
});

static CLASS_TOKEN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w-]+$").expect("valid regex"));

static HEADING_SIZE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"text-([2-6])xl").expect("valid regex"));

static CODE_PUNCTUATION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[{};()=>]").expect("valid regex"));

static TYPESCRIPT_HINT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"import.*from|export|const|let|interface|type").expect("valid regex")
});

static JAVASCRIPT_HINT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"function|var|const|=&gt;").expect("valid regex"));

static JSX_HINT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[a-zA-Z].*>").expect("valid regex"));

static CATEGORY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"documentation/(.+?)/page\.tsx").expect("valid regex"));

static SENTENCE_SPLIT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+").expect("valid regex"));

static NON_WORD_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s]").expect("valid regex"));

/// Parse an editor documentation page from disk
#[inline]
pub fn parse_tsx_file(path: &Path) -> Result<DocumentMetadata> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        DocsError::Extraction(format!("Failed to read {}: {}", path.display(), e))
    })?;
    let last_modified = file_modified(path)?;

    parse_tsx(&text, &path.to_string_lossy(), last_modified)
}

/// Parse the source of a `page.tsx` component
#[inline]
pub fn parse_tsx(
    source: &str,
    file_path: &str,
    last_modified: DateTime<Utc>,
) -> Result<DocumentMetadata> {
    let mut parser = Parser::new();
    let language: Language = tree_sitter_typescript::LANGUAGE_TSX.into();
    parser
        .set_language(&language)
        .map_err(|e| DocsError::Extraction(format!("Failed to load TSX grammar: {}", e)))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| DocsError::Extraction(format!("Failed to parse {}", file_path)))?;
    let root = tree.root_node();
    let src = source.as_bytes();

    let mut texts = Vec::new();
    collect_page_text(root, src, &mut texts);
    let content = texts.join("\n\n");

    let mut headings = Vec::new();
    collect_headings(root, src, &mut headings);

    let code_blocks = collect_code_blocks(root, src);

    let normalized_path = file_path.replace('\\', "/");
    let title = match headings.first() {
        Some(heading) if heading.level == 1 => heading.text.clone(),
        _ => title_from_path(&normalized_path),
    };
    let category = extract_category(&normalized_path);
    let breadcrumbs = category
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect();

    debug!(
        "Parsed TSX page {}: {} text blocks, {} headings, {} code blocks",
        file_path,
        texts.len(),
        headings.len(),
        code_blocks.len()
    );

    Ok(DocumentMetadata {
        file_path: file_path.to_string(),
        title,
        description: generate_description(&content),
        keywords: extract_keywords(&content),
        category,
        breadcrumbs,
        content,
        headings,
        code_blocks,
        further_reading: Vec::new(),
        playground_ids: Vec::new(),
        last_modified,
    })
}

fn node_text<'a>(node: Node<'_>, src: &'a [u8]) -> &'a str {
    node.utf8_text(src).unwrap_or_default()
}

fn collect_page_text(node: Node<'_>, src: &[u8], out: &mut Vec<String>) {
    if node.kind() == "jsx_attribute" {
        return;
    }
    for run in text_runs(node, src) {
        let text = run.trim();
        if !text.is_empty() && !is_class_name_or_style(text) {
            out.push(text.to_string());
        }
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_page_text(child, src, out);
    }
}

/// Uninterrupted JSX text among the direct children of `node`.
///
/// The grammar may split one stretch of text into several tokens (per line or
/// around character references); a run spans all of them.
fn text_runs<'a>(node: Node<'_>, src: &'a [u8]) -> Vec<&'a str> {
    let mut runs = Vec::new();
    let mut current: Option<(usize, usize)> = None;

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if matches!(child.kind(), "jsx_text" | "html_character_reference") {
            let start = current.map_or(child.start_byte(), |(start, _)| start);
            current = Some((start, child.end_byte()));
        } else if let Some(range) = current.take() {
            runs.push(range);
        }
    }
    runs.extend(current);

    runs.into_iter()
        .filter_map(|(start, end)| src.get(start..end))
        .filter_map(|bytes| std::str::from_utf8(bytes).ok())
        .collect()
}

/// Whether a JSX text fragment looks like styling rather than prose
#[inline]
pub fn is_class_name_or_style(text: &str) -> bool {
    if CSS_DECLARATION_REGEX.is_match(text).unwrap_or(false) {
        return true;
    }
    if UTILITY_CLASS_REGEX.is_match(text).unwrap_or(false) {
        return true;
    }

    let words: Vec<&str> = text.split(' ').collect();
    words.len() > 3
        && words
            .iter()
            .all(|word| CLASS_TOKEN_REGEX.is_match(word).unwrap_or(false))
}

/// The element tag carrying the name and attributes of a JSX element
fn element_tag(node: Node<'_>) -> Option<Node<'_>> {
    match node.kind() {
        "jsx_element" => node.child_by_field_name("open_tag"),
        "jsx_self_closing_element" => Some(node),
        _ => None,
    }
}

fn element_name<'a>(tag: Node<'_>, src: &'a [u8]) -> &'a str {
    tag.child_by_field_name("name")
        .map(|name| node_text(name, src))
        .unwrap_or_default()
}

/// Value of a JSX attribute: string contents, or the source of an expression
fn attribute_value<'a>(tag: Node<'_>, name: &str, src: &'a [u8]) -> Option<&'a str> {
    let mut cursor = tag.walk();
    let attribute = tag
        .named_children(&mut cursor)
        .filter(|child| child.kind() == "jsx_attribute")
        .find(|attribute| {
            attribute
                .named_child(0)
                .is_some_and(|attr_name| node_text(attr_name, src) == name)
        })?;

    let value = attribute.named_child(1)?;
    match value.kind() {
        "string" => {
            let quoted = node_text(value, src);
            Some(
                quoted
                    .strip_prefix(['"', '\''])
                    .and_then(|s| s.strip_suffix(['"', '\'']))
                    .unwrap_or(quoted),
            )
        }
        "jsx_expression" => value.named_child(0).map(|expr| node_text(expr, src)),
        _ => Some(node_text(value, src)),
    }
}

fn collect_headings(node: Node<'_>, src: &[u8], out: &mut Vec<Heading>) {
    if let Some(level) = heading_level(node, src) {
        let text = element_text(node, src);
        if !text.is_empty() {
            out.push(Heading {
                level,
                id: slugify(&text),
                text,
            });
        }
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_headings(child, src, out);
    }
}

/// Heading level implied by a `text-{n}xl` class: 6,5 -> 1; 4,3 -> 2; 2 -> 3
fn heading_level(node: Node<'_>, src: &[u8]) -> Option<u8> {
    let tag = element_tag(node)?;
    let class_name = attribute_value(tag, "className", src)?;
    let captures = HEADING_SIZE_REGEX.captures(class_name).ok()??;
    let level = match captures.get(1)?.as_str() {
        "6" | "5" => 1,
        "4" | "3" => 2,
        _ => 3,
    };
    Some(level)
}

/// Text of the element's children, ignoring its own tags and attributes
fn element_text(node: Node<'_>, src: &[u8]) -> String {
    fn visit(node: Node<'_>, src: &[u8], out: &mut Vec<String>) {
        if node.kind() == "jsx_attribute" {
            return;
        }
        out.extend(
            text_runs(node, src)
                .into_iter()
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .map(str::to_string),
        );
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if !matches!(child.kind(), "jsx_opening_element" | "jsx_closing_element") {
                visit(child, src, out);
            }
        }
    }

    let mut texts = Vec::new();
    visit(node, src, &mut texts);
    texts.join(" ").trim().to_string()
}

fn collect_code_blocks(root: Node<'_>, src: &[u8]) -> Vec<CodeBlock> {
    let mut variables = HashMap::new();
    collect_code_variables(root, src, &mut variables);

    let mut blocks = Vec::new();
    collect_code_block_elements(root, src, &variables, &mut blocks);
    blocks
}

fn collect_code_variables<'a>(node: Node<'_>, src: &'a [u8], out: &mut HashMap<&'a str, String>) {
    if let Some((name, code)) = code_variable(node, src) {
        out.insert(name, code);
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_code_variables(child, src, out);
    }
}

/// `const name = `...`` declarations whose template literal looks like code
fn code_variable<'a>(node: Node<'_>, src: &'a [u8]) -> Option<(&'a str, String)> {
    if node.kind() != "variable_declarator" {
        return None;
    }
    let name = node.child_by_field_name("name")?;
    let value = node.child_by_field_name("value")?;
    if value.kind() != "template_string" {
        return None;
    }
    let code = template_text(node_text(value, src));
    looks_like_code(&code).then(|| (node_text(name, src), code))
}

fn collect_code_block_elements(
    node: Node<'_>,
    src: &[u8],
    variables: &HashMap<&str, String>,
    out: &mut Vec<CodeBlock>,
) {
    if let Some(code) = referenced_code(node, src, variables) {
        out.push(CodeBlock {
            language: detect_language(code).to_string(),
            code: code.trim().to_string(),
            line_start: 0,
        });
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_code_block_elements(child, src, variables, out);
    }
}

/// Code of the variable a `<CodeBlock code={..}>` element points at
fn referenced_code<'v>(
    node: Node<'_>,
    src: &[u8],
    variables: &'v HashMap<&str, String>,
) -> Option<&'v String> {
    let tag = element_tag(node)?;
    if element_name(tag, src) != "CodeBlock" {
        return None;
    }
    let reference = attribute_value(tag, "code", src)?;
    variables.get(reference)
}

/// Template literal body without the backticks, with escaped delimiters restored
fn template_text(literal: &str) -> String {
    let body = literal
        .strip_prefix('`')
        .and_then(|s| s.strip_suffix('`'))
        .unwrap_or(literal);
    body.replace("\\`", "`").replace("\\$", "$")
}

fn looks_like_code(text: &str) -> bool {
    CODE_PUNCTUATION_REGEX.is_match(text).unwrap_or(false) && text.split('\n').count() > 2
}

/// Guess the language of an embedded code sample
#[inline]
pub fn detect_language(code: &str) -> &'static str {
    if TYPESCRIPT_HINT_REGEX.is_match(code).unwrap_or(false) {
        "typescript"
    } else if JAVASCRIPT_HINT_REGEX.is_match(code).unwrap_or(false) {
        "javascript"
    } else if JSX_HINT_REGEX.is_match(code).unwrap_or(false) {
        "jsx"
    } else {
        "typescript"
    }
}

/// `editor/<dir>` for nested pages, `editor` for the root page
#[inline]
pub fn extract_category(file_path: &str) -> String {
    if let Ok(Some(captures)) = CATEGORY_REGEX.captures(file_path) {
        if let Some(segment) = captures.get(1) {
            return format!("editor/{}", segment.as_str());
        }
    }
    if file_path.contains("documentation/page.tsx") {
        return "editor".to_string();
    }
    "editor/uncategorized".to_string()
}

fn title_from_path(file_path: &str) -> String {
    let directory = Path::new(file_path)
        .parent()
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    if directory == "documentation" {
        "Editor Documentation".to_string()
    } else {
        title_case(&directory.replace('-', " "))
    }
}

/// Uppercase the first character of every word
fn title_case(text: &str) -> String {
    let mut previous_is_word = false;
    text.chars()
        .map(|c| {
            let is_word = c.is_alphanumeric() || c == '_';
            let mapped = if is_word && !previous_is_word {
                c.to_ascii_uppercase()
            } else {
                c
            };
            previous_is_word = is_word;
            mapped
        })
        .collect()
}

/// The first two sentences longer than 20 characters, capped at 200 characters
#[inline]
pub fn generate_description(content: &str) -> String {
    let sentences: Vec<&str> = SENTENCE_SPLIT_REGEX
        .split(content)
        .flatten()
        .filter(|sentence| sentence.trim().chars().count() > 20)
        .take(2)
        .collect();
    let description = sentences.join(". ").trim().to_string();

    if description.chars().count() > DESCRIPTION_MAX_CHARS {
        let cut: String = description.chars().take(DESCRIPTION_MAX_CHARS - 3).collect();
        format!("{}...", cut)
    } else {
        description
    }
}

/// Ten most frequent words longer than four characters, excluding stop words
#[inline]
pub fn extract_keywords(content: &str) -> Vec<String> {
    let lowered = content.to_lowercase();
    let cleaned = NON_WORD_REGEX.replace_all(&lowered, " ");

    let mut counts: Vec<(&str, usize)> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();
    for word in cleaned.split_whitespace() {
        if word.chars().count() <= 4 || STOP_WORDS.contains(&word) {
            continue;
        }
        match positions.get(word) {
            Some(&index) => counts[index].1 += 1,
            None => {
                positions.insert(word, counts.len());
                counts.push((word, 1));
            }
        }
    }

    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
        .into_iter()
        .take(KEYWORD_LIMIT)
        .map(|(word, _)| word.to_string())
        .collect()
}
