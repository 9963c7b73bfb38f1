//! API reference extraction from TypeScript declarations.
//!
//! Exported declarations and their members are read with tree-sitter into a
//! small reflection tree ([`Reflection`]), each carrying its parsed `/** */`
//! comment. [`flatten_reflections`] then turns the tree into
//! [`ApiDocumentation`] entries:
//!
//! * an undocumented reflection without children is skipped;
//! * a reflection contributes its own entry only when it has a comment;
//! * children are visited with `parent.child` qualified names;
//! * functions, methods and constructors keep their comment on each call
//!   signature, and every documented signature becomes a `Method` entry.


use fancy_regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;
use tree_sitter::{Language, Node, Parser};

use crate::records::{ApiDocumentation, ApiKind, ApiParameter, ApiReturn};
use crate::{DocsError, Result};

/// Tags that remove a declaration from the public API
const EXCLUDING_TAGS: &[&str] = &["@internal", "@hidden", "@ignore", "@private"];

static INLINE_LINK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{@(?:link|linkcode|linkplain)\s+([^}|\s]+)(?:\s*\|\s*([^}]*))?\}")
        .expect("valid regex")
});

static JSDOC_TYPE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\{[^}]*\}\s*").expect("valid regex"));

/// One `@tag` section of a doc comment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockTag {
    /// Tag including the `@`
    pub tag: String,
    /// Parameter name for `@param`
    pub name: Option<String>,
    pub content: String,
}

/// A parsed `/** */` comment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocComment {
    pub summary: String,
    pub block_tags: Vec<BlockTag>,
}

impl DocComment {
    /// Parse the raw text of a `/** ... */` comment
    #[inline]
    pub fn parse(raw: &str) -> Self {
        let inner = raw
            .trim()
            .trim_start_matches("/**")
            .trim_end_matches("*/");

        let lines = inner.lines().map(|line| {
            let line = line.trim_start();
            let line = line.strip_prefix('*').unwrap_or(line);
            line.strip_prefix(' ').unwrap_or(line).trim_end()
        });

        let mut summary = Vec::new();
        let mut sections: Vec<(String, Vec<String>)> = Vec::new();
        let mut in_fence = false;

        for line in lines {
            if line.trim_start().starts_with("```") {
                in_fence = !in_fence;
            }
            let starts_tag = !in_fence && line.starts_with('@');
            if starts_tag {
                let (tag, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
                sections.push((tag.to_string(), vec![rest.to_string()]));
            } else if let Some((_, body)) = sections.last_mut() {
                body.push(line.to_string());
            } else {
                summary.push(line.to_string());
            }
        }

        let block_tags = sections
            .into_iter()
            .map(|(tag, body)| {
                let content = resolve_inline_tags(body.join("\n").trim());
                if tag == "@param" {
                    let (name, description) = split_param(&content);
                    BlockTag {
                        tag,
                        name: Some(name),
                        content: description,
                    }
                } else {
                    BlockTag {
                        tag,
                        name: None,
                        content,
                    }
                }
            })
            .collect();

        Self {
            summary: resolve_inline_tags(summary.join("\n").trim()),
            block_tags,
        }
    }

    fn tag_contents<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.block_tags
            .iter()
            .filter(move |block| block.tag == tag)
            .map(|block| block.content.as_str())
    }

    fn first_tag(&self, tag: &str) -> Option<String> {
        self.tag_contents(tag).next().map(str::to_string)
    }

    fn has_tag(&self, tag: &str) -> bool {
        self.block_tags.iter().any(|block| block.tag == tag)
    }

    /// Whether the comment hides its declaration from the public API
    #[inline]
    pub fn is_excluded(&self) -> bool {
        EXCLUDING_TAGS.iter().any(|tag| self.has_tag(tag))
    }

    fn param_description(&self, name: &str) -> String {
        self.block_tags
            .iter()
            .find(|block| block.tag == "@param" && block.name.as_deref() == Some(name))
            .map(|block| block.content.clone())
            .unwrap_or_default()
    }
}

/// `{@link Target | label}` becomes `label`, `{@link Target}` becomes `Target`
fn resolve_inline_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for captures in INLINE_LINK_REGEX.captures_iter(text).flatten() {
        let (Some(whole), Some(target)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        out.push_str(text.get(last..whole.start()).unwrap_or_default());
        let label = captures
            .get(2)
            .map(|m| m.as_str().trim())
            .filter(|label| !label.is_empty())
            .unwrap_or(target.as_str());
        out.push_str(label);
        last = whole.end();
    }
    out.push_str(text.get(last..).unwrap_or_default());
    out
}

/// Split `name - description` (optionally preceded by a `{type}`)
fn split_param(content: &str) -> (String, String) {
    let content = JSDOC_TYPE_REGEX.replace(content, "");
    let (name, rest) = content
        .split_once(char::is_whitespace)
        .unwrap_or((content.as_ref(), ""));
    let name = name.trim_start_matches('[').trim_end_matches(']');
    let name = name.split('=').next().unwrap_or(name);
    let description = rest.trim_start();
    let description = description
        .strip_prefix('-')
        .map_or(description, str::trim_start);
    (name.to_string(), description.trim().to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureParameter {
    pub name: String,
    pub type_name: Option<String>,
    pub optional: bool,
}

/// One call signature of a function, method or constructor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pub comment: Option<DocComment>,
    pub parameters: Vec<SignatureParameter>,
    pub return_type: Option<String>,
    pub source_line: u32,
}

/// A declared symbol with its members
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reflection {
    pub name: String,
    pub kind: ApiKind,
    pub comment: Option<DocComment>,
    pub type_name: Option<String>,
    pub signatures: Vec<Signature>,
    pub children: Vec<Reflection>,
    pub source_line: u32,
}

impl Reflection {
    fn new(name: &str, kind: ApiKind, comment: Option<DocComment>, source_line: u32) -> Self {
        Self {
            name: name.to_string(),
            kind,
            comment,
            type_name: None,
            signatures: Vec::new(),
            children: Vec::new(),
            source_line,
        }
    }
}

/// Extract the documented API of a TypeScript file
///
/// # Arguments
/// * `path` - File on disk
/// * `source_file` - Path recorded on the entries, relative to the repository
#[inline]
pub fn extract_api_file(path: &Path, source_file: &str) -> Result<Vec<ApiDocumentation>> {
    let source = std::fs::read_to_string(path).map_err(|e| {
        DocsError::Extraction(format!("Failed to read {}: {}", path.display(), e))
    })?;
    let tsx = path.extension().is_some_and(|ext| ext == "tsx");
    let reflections = parse_reflections(&source, tsx)?;
    let docs = flatten_reflections(&reflections, source_file);

    debug!(
        "Extracted {} API entries from {} top-level declarations in {}",
        docs.len(),
        reflections.len(),
        source_file
    );
    Ok(docs)
}

/// Read the exported declarations of a TypeScript module
#[inline]
pub fn parse_reflections(source: &str, tsx: bool) -> Result<Vec<Reflection>> {
    let mut parser = Parser::new();
    let language: Language = if tsx {
        tree_sitter_typescript::LANGUAGE_TSX.into()
    } else {
        tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()
    };
    parser
        .set_language(&language)
        .map_err(|e| DocsError::Extraction(format!("Failed to load TypeScript grammar: {}", e)))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| DocsError::Extraction("Failed to parse TypeScript source".to_string()))?;

    let src = source.as_bytes();
    let root = tree.root_node();
    let mut reflections = Vec::new();

    let mut cursor = root.walk();
    for statement in root.named_children(&mut cursor) {
        if statement.kind() != "export_statement" {
            continue;
        }
        let Some(declaration) = statement.child_by_field_name("declaration") else {
            continue;
        };
        let comment = doc_comment(statement, src);
        if comment.as_ref().is_some_and(DocComment::is_excluded) {
            continue;
        }
        for reflection in declaration_reflections(declaration, comment, src) {
            merge_reflection(&mut reflections, reflection);
        }
    }

    Ok(reflections)
}

fn node_text<'a>(node: Node<'_>, src: &'a [u8]) -> &'a str {
    node.utf8_text(src).unwrap_or_default()
}

fn line_of(node: Node<'_>) -> u32 {
    u32::try_from(node.start_position().row + 1).unwrap_or(u32::MAX)
}

/// The `/** */` comment directly preceding `node`
fn doc_comment(node: Node<'_>, src: &[u8]) -> Option<DocComment> {
    let previous = node.prev_sibling()?;
    if previous.kind() != "comment" {
        return None;
    }
    let text = node_text(previous, src);
    text.starts_with("/**").then(|| DocComment::parse(text))
}

/// Type text of a `: T` annotation node
fn annotation_text(node: Option<Node<'_>>, src: &[u8]) -> Option<String> {
    let text = node_text(node?, src).trim();
    let text = text.strip_prefix(':').unwrap_or(text).trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Overloads and get/set pairs share one reflection
fn merge_reflection(siblings: &mut Vec<Reflection>, reflection: Reflection) {
    let existing = siblings
        .iter_mut()
        .find(|r| r.name == reflection.name && r.kind == reflection.kind);
    match existing {
        Some(existing) if !reflection.signatures.is_empty() || reflection.kind == ApiKind::Accessor => {
            existing.signatures.extend(reflection.signatures);
            if existing.comment.is_none() {
                existing.comment = reflection.comment;
                existing.type_name = existing.type_name.take().or(reflection.type_name);
            }
        }
        _ => siblings.push(reflection),
    }
}

fn declaration_name<'a>(node: Node<'_>, src: &'a [u8]) -> &'a str {
    node.child_by_field_name("name")
        .map(|name| node_text(name, src))
        .unwrap_or_default()
}

fn declaration_reflections(
    declaration: Node<'_>,
    comment: Option<DocComment>,
    src: &[u8],
) -> Vec<Reflection> {
    let name_of = |node: Node<'_>| declaration_name(node, src);

    match declaration.kind() {
        "class_declaration" | "abstract_class_declaration" => {
            let mut reflection =
                Reflection::new(name_of(declaration), ApiKind::Class, comment, line_of(declaration));
            if let Some(body) = declaration.child_by_field_name("body") {
                reflection.children = class_members(body, src);
            }
            vec![reflection]
        }
        "interface_declaration" => {
            let mut reflection = Reflection::new(
                name_of(declaration),
                ApiKind::Interface,
                comment,
                line_of(declaration),
            );
            if let Some(body) = declaration.child_by_field_name("body") {
                reflection.children = interface_members(body, src);
            }
            vec![reflection]
        }
        "enum_declaration" => {
            let mut reflection =
                Reflection::new(name_of(declaration), ApiKind::Enum, comment, line_of(declaration));
            if let Some(body) = declaration.child_by_field_name("body") {
                reflection.children = enum_members(body, src);
            }
            vec![reflection]
        }
        "function_declaration" | "function_signature" | "generator_function_declaration" => {
            let name = name_of(declaration);
            let mut reflection =
                Reflection::new(name, ApiKind::Function, None, line_of(declaration));
            reflection
                .signatures
                .push(signature(declaration, name, comment, src));
            vec![reflection]
        }
        "type_alias_declaration" => {
            let mut reflection = Reflection::new(
                name_of(declaration),
                ApiKind::TypeAlias,
                comment,
                line_of(declaration),
            );
            reflection.type_name = declaration
                .child_by_field_name("value")
                .map(|value| node_text(value, src).trim().to_string());
            vec![reflection]
        }
        "lexical_declaration" | "variable_declaration" => {
            let mut reflections = Vec::new();
            let mut comment = comment;
            let mut cursor = declaration.walk();
            for declarator in declaration.named_children(&mut cursor) {
                if declarator.kind() != "variable_declarator" {
                    continue;
                }
                let mut reflection = Reflection::new(
                    name_of(declarator),
                    ApiKind::Variable,
                    comment.take(),
                    line_of(declarator),
                );
                reflection.type_name =
                    annotation_text(declarator.child_by_field_name("type"), src);
                reflections.push(reflection);
            }
            reflections
        }
        "ambient_declaration" => {
            let mut cursor = declaration.walk();
            let inner = declaration.named_children(&mut cursor).next();
            inner
                .map(|inner| declaration_reflections(inner, comment, src))
                .unwrap_or_default()
        }
        _ => Vec::new(),
    }
}

fn signature(node: Node<'_>, name: &str, comment: Option<DocComment>, src: &[u8]) -> Signature {
    let mut parameters = Vec::new();
    if let Some(list) = node.child_by_field_name("parameters") {
        let mut cursor = list.walk();
        for parameter in list.named_children(&mut cursor) {
            let optional = match parameter.kind() {
                "optional_parameter" => true,
                "required_parameter" => false,
                _ => continue,
            };
            let Some(pattern) = parameter.child_by_field_name("pattern") else {
                continue;
            };
            let name = node_text(pattern, src).trim_start_matches("...");
            if name == "this" {
                continue;
            }
            parameters.push(SignatureParameter {
                name: name.to_string(),
                type_name: annotation_text(parameter.child_by_field_name("type"), src),
                optional,
            });
        }
    }

    Signature {
        name: name.to_string(),
        comment,
        parameters,
        return_type: annotation_text(node.child_by_field_name("return_type"), src),
        source_line: line_of(node),
    }
}

fn is_private_member(member: Node<'_>, src: &[u8]) -> bool {
    let private_name = member
        .child_by_field_name("name")
        .is_some_and(|name| name.kind() == "private_property_identifier");
    if private_name {
        return true;
    }
    let mut cursor = member.walk();
    let private = member
        .children(&mut cursor)
        .any(|child| child.kind() == "accessibility_modifier" && node_text(child, src) == "private");
    private
}

fn accessor_keyword(member: Node<'_>, src: &[u8]) -> Option<&'static str> {
    let mut cursor = member.walk();
    let keyword = member.children(&mut cursor).find_map(|child| match node_text(child, src) {
        "get" if child.kind() == "get" => Some("get"),
        "set" if child.kind() == "set" => Some("set"),
        _ => None,
    });
    keyword
}

fn class_members(body: Node<'_>, src: &[u8]) -> Vec<Reflection> {
    let mut members = Vec::new();
    let mut cursor = body.walk();
    for member in body.named_children(&mut cursor) {
        if member.kind() == "comment" || is_private_member(member, src) {
            continue;
        }
        let comment = doc_comment(member, src);
        if comment.as_ref().is_some_and(DocComment::is_excluded) {
            continue;
        }
        let Some(name) = member.child_by_field_name("name").map(|n| node_text(n, src)) else {
            continue;
        };

        let reflection = match member.kind() {
            "method_definition" | "method_signature" | "abstract_method_signature" => {
                if accessor_keyword(member, src).is_some() {
                    let mut reflection =
                        Reflection::new(name, ApiKind::Accessor, comment, line_of(member));
                    reflection.type_name =
                        annotation_text(member.child_by_field_name("return_type"), src);
                    reflection
                } else {
                    let kind = if name == "constructor" {
                        ApiKind::Constructor
                    } else {
                        ApiKind::Method
                    };
                    let mut reflection = Reflection::new(name, kind, None, line_of(member));
                    reflection
                        .signatures
                        .push(signature(member, name, comment, src));
                    reflection
                }
            }
            "public_field_definition" => {
                let mut reflection =
                    Reflection::new(name, ApiKind::Property, comment, line_of(member));
                reflection.type_name = annotation_text(member.child_by_field_name("type"), src);
                reflection
            }
            _ => continue,
        };
        merge_reflection(&mut members, reflection);
    }
    members
}

fn interface_members(body: Node<'_>, src: &[u8]) -> Vec<Reflection> {
    let mut members = Vec::new();
    let mut cursor = body.walk();
    for member in body.named_children(&mut cursor) {
        let comment = doc_comment(member, src);
        if comment.as_ref().is_some_and(DocComment::is_excluded) {
            continue;
        }
        let Some(name) = member.child_by_field_name("name").map(|n| node_text(n, src)) else {
            continue;
        };

        let reflection = match member.kind() {
            "property_signature" => {
                let mut reflection =
                    Reflection::new(name, ApiKind::Property, comment, line_of(member));
                reflection.type_name = annotation_text(member.child_by_field_name("type"), src);
                reflection
            }
            "method_signature" => {
                let mut reflection = Reflection::new(name, ApiKind::Method, None, line_of(member));
                reflection
                    .signatures
                    .push(signature(member, name, comment, src));
                reflection
            }
            _ => continue,
        };
        merge_reflection(&mut members, reflection);
    }
    members
}

fn enum_members(body: Node<'_>, src: &[u8]) -> Vec<Reflection> {
    let mut members = Vec::new();
    let mut cursor = body.walk();
    for member in body.named_children(&mut cursor) {
        let name_node = match member.kind() {
            "enum_assignment" => member.child_by_field_name("name"),
            "property_identifier" | "string" => Some(member),
            _ => None,
        };
        let Some(name_node) = name_node else {
            continue;
        };
        let comment = doc_comment(member, src);
        if comment.as_ref().is_some_and(DocComment::is_excluded) {
            continue;
        }
        let name = node_text(name_node, src).trim_matches(['"', '\'']);
        members.push(Reflection::new(
            name,
            ApiKind::Property,
            comment,
            line_of(member),
        ));
    }
    members
}

/// Turn reflection trees into API entries
#[inline]
pub fn flatten_reflections(reflections: &[Reflection], source_file: &str) -> Vec<ApiDocumentation> {
    let mut out = Vec::new();
    for reflection in reflections {
        flatten_reflection(reflection, None, source_file, &mut out);
    }
    out
}

fn flatten_reflection(
    reflection: &Reflection,
    parent: Option<&str>,
    source_file: &str,
    out: &mut Vec<ApiDocumentation>,
) {
    let documented_signature = reflection.signatures.iter().any(|s| s.comment.is_some());
    if reflection.comment.is_none() && !documented_signature && reflection.children.is_empty() {
        return;
    }

    let full_name = parent.map_or_else(
        || reflection.name.clone(),
        |parent| format!("{}.{}", parent, reflection.name),
    );

    if let Some(comment) = &reflection.comment {
        let description = comment.tag_contents("@remarks").collect::<Vec<_>>().join("\n\n");
        out.push(ApiDocumentation {
            name: reflection.name.clone(),
            full_name: full_name.clone(),
            kind: reflection.kind,
            summary: comment.summary.clone(),
            description: if description.is_empty() {
                comment.summary.clone()
            } else {
                description
            },
            examples: comment.tag_contents("@example").map(str::to_string).collect(),
            parameters: Vec::new(),
            returns: None,
            type_name: reflection.type_name.clone(),
            deprecated: comment.first_tag("@deprecated"),
            see: comment.tag_contents("@see").map(str::to_string).collect(),
            since: comment.first_tag("@since"),
            source_file: source_file.to_string(),
            source_line: reflection.source_line,
        });
    }

    for child in &reflection.children {
        flatten_reflection(child, Some(&full_name), source_file, out);
    }

    for signature in &reflection.signatures {
        let Some(comment) = &signature.comment else {
            continue;
        };
        let description = comment.tag_contents("@remarks").collect::<Vec<_>>().join("\n\n");
        let parameters = signature
            .parameters
            .iter()
            .map(|parameter| ApiParameter {
                name: parameter.name.clone(),
                type_name: parameter
                    .type_name
                    .clone()
                    .unwrap_or_else(|| "unknown".to_string()),
                description: comment.param_description(&parameter.name),
                optional: parameter.optional,
            })
            .collect();
        let returns = comment.first_tag("@returns").map(|description| ApiReturn {
            type_name: signature
                .return_type
                .clone()
                .unwrap_or_else(|| "void".to_string()),
            description,
        });

        out.push(ApiDocumentation {
            name: signature.name.clone(),
            full_name: full_name.clone(),
            kind: ApiKind::Method,
            summary: comment.summary.clone(),
            description: if description.is_empty() {
                comment.summary.clone()
            } else {
                description
            },
            examples: comment.tag_contents("@example").map(str::to_string).collect(),
            parameters,
            returns,
            type_name: signature.return_type.clone(),
            deprecated: comment.first_tag("@deprecated"),
            see: comment.tag_contents("@see").map(str::to_string).collect(),
            since: comment.first_tag("@since"),
            source_file: source_file.to_string(),
            source_line: signature.source_line,
        });
    }
}
