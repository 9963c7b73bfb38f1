
use chrono::{DateTime, Utc};
use fancy_regex::Regex;
use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use serde::Deserialize;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::records::{CodeBlock, DocumentMetadata, Heading, RelatedLink, UNCATEGORIZED};
use crate::{DocsError, Result};

static CATEGORY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"content/([^/]+(?:/[^/]+)*)").expect("valid regex"));

static PLAYGROUND_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<Playground\s+id=["']#([^"']+)["']"#).expect("valid regex"));

static SLUG_STRIP_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s-]").expect("valid regex"));

static SLUG_SPACE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Keywords may be written as a comma separated string or a YAML list
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Keywords {
    Text(String),
    List(Vec<String>),
}

#[derive(Debug, Default, Deserialize)]
struct FrontMatter {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    keywords: Option<Keywords>,
    #[serde(default, rename = "further-reading")]
    further_reading: Vec<RelatedLink>,
}

/// Parse a markdown documentation page from disk
#[inline]
pub fn parse_markdown_file(path: &Path) -> Result<DocumentMetadata> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        DocsError::Extraction(format!("Failed to read {}: {}", path.display(), e))
    })?;
    let last_modified = file_modified(path)?;

    Ok(parse_markdown(
        &text,
        &path.to_string_lossy(),
        last_modified,
    ))
}

/// Parse markdown text; `file_path` drives the category and breadcrumbs
#[inline]
pub fn parse_markdown(text: &str, file_path: &str, last_modified: DateTime<Utc>) -> DocumentMetadata {
    let (front_matter, body) = split_front_matter(text);
    let front_matter = front_matter
        .map(|yaml| {
            serde_yml::from_str::<FrontMatter>(yaml).unwrap_or_else(|e| {
                warn!("Ignoring malformed front matter in {}: {}", file_path, e);
                FrontMatter::default()
            })
        })
        .unwrap_or_default();

    let (headings, code_blocks) = scan_markdown(body);
    let category = extract_category(file_path);
    let breadcrumbs = category
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect();

    let title = front_matter
        .title
        .filter(|title| !title.trim().is_empty())
        .or_else(|| {
            headings
                .iter()
                .find(|heading| heading.level == 1)
                .map(|heading| heading.text.clone())
        })
        .unwrap_or_default();

    let keywords = match front_matter.keywords {
        Some(Keywords::Text(text)) => text
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Keywords::List(list)) => list
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect(),
        None => Vec::new(),
    };

    let playground_ids = PLAYGROUND_REGEX
        .captures_iter(body)
        .flatten()
        .filter_map(|captures| captures.get(1).map(|m| m.as_str().to_string()))
        .collect();

    debug!(
        "Parsed markdown {}: {} headings, {} code blocks",
        file_path,
        headings.len(),
        code_blocks.len()
    );

    DocumentMetadata {
        file_path: file_path.to_string(),
        title,
        description: front_matter.description.unwrap_or_default(),
        keywords,
        category,
        breadcrumbs,
        content: body.to_string(),
        headings,
        code_blocks,
        further_reading: front_matter.further_reading,
        playground_ids,
        last_modified,
    }
}

/// Split a leading `---` delimited YAML block from the markdown body
fn split_front_matter(text: &str) -> (Option<&str>, &str) {
    let Some(rest) = text
        .strip_prefix("---\n")
        .or_else(|| text.strip_prefix("---\r\n"))
    else {
        return (None, text);
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            let (yaml, tail) = rest.split_at(offset);
            let body = tail.split_at(line.len()).1;
            return (Some(yaml), body);
        }
        offset += line.len();
    }

    (None, text)
}

/// Category from the path segment after `content/`, without the `.md` suffix
#[inline]
pub fn extract_category(file_path: &str) -> String {
    let normalized = file_path.replace('\\', "/");
    match CATEGORY_REGEX.captures(&normalized) {
        Ok(Some(captures)) => captures
            .get(1)
            .map(|m| m.as_str().trim_end_matches(".md").to_string())
            .filter(|category| !category.is_empty())
            .unwrap_or_else(|| UNCATEGORIZED.to_string()),
        _ => UNCATEGORIZED.to_string(),
    }
}

/// Anchor slug of a heading: lowercase, punctuation removed, whitespace to `-`
#[inline]
pub fn slugify(text: &str) -> String {
    let lower = text.to_lowercase();
    let stripped = SLUG_STRIP_REGEX.replace_all(&lower, "");
    SLUG_SPACE_REGEX.replace_all(&stripped, "-").to_string()
}

fn scan_markdown(body: &str) -> (Vec<Heading>, Vec<CodeBlock>) {
    let mut headings = Vec::new();
    let mut code_blocks = Vec::new();

    let mut heading_text: Option<String> = None;
    let mut code: Option<(String, usize, String)> = None;

    for (event, range) in Parser::new_ext(body, Options::empty()).into_offset_iter() {
        match event {
            Event::Start(Tag::Heading { .. }) => heading_text = Some(String::new()),
            Event::End(TagEnd::Heading(level)) => {
                if let Some(text) = heading_text.take() {
                    let text = text.trim().to_string();
                    if !text.is_empty() {
                        headings.push(Heading {
                            level: heading_level_to_u8(level),
                            id: slugify(&text),
                            text,
                        });
                    }
                }
            }
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) => {
                let language = info
                    .split_whitespace()
                    .next()
                    .filter(|lang| !lang.is_empty())
                    .unwrap_or("plaintext")
                    .to_string();
                let line_start = body
                    .get(..range.start)
                    .map_or(1, |before| before.matches('\n').count() + 1);
                code = Some((language, line_start, String::new()));
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some((language, line_start, text)) = code.take() {
                    code_blocks.push(CodeBlock {
                        language,
                        code: text.trim().to_string(),
                        line_start,
                    });
                }
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some(heading) = heading_text.as_mut() {
                    heading.push_str(&text);
                } else if let Some((_, _, block)) = code.as_mut() {
                    block.push_str(&text);
                }
            }
            Event::SoftBreak | Event::HardBreak => {
                if let Some(heading) = heading_text.as_mut() {
                    heading.push(' ');
                }
            }
            _ => {}
        }
    }

    (headings, code_blocks)
}

fn heading_level_to_u8(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// Last modification time of a file
pub(crate) fn file_modified(path: &Path) -> Result<DateTime<Utc>> {
    let modified = std::fs::metadata(path)
        .and_then(|metadata| metadata.modified())
        .map_err(|e| {
            DocsError::Extraction(format!(
                "Failed to read modification time of {}: {}",
                path.display(),
                e
            ))
        })?;
    Ok(DateTime::<Utc>::from(modified))
}
