//! Builders for the text that represents a record in vector space.
//!
//! Each builder concatenates a fixed selection of record fields, skipping
//! empty ones, with single spaces. They never fail.


use fancy_regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

use crate::records::{ApiEntryRecord, DocumentRecord, SourceChunkRecord, prefix_chars};

const DOCUMENT_CONTENT_CHARS: usize = 500;
const DOCUMENT_HEADINGS: usize = 5;
const API_DESCRIPTION_CHARS: usize = 500;
const SOURCE_CONTENT_CHARS: usize = 1000;
const SOURCE_COMMENTS: usize = 5;

static LINE_COMMENT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)//\s*(.+)$").expect("valid regex"));

static BLOCK_COMMENT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)/\*\*?(.*?)\*/").expect("valid regex"));

fn join_parts<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    parts
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Title, description, keywords, the first headings and the start of the body
#[inline]
pub fn document_embedding_text(record: &DocumentRecord) -> String {
    let keywords = record.keyword_list().join(" ");
    let headings = record
        .heading_list()
        .into_iter()
        .take(DOCUMENT_HEADINGS)
        .collect::<Vec<_>>()
        .join(" ");

    join_parts([
        record.title.as_str(),
        record.description.as_str(),
        keywords.as_str(),
        headings.as_str(),
        prefix_chars(&record.content, DOCUMENT_CONTENT_CHARS),
    ])
}

/// Qualified name, kind, prose, signature and the first example
#[inline]
pub fn api_embedding_text(record: &ApiEntryRecord) -> String {
    let parameters = record
        .parameter_list()
        .iter()
        .map(|p| format!("{}: {}", p.name, p.type_name))
        .collect::<Vec<_>>()
        .join(", ");
    let returns = record
        .return_value()
        .map(|r| format!("returns {}", r.type_name))
        .unwrap_or_default();
    let first_example = record.example_list().into_iter().next().unwrap_or_default();

    join_parts([
        record.full_name.as_str(),
        record.kind.as_str(),
        record.summary.as_str(),
        prefix_chars(&record.description, API_DESCRIPTION_CHARS),
        parameters.as_str(),
        returns.as_str(),
        first_example.as_str(),
    ])
}

/// File name, directory name, leading comments and the start of the chunk
#[inline]
pub fn source_embedding_text(record: &SourceChunkRecord) -> String {
    let path = Path::new(&record.file_path);
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let directory = path
        .parent()
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let comments = extract_comments(&record.content, SOURCE_COMMENTS).join(" ");

    join_parts([
        file_name.as_str(),
        directory.as_str(),
        comments.as_str(),
        prefix_chars(&record.content, SOURCE_CONTENT_CHARS),
    ])
}

/// Up to `limit` trimmed line and block comment bodies, in source order
#[inline]
pub fn extract_comments(code: &str, limit: usize) -> Vec<String> {
    let mut found: Vec<(usize, String)> = LINE_COMMENT_REGEX
        .captures_iter(code)
        .chain(BLOCK_COMMENT_REGEX.captures_iter(code))
        .flatten()
        .filter_map(|captures| {
            let body = captures.get(1)?;
            let text = body.as_str().trim();
            (!text.is_empty()).then(|| (body.start(), text.to_string()))
        })
        .collect();

    found.sort_by_key(|(position, _)| *position);
    found
        .into_iter()
        .take(limit)
        .map(|(_, text)| text)
        .collect()
}
