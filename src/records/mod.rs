//! Records shared by the extraction adapters, the indexer and the query engine.
//!
//! Extraction adapters produce [`DocumentMetadata`] and [`ApiDocumentation`];
//! the indexer flattens those into the stored record shapes
//! ([`DocumentRecord`], [`ApiEntryRecord`], [`SourceChunkRecord`]) whose list
//! fields are kept as joined strings, the way they are persisted.


use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator used for keyword, playground id and "see also" lists
pub const LIST_SEPARATOR: &str = ", ";
/// Separator used for breadcrumb trails
pub const BREADCRUMB_SEPARATOR: &str = " > ";
/// Separator used for heading lists
pub const HEADING_SEPARATOR: &str = " | ";
/// Separator between stored code snippets of a document
pub const CODE_SNIPPET_SEPARATOR: &str = "\n---\n";
/// Separator between stored API examples
pub const EXAMPLE_SEPARATOR: &str = "\n\n---\n\n";
/// Category assigned to documents whose path carries no category segment
pub const UNCATEGORIZED: &str = "uncategorized";

/// A heading found in a documentation page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    pub level: u8,
    pub text: String,
    /// Anchor slug derived from the text
    pub id: String,
}

/// A code block found in a documentation page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlock {
    pub language: String,
    pub code: String,
    /// 1-based line of the opening fence, 0 when unknown
    pub line_start: usize,
}

/// A "further reading" link declared in front matter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelatedLink {
    pub title: String,
    pub url: String,
}

/// Normalized output of the documentation extraction adapters
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentMetadata {
    pub file_path: String,
    pub title: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub category: String,
    pub breadcrumbs: Vec<String>,
    pub content: String,
    pub headings: Vec<Heading>,
    pub code_blocks: Vec<CodeBlock>,
    pub further_reading: Vec<RelatedLink>,
    pub playground_ids: Vec<String>,
    pub last_modified: DateTime<Utc>,
}

/// One prose documentation page as stored in the docs table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    pub content: String,
    pub keywords: String,
    pub category: String,
    pub breadcrumbs: String,
    pub file_path: String,
    pub url: String,
    pub source: String,
    pub headings: String,
    pub code_snippets: String,
    pub playground_ids: String,
    pub last_modified: String,
}

impl DocumentRecord {
    #[inline]
    pub fn keyword_list(&self) -> Vec<String> {
        split_list(&self.keywords, LIST_SEPARATOR)
    }

    #[inline]
    pub fn breadcrumb_list(&self) -> Vec<String> {
        split_list(&self.breadcrumbs, BREADCRUMB_SEPARATOR)
    }

    #[inline]
    pub fn heading_list(&self) -> Vec<String> {
        split_list(&self.headings, HEADING_SEPARATOR)
    }

    #[inline]
    pub fn playground_id_list(&self) -> Vec<String> {
        split_list(&self.playground_ids, LIST_SEPARATOR)
    }
}

/// Kind of a documented API symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApiKind {
    Class,
    Interface,
    Enum,
    Function,
    Method,
    Property,
    TypeAlias,
    Variable,
    Constructor,
    Accessor,
    Getter,
    Setter,
    Unknown,
}

impl ApiKind {
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Class => "Class",
            Self::Interface => "Interface",
            Self::Enum => "Enum",
            Self::Function => "Function",
            Self::Method => "Method",
            Self::Property => "Property",
            Self::TypeAlias => "TypeAlias",
            Self::Variable => "Variable",
            Self::Constructor => "Constructor",
            Self::Accessor => "Accessor",
            Self::Getter => "Getter",
            Self::Setter => "Setter",
            Self::Unknown => "Unknown",
        }
    }

    /// Parse a stored kind name; unrecognised names map to `Unknown`
    #[inline]
    pub fn parse(name: &str) -> Self {
        match name {
            "Class" => Self::Class,
            "Interface" => Self::Interface,
            "Enum" => Self::Enum,
            "Function" => Self::Function,
            "Method" => Self::Method,
            "Property" => Self::Property,
            "TypeAlias" => Self::TypeAlias,
            "Variable" => Self::Variable,
            "Constructor" => Self::Constructor,
            "Accessor" => Self::Accessor,
            "Getter" => Self::Getter,
            "Setter" => Self::Setter,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for ApiKind {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub description: String,
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiReturn {
    #[serde(rename = "type")]
    pub type_name: String,
    pub description: String,
}

/// Normalized output of the API extraction adapter: one documented symbol or signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiDocumentation {
    pub name: String,
    pub full_name: String,
    pub kind: ApiKind,
    pub summary: String,
    pub description: String,
    pub examples: Vec<String>,
    pub parameters: Vec<ApiParameter>,
    pub returns: Option<ApiReturn>,
    pub type_name: Option<String>,
    pub deprecated: Option<String>,
    pub see: Vec<String>,
    pub since: Option<String>,
    pub source_file: String,
    pub source_line: u32,
}

/// One documented API symbol as stored in the API table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEntryRecord {
    pub id: String,
    pub name: String,
    pub full_name: String,
    pub kind: ApiKind,
    pub summary: String,
    pub description: String,
    pub examples: String,
    /// JSON array of [`ApiParameter`]
    pub parameters: String,
    /// JSON object of [`ApiReturn`], empty when the symbol returns nothing documented
    pub returns: String,
    pub type_name: String,
    pub deprecated: String,
    pub see: String,
    pub since: String,
    pub source_file: String,
    pub source_line: u32,
    pub category: String,
    pub url: String,
}

impl ApiEntryRecord {
    /// Decode the stored parameter list; malformed JSON yields an empty list
    #[inline]
    pub fn parameter_list(&self) -> Vec<ApiParameter> {
        if self.parameters.is_empty() {
            return Vec::new();
        }
        serde_json::from_str(&self.parameters).unwrap_or_default()
    }

    #[inline]
    pub fn return_value(&self) -> Option<ApiReturn> {
        if self.returns.is_empty() {
            return None;
        }
        serde_json::from_str(&self.returns).ok()
    }

    #[inline]
    pub fn example_list(&self) -> Vec<String> {
        split_list(&self.examples, EXAMPLE_SEPARATOR)
    }

    #[inline]
    pub fn see_list(&self) -> Vec<String> {
        split_list(&self.see, LIST_SEPARATOR)
    }
}

/// One line-range slice of a source file as stored in the source table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceChunkRecord {
    pub id: String,
    pub file_path: String,
    pub package: String,
    pub content: String,
    pub start_line: u32,
    pub end_line: u32,
    pub language: String,
    pub imports: String,
    pub exports: String,
    pub url: String,
}

impl SourceChunkRecord {
    #[inline]
    pub fn import_list(&self) -> Vec<String> {
        split_list(&self.imports, LIST_SEPARATOR)
    }

    #[inline]
    pub fn export_list(&self) -> Vec<String> {
        split_list(&self.exports, LIST_SEPARATOR)
    }
}

/// Prose search hit: a document projected with a query-relevant snippet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub title: String,
    pub description: String,
    /// Snippet extracted around the query terms, not the full body
    pub content: String,
    pub url: String,
    pub category: String,
    pub source: String,
    pub score: f32,
    pub keywords: Vec<String>,
}

/// A stored record returned from a similarity search together with its score
#[derive(Debug, Clone, PartialEq)]
pub struct Scored<R> {
    pub record: R,
    pub score: f32,
}

/// Truncate to `max_chars` characters, appending `...` when anything was cut
#[inline]
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => format!("{}...", text.split_at(byte_index).0),
        None => text.to_string(),
    }
}

/// The first `max_chars` characters of `text`, without any marker
#[inline]
pub fn prefix_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => text.split_at(byte_index).0,
        None => text,
    }
}

/// Split a stored joined list, dropping empty entries
#[inline]
pub fn split_list(joined: &str, separator: &str) -> Vec<String> {
    joined
        .split(separator)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
