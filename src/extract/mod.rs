//! Extraction adapters turning files into normalized records.

pub mod markdown;
pub mod source;
pub mod tsdoc;
pub mod tsx;

use std::path::Path;

use crate::Result;
use crate::records::DocumentMetadata;

/// File name of an editor documentation page
pub const EDITOR_PAGE_FILE: &str = "page.tsx";

/// Whether a file is a documentation page handled by one of the adapters
#[inline]
pub fn is_document_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|name| name.to_str());
    name.is_some_and(|name| name == EDITOR_PAGE_FILE || name.ends_with(".md"))
}

/// Parse a documentation page with the adapter matching its file name
#[inline]
pub fn parse_document_file(path: &Path) -> Result<DocumentMetadata> {
    let is_page = path
        .file_name()
        .is_some_and(|name| name == EDITOR_PAGE_FILE);
    if is_page {
        tsx::parse_tsx_file(path)
    } else {
        markdown::parse_markdown_file(path)
    }
}
