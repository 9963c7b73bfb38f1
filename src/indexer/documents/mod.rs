//! Prose documentation: markdown pages and editor `page.tsx` files across
//! the configured document sources, one record per page.

#[cfg(test)]
mod tests;

use std::path::{Path, PathBuf};
use tracing::info;

use super::{IndexSource, IndexUnit};
use crate::config::{Config, DocumentSource};
use crate::embeddings::document_embedding_text;
use crate::extract::source::{relative_path, walk_files};
use crate::extract::{EDITOR_PAGE_FILE, is_document_file, parse_document_file};
use crate::records::{
    BREADCRUMB_SEPARATOR, CODE_SNIPPET_SEPARATOR, DocumentMetadata, DocumentRecord,
    HEADING_SEPARATOR, LIST_SEPARATOR, UNCATEGORIZED, truncate_chars,
};
use crate::{DocsError, Result};

/// Directories skipped while looking for documentation pages
pub const DOCUMENT_SKIPPED_DIRECTORIES: &[&str] = &["node_modules", ".git"];

/// Code blocks copied into a stored document
pub const STORED_CODE_SNIPPETS: usize = 3;

/// Id suffix of a page sitting directly at a source root
const ROOT_PAGE_ID: &str = "index";

/// A document source with its root resolved on disk
#[derive(Debug, Clone)]
pub struct ResolvedSource {
    pub source: DocumentSource,
    pub root: PathBuf,
}

/// Every configured document source, indexed into one docs table
#[derive(Debug, Clone)]
pub struct DocumentSourceSet {
    sources: Vec<ResolvedSource>,
    table_name: String,
    max_content_chars: usize,
}

impl DocumentSourceSet {
    #[inline]
    pub fn from_config(config: &Config) -> Self {
        let sources = config
            .document_sources
            .iter()
            .map(|source| ResolvedSource {
                root: config.document_source_root(source),
                source: source.clone(),
            })
            .collect();
        Self::new(
            sources,
            &config.indexing.docs_table,
            config.indexing.max_content_chars,
        )
    }

    #[inline]
    pub fn new(sources: Vec<ResolvedSource>, table_name: &str, max_content_chars: usize) -> Self {
        Self {
            sources,
            table_name: table_name.to_string(),
            max_content_chars,
        }
    }

    /// Keep only the named sources
    #[inline]
    #[must_use]
    pub fn only(mut self, names: &[String]) -> Self {
        if !names.is_empty() {
            self.sources
                .retain(|resolved| names.contains(&resolved.source.name));
        }
        self
    }

    #[inline]
    pub fn sources(&self) -> &[ResolvedSource] {
        &self.sources
    }

    fn resolved(&self, name: &str) -> Result<&ResolvedSource> {
        self.sources
            .iter()
            .find(|resolved| resolved.source.name == name)
            .ok_or_else(|| DocsError::Extraction(format!("Unknown document source: {}", name)))
    }
}

impl IndexSource for DocumentSourceSet {
    type Record = DocumentRecord;

    #[inline]
    fn name(&self) -> &str {
        "documentation"
    }

    #[inline]
    fn table_name(&self) -> &str {
        &self.table_name
    }

    #[inline]
    fn discover(&self) -> Result<Vec<IndexUnit>> {
        let mut units = Vec::new();
        for resolved in &self.sources {
            let files = walk_files(&resolved.root, DOCUMENT_SKIPPED_DIRECTORIES, is_document_file);
            info!(
                "Found {} documentation files in {} ({})",
                files.len(),
                resolved.source.name,
                resolved.root.display()
            );
            units.extend(
                files
                    .into_iter()
                    .map(|path| IndexUnit::new(&resolved.source.name, path)),
            );
        }
        Ok(units)
    }

    #[inline]
    fn extract(&self, unit: &IndexUnit) -> Result<Vec<DocumentRecord>> {
        let resolved = self.resolved(&unit.group)?;
        let metadata = parse_document_file(&unit.path)?;
        Ok(vec![document_record(
            &metadata,
            resolved,
            &unit.path,
            self.max_content_chars,
        )])
    }

    #[inline]
    fn embedding_text(&self, record: &DocumentRecord) -> String {
        document_embedding_text(record)
    }
}

/// Page path relative to its source root without the `.md` or `/page.tsx` suffix
#[inline]
pub fn page_stem(relative: &str) -> String {
    let stem = relative.strip_suffix(".md").unwrap_or(relative);
    if stem == EDITOR_PAGE_FILE {
        return String::new();
    }
    stem.strip_suffix(&format!("/{}", EDITOR_PAGE_FILE))
        .unwrap_or(stem)
        .to_string()
}

/// `{source}_{stem with / as _}`
#[inline]
pub fn document_id(source_name: &str, stem: &str) -> String {
    let stem = if stem.is_empty() { ROOT_PAGE_ID } else { stem };
    format!("{}_{}", source_name, stem.replace('/', "_"))
}

/// Public URL of a page from its stem
#[inline]
pub fn document_url(source: &DocumentSource, stem: &str) -> String {
    let prefix = source.url_prefix.trim_end_matches('/');
    if stem.is_empty() {
        return prefix.to_string();
    }
    format!(
        "{}/{}{}",
        prefix,
        stem,
        source.url_extension.as_deref().unwrap_or_default()
    )
}

/// Flatten extracted page metadata into the stored record shape
#[inline]
pub fn document_record(
    metadata: &DocumentMetadata,
    resolved: &ResolvedSource,
    path: &Path,
    max_content_chars: usize,
) -> DocumentRecord {
    let stem = page_stem(&relative_path(path, &resolved.root));
    let category = if metadata.category.is_empty() {
        UNCATEGORIZED.to_string()
    } else {
        metadata.category.clone()
    };

    DocumentRecord {
        id: document_id(&resolved.source.name, &stem),
        title: metadata.title.clone(),
        description: metadata.description.clone(),
        content: truncate_chars(&metadata.content, max_content_chars),
        keywords: metadata.keywords.join(LIST_SEPARATOR),
        category,
        breadcrumbs: metadata.breadcrumbs.join(BREADCRUMB_SEPARATOR),
        file_path: metadata.file_path.clone(),
        url: document_url(&resolved.source, &stem),
        source: resolved.source.name.clone(),
        headings: metadata
            .headings
            .iter()
            .map(|heading| heading.text.as_str())
            .collect::<Vec<_>>()
            .join(HEADING_SEPARATOR),
        code_snippets: metadata
            .code_blocks
            .iter()
            .take(STORED_CODE_SNIPPETS)
            .map(|block| block.code.as_str())
            .collect::<Vec<_>>()
            .join(CODE_SNIPPET_SEPARATOR),
        playground_ids: metadata.playground_ids.join(LIST_SEPARATOR),
        last_modified: metadata.last_modified.to_rfc3339(),
    }
}
