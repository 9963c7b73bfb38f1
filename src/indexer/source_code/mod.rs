//! Package source files split into overlapping line windows.


use std::path::PathBuf;
use tracing::info;

use super::api::package_source_dir;
use super::{IndexSource, IndexUnit};
use crate::config::Config;
use crate::embeddings::{ChunkingConfig, chunk_lines, source_embedding_text};
use crate::extract::source::{
    discover_source_files, extract_exports, extract_imports, relative_path, source_language,
};
use crate::records::{LIST_SEPARATOR, SourceChunkRecord};
use crate::{DocsError, Result};

#[derive(Debug, Clone)]
pub struct SourceCodeSource {
    repository_root: PathBuf,
    packages: Vec<String>,
    table_name: String,
    url_base: String,
    chunking: ChunkingConfig,
}

impl SourceCodeSource {
    /// Fails when the chunking window leaves gaps between chunks
    #[inline]
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.source_repository_path(),
            config.indexing.source_packages.clone(),
            &config.indexing.source_table,
            &config.indexing.source_url_base,
            config.chunking,
        )
    }

    #[inline]
    pub fn new(
        repository_root: PathBuf,
        packages: Vec<String>,
        table_name: &str,
        url_base: &str,
        chunking: ChunkingConfig,
    ) -> Result<Self> {
        chunking
            .validate()
            .map_err(|e| DocsError::Config(e.to_string()))?;
        Ok(Self {
            repository_root,
            packages,
            table_name: table_name.to_string(),
            url_base: url_base.trim_end_matches('/').to_string(),
            chunking,
        })
    }

    #[inline]
    #[must_use]
    pub fn with_packages(mut self, packages: Vec<String>) -> Self {
        if !packages.is_empty() {
            self.packages = packages;
        }
        self
    }

    /// Write to a different table, e.g. to keep test runs apart
    #[inline]
    #[must_use]
    pub fn with_table_name(mut self, table_name: &str) -> Self {
        self.table_name = table_name.to_string();
        self
    }

    #[inline]
    pub fn packages(&self) -> &[String] {
        &self.packages
    }
}

impl IndexSource for SourceCodeSource {
    type Record = SourceChunkRecord;

    #[inline]
    fn name(&self) -> &str {
        "source code"
    }

    #[inline]
    fn table_name(&self) -> &str {
        &self.table_name
    }

    #[inline]
    fn discover(&self) -> Result<Vec<IndexUnit>> {
        let mut units = Vec::new();
        for package in &self.packages {
            let files = discover_source_files(&package_source_dir(&self.repository_root, package));
            info!("Found {} source files in {}", files.len(), package);
            units.extend(files.into_iter().map(|path| IndexUnit::new(package, path)));
        }
        Ok(units)
    }

    #[inline]
    fn extract(&self, unit: &IndexUnit) -> Result<Vec<SourceChunkRecord>> {
        let content = std::fs::read_to_string(&unit.path).map_err(|e| {
            DocsError::Extraction(format!("Failed to read {}: {}", unit.path.display(), e))
        })?;

        let file_path = relative_path(&unit.path, &self.repository_root);
        let imports = extract_imports(&content).join(LIST_SEPARATOR);
        let exports = extract_exports(&content).join(LIST_SEPARATOR);
        let language = source_language(&unit.path);

        let chunks = chunk_lines(&content, &self.chunking)?;
        Ok(chunks
            .into_iter()
            .map(|chunk| {
                let start_line = u32::try_from(chunk.start_line).unwrap_or(u32::MAX);
                let end_line = u32::try_from(chunk.end_line).unwrap_or(u32::MAX);
                SourceChunkRecord {
                    id: format!("{}:{}-{}", file_path, start_line, end_line),
                    url: format!(
                        "{}/{}#L{}-L{}",
                        self.url_base, file_path, start_line, end_line
                    ),
                    file_path: file_path.clone(),
                    package: unit.group.clone(),
                    content: chunk.content,
                    start_line,
                    end_line,
                    language: language.to_string(),
                    imports: imports.clone(),
                    exports: exports.clone(),
                }
            })
            .collect())
    }

    #[inline]
    fn embedding_text(&self, record: &SourceChunkRecord) -> String {
        source_embedding_text(record)
    }
}
