//! API reference: documented declarations of the configured packages.

#[cfg(test)]
mod tests;

use fancy_regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::info;

use super::{IndexSource, IndexUnit};
use crate::config::Config;
use crate::embeddings::api_embedding_text;
use crate::extract::source::{SKIPPED_DIRECTORIES, is_api_file, relative_path, walk_files};
use crate::extract::tsdoc::extract_api_file;
use crate::records::{
    ApiDocumentation, ApiEntryRecord, EXAMPLE_SEPARATOR, LIST_SEPARATOR,
};
use crate::{DocsError, Result};

static NON_ALPHANUMERIC_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9]").expect("valid regex"));

static PACKAGE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"packages/dev/([^/]+)/").expect("valid regex"));

static PACKAGES_PREFIX_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^.*/packages/").expect("valid regex"));

/// Source directory of a package inside the framework repository
#[inline]
pub fn package_source_dir(repository_root: &Path, package: &str) -> PathBuf {
    repository_root
        .join("packages")
        .join("dev")
        .join(package)
        .join("src")
}

#[derive(Debug, Clone)]
pub struct ApiSource {
    repository_root: PathBuf,
    packages: Vec<String>,
    table_name: String,
    url_base: String,
}

impl ApiSource {
    #[inline]
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.source_repository_path(),
            config.indexing.api_packages.clone(),
            &config.indexing.api_table,
            &config.indexing.source_url_base,
        )
    }

    #[inline]
    pub fn new(
        repository_root: PathBuf,
        packages: Vec<String>,
        table_name: &str,
        url_base: &str,
    ) -> Self {
        Self {
            repository_root,
            packages,
            table_name: table_name.to_string(),
            url_base: url_base.trim_end_matches('/').to_string(),
        }
    }

    #[inline]
    #[must_use]
    pub fn with_packages(mut self, packages: Vec<String>) -> Self {
        if !packages.is_empty() {
            self.packages = packages;
        }
        self
    }

    #[inline]
    pub fn packages(&self) -> &[String] {
        &self.packages
    }
}

impl IndexSource for ApiSource {
    type Record = ApiEntryRecord;

    #[inline]
    fn name(&self) -> &str {
        "api"
    }

    #[inline]
    fn table_name(&self) -> &str {
        &self.table_name
    }

    #[inline]
    fn discover(&self) -> Result<Vec<IndexUnit>> {
        let mut units = Vec::new();
        for package in &self.packages {
            let root = package_source_dir(&self.repository_root, package);
            let files = walk_files(&root, SKIPPED_DIRECTORIES, is_api_file);
            info!("Found {} TypeScript files in {}", files.len(), package);
            units.extend(files.into_iter().map(|path| IndexUnit::new(package, path)));
        }
        Ok(units)
    }

    #[inline]
    fn extract(&self, unit: &IndexUnit) -> Result<Vec<ApiEntryRecord>> {
        let source_file = relative_path(&unit.path, &self.repository_root);
        extract_api_file(&unit.path, &source_file)?
            .iter()
            .map(|doc| api_record(doc, &self.url_base))
            .collect()
    }

    #[inline]
    fn embedding_text(&self, record: &ApiEntryRecord) -> String {
        api_embedding_text(record)
    }
}

/// `api_{Kind}_{full name with every non-alphanumeric replaced by _}`
#[inline]
pub fn api_id(doc: &ApiDocumentation) -> String {
    format!(
        "api_{}_{}",
        doc.kind,
        NON_ALPHANUMERIC_REGEX.replace_all(&doc.full_name, "_")
    )
}

/// `api/{package}` for package sources, else `api/{kind}`
#[inline]
pub fn api_category(doc: &ApiDocumentation) -> String {
    match PACKAGE_REGEX.captures(&doc.source_file) {
        Ok(Some(captures)) => captures.get(1).map_or_else(
            || format!("api/{}", doc.kind.as_str().to_lowercase()),
            |package| format!("api/{}", package.as_str()),
        ),
        _ => format!("api/{}", doc.kind.as_str().to_lowercase()),
    }
}

/// Link to the declaration line in the hosted repository
#[inline]
pub fn api_url(doc: &ApiDocumentation, url_base: &str) -> String {
    let path = PACKAGES_PREFIX_REGEX.replace(&doc.source_file, "packages/");
    format!("{}/{}#L{}", url_base, path, doc.source_line)
}

#[inline]
pub fn api_record(doc: &ApiDocumentation, url_base: &str) -> Result<ApiEntryRecord> {
    let parameters = serde_json::to_string(&doc.parameters)
        .map_err(|e| DocsError::Extraction(format!("Failed to encode parameters: {}", e)))?;
    let returns = doc
        .returns
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| DocsError::Extraction(format!("Failed to encode return value: {}", e)))?
        .unwrap_or_default();

    Ok(ApiEntryRecord {
        id: api_id(doc),
        name: doc.name.clone(),
        full_name: doc.full_name.clone(),
        kind: doc.kind,
        summary: doc.summary.clone(),
        description: doc.description.clone(),
        examples: doc.examples.join(EXAMPLE_SEPARATOR),
        parameters,
        returns,
        type_name: doc.type_name.clone().unwrap_or_default(),
        deprecated: doc.deprecated.clone().unwrap_or_default(),
        see: doc.see.join(LIST_SEPARATOR),
        since: doc.since.clone().unwrap_or_default(),
        source_file: doc.source_file.clone(),
        source_line: doc.source_line,
        category: api_category(doc),
        url: api_url(doc, url_base),
    })
}
