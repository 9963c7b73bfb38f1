// Query engine: similarity search over the docs, API and source tables and
// direct lookups of single documents and source files

pub mod lookup;
pub mod snippet;


use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::database::{VectorStore, equality_predicate};
use crate::embeddings::Embedder;
use crate::indexer::documents::ResolvedSource;
use crate::records::{ApiEntryRecord, DocumentRecord, Scored, SearchResult, SourceChunkRecord};
use crate::{DocsError, Result};

pub use snippet::extract_snippet;

/// Results returned when a caller does not ask for a specific count
pub const DEFAULT_LIMIT: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOptions {
    /// Zero means [`DEFAULT_LIMIT`]
    pub limit: usize,
    /// Exact category to restrict results to
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceSearchOptions {
    pub package: Option<String>,
    /// Zero means [`DEFAULT_LIMIT`]
    pub limit: usize,
    /// Overrides the configured source table
    pub table_name: Option<String>,
}

/// Bounded relevance from a store distance: `0` when absent, else `1 - d` clamped to `[0, 1]`
#[inline]
pub fn distance_to_score(distance: Option<f32>) -> f32 {
    distance.map_or(0.0, |d| (1.0 - d).clamp(0.0, 1.0))
}

fn effective_limit(limit: usize) -> usize {
    if limit == 0 { DEFAULT_LIMIT } else { limit }
}

/// Table names and locations the engine reads from
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub vector_path: PathBuf,
    pub docs_table: String,
    pub api_table: String,
    pub source_table: String,
    pub source_repository: PathBuf,
    pub document_sources: Vec<ResolvedSource>,
}

impl EngineSettings {
    #[inline]
    pub fn from_config(config: &Config) -> Self {
        Self {
            vector_path: config.vector_database_path(),
            docs_table: config.indexing.docs_table.clone(),
            api_table: config.indexing.api_table.clone(),
            source_table: config.indexing.source_table.clone(),
            source_repository: config.source_repository_path(),
            document_sources: config
                .document_sources
                .iter()
                .map(|source| ResolvedSource {
                    root: config.document_source_root(source),
                    source: source.clone(),
                })
                .collect(),
        }
    }
}

struct EngineState {
    store: VectorStore,
    embedder: Arc<dyn Embedder>,
}

/// Search context built once at startup and shared by request handlers
pub struct QueryEngine {
    settings: EngineSettings,
    state: Option<EngineState>,
}

impl QueryEngine {
    #[inline]
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            state: None,
        }
    }

    /// Build and initialize in one step
    #[inline]
    pub async fn connect(settings: EngineSettings, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let mut engine = Self::new(settings);
        engine.initialize(embedder).await?;
        Ok(engine)
    }

    /// Open the vector store and attach the embedder used for queries
    #[inline]
    pub async fn initialize(&mut self, embedder: Arc<dyn Embedder>) -> Result<()> {
        let store = VectorStore::open(&self.settings.vector_path).await?;
        if !store.has_table(&self.settings.docs_table).await? {
            warn!(
                "Documentation table {} does not exist yet; run the docs indexer",
                self.settings.docs_table
            );
        }
        info!("Query engine ready at {:?}", self.settings.vector_path);
        self.state = Some(EngineState { store, embedder });
        Ok(())
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    #[inline]
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    fn state(&self) -> Result<&EngineState> {
        self.state
            .as_ref()
            .ok_or(DocsError::NotInitialized("Search"))
    }

    /// Prose documentation search
    ///
    /// Results keep the store's ranking order; each carries a snippet of the
    /// page around the query terms instead of the full body.
    #[inline]
    pub async fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<SearchResult>> {
        let state = self.state()?;
        let vector = state.embedder.embed(query).await?;
        let filter = options
            .category
            .as_deref()
            .map(|category| equality_predicate("category", category));

        let hits = state
            .store
            .search::<DocumentRecord>(
                &self.settings.docs_table,
                &vector,
                effective_limit(options.limit),
                filter.as_deref(),
            )
            .await?;
        debug!("Docs search for {:?} returned {} hits", query, hits.len());

        Ok(hits
            .into_iter()
            .map(|(doc, distance)| SearchResult {
                content: extract_snippet(&doc.content, query),
                keywords: doc.keyword_list(),
                score: distance_to_score(distance),
                title: doc.title,
                description: doc.description,
                url: doc.url,
                category: doc.category,
                source: doc.source,
            })
            .collect())
    }

    /// API reference search; entries are returned whole
    #[inline]
    pub async fn search_api(&self, query: &str, limit: usize) -> Result<Vec<Scored<ApiEntryRecord>>> {
        let state = self.state()?;
        let vector = state.embedder.embed(query).await?;
        let hits = state
            .store
            .search::<ApiEntryRecord>(
                &self.settings.api_table,
                &vector,
                effective_limit(limit),
                None,
            )
            .await?;

        Ok(hits
            .into_iter()
            .map(|(record, distance)| Scored {
                record,
                score: distance_to_score(distance),
            })
            .collect())
    }

    /// Source chunk search, optionally restricted to one package
    #[inline]
    pub async fn search_source_code(
        &self,
        query: &str,
        options: &SourceSearchOptions,
    ) -> Result<Vec<Scored<SourceChunkRecord>>> {
        let state = self.state()?;
        let vector = state.embedder.embed(query).await?;
        let table = options
            .table_name
            .as_deref()
            .unwrap_or(&self.settings.source_table);
        let filter = options
            .package
            .as_deref()
            .map(|package| equality_predicate("package", package));

        let hits = state
            .store
            .search::<SourceChunkRecord>(
                table,
                &vector,
                effective_limit(options.limit),
                filter.as_deref(),
            )
            .await?;

        Ok(hits
            .into_iter()
            .map(|(record, distance)| Scored {
                record,
                score: distance_to_score(distance),
            })
            .collect())
    }

    /// Exact lookup by document id
    #[inline]
    pub async fn get_document(&self, id: &str) -> Result<Option<DocumentRecord>> {
        self.find_document("id", id).await
    }

    async fn find_document(&self, column: &str, value: &str) -> Result<Option<DocumentRecord>> {
        let state = self.state()?;
        let mut rows = state
            .store
            .query::<DocumentRecord>(
                &self.settings.docs_table,
                Some(&equality_predicate(column, value)),
                Some(1),
            )
            .await?;
        Ok(rows.pop())
    }

    /// Lookup by URL, falling back to an id derived from the path
    ///
    /// A URL hit has its content replaced by the current local file when
    /// one can be read. A miss on both lookups is `Ok(None)`.
    #[inline]
    pub async fn get_document_by_path(&self, path: &str) -> Result<Option<DocumentRecord>> {
        if let Some(mut doc) = self.find_document("url", path).await? {
            if let Some(fresh) = self.read_fresh_content(&doc.file_path).await {
                doc.content = fresh;
            }
            return Ok(Some(doc));
        }

        let id = lookup::path_to_doc_id(path, &self.settings.document_sources);
        debug!("No document with url {:?}; trying id {}", path, id);
        self.get_document(&id).await
    }

    async fn read_fresh_content(&self, file_path: &str) -> Option<String> {
        for candidate in lookup::overlay_candidates(file_path, &self.settings.document_sources) {
            match tokio::fs::read_to_string(&candidate).await {
                Ok(content) => {
                    debug!("Serving fresh content from {:?}", candidate);
                    return Some(content);
                }
                Err(e) => debug!("No local copy at {:?}: {}", candidate, e),
            }
        }
        None
    }

    /// Read a file of the source repository, whole or as a 1-indexed inclusive
    /// line range when both bounds are given
    ///
    /// Unreadable files and paths leaving the repository are `Ok(None)`.
    #[inline]
    pub async fn get_source_file(
        &self,
        path: &str,
        start_line: Option<usize>,
        end_line: Option<usize>,
    ) -> Result<Option<String>> {
        let Some(full_path) = lookup::resolve_within(&self.settings.source_repository, path) else {
            warn!("Refusing source path outside the repository: {}", path);
            return Ok(None);
        };

        let content = match tokio::fs::read_to_string(&full_path).await {
            Ok(content) => content,
            Err(e) => {
                error!("Error reading source file {}: {}", path, e);
                return Ok(None);
            }
        };

        Ok(Some(match (start_line, end_line) {
            (Some(start), Some(end)) => lookup::slice_lines(&content, start, end),
            _ => content,
        }))
    }

    /// Release the store connection and embedder
    #[inline]
    pub fn close(&mut self) {
        if self.state.take().is_some() {
            info!("Query engine closed");
        }
    }
}
