// Indexer module
// One batch pipeline (discover, extract, embed, swap table) shared by every index source

pub mod api;
pub mod documents;
pub mod source_code;

#[cfg(test)]
mod tests;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info};

use crate::config::Config;
use crate::database::{EmbeddingRecord, TableRecord, VectorStore};
use crate::embeddings::Embedder;
use crate::{DocsError, Result};

pub use api::ApiSource;
pub use documents::DocumentSourceSet;
pub use source_code::SourceCodeSource;

/// Units between progress log lines
pub const PROGRESS_INTERVAL: usize = 50;

/// One discovered item of an index source: a file and the group it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexUnit {
    /// Document source name or package name
    pub group: String,
    pub path: PathBuf,
}

impl IndexUnit {
    #[inline]
    pub fn new(group: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            group: group.into(),
            path: path.into(),
        }
    }
}

impl fmt::Display for IndexUnit {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.path.display(), self.group)
    }
}

/// Strategy plugged into [`BatchIndexer`]: where units come from, how each
/// becomes records and what text represents a record for embedding
///
/// `extract` does blocking file reads and parsing; the indexer runs it on the
/// blocking pool against a shared clone of the source.
pub trait IndexSource: Clone + Send + Sync + 'static {
    type Record: TableRecord + Send + Sync + 'static;

    /// Short label used in logs
    fn name(&self) -> &str;

    /// Table rebuilt by this source
    fn table_name(&self) -> &str;

    /// Units to index, in a stable order
    fn discover(&self) -> Result<Vec<IndexUnit>>;

    /// Records produced by one unit
    fn extract(&self, unit: &IndexUnit) -> Result<Vec<Self::Record>>;

    fn embedding_text(&self, record: &Self::Record) -> String;
}

/// Outcome of one indexing run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexingStats {
    pub source: String,
    pub table_name: String,
    pub units_discovered: usize,
    pub units_processed: usize,
    pub units_failed: usize,
    pub records_written: usize,
    pub duration: Duration,
}

/// Full-rebuild indexing pipeline
///
/// Every unit is extracted and embedded in discovery order; failures are
/// logged and the unit skipped. Once all units are processed the target
/// table is replaced in a single bulk write.
pub struct BatchIndexer {
    vector_path: PathBuf,
    embedder: Arc<dyn Embedder>,
    store: Option<VectorStore>,
}

impl BatchIndexer {
    #[inline]
    pub fn new(config: &Config, embedder: Arc<dyn Embedder>) -> Self {
        Self::with_store_path(&config.vector_database_path(), embedder)
    }

    #[inline]
    pub fn with_store_path(vector_path: &Path, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            vector_path: vector_path.to_path_buf(),
            embedder,
            store: None,
        }
    }

    /// Connect the vector store and check the embedder is usable
    #[inline]
    pub async fn initialize(&mut self) -> Result<()> {
        info!("Initializing indexer at {:?}", self.vector_path);
        self.embedder.health_check().await?;
        self.store = Some(VectorStore::open(&self.vector_path).await?);
        Ok(())
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.store.is_some()
    }

    /// Rebuild the source's table from everything it discovers
    ///
    /// # Returns
    /// * `Result<IndexingStats>` - Counts for the run; fails only when not
    ///   initialized, when discovery fails or when the final table write fails
    #[inline]
    pub async fn index<S: IndexSource>(&self, source: &S) -> Result<IndexingStats> {
        let store = self.store.as_ref().ok_or(DocsError::NotInitialized("Indexer"))?;
        let started = Instant::now();

        let units = source.discover()?;
        info!(
            "Indexing {} units from {} into table {}",
            units.len(),
            source.name(),
            source.table_name()
        );

        let shared = Arc::new(source.clone());
        let mut records = Vec::new();
        let mut processed = 0;
        let mut failed = 0;

        for (index, unit) in units.iter().enumerate() {
            match self.process_unit(&shared, unit).await {
                Ok(unit_records) => {
                    debug!("Indexed {} records from {}", unit_records.len(), unit);
                    records.extend(unit_records);
                    processed += 1;
                }
                Err(e) => {
                    error!("Error processing {}: {}", unit, e);
                    failed += 1;
                }
            }

            if (index + 1) % PROGRESS_INTERVAL == 0 {
                info!("Processed {}/{} units...", index + 1, units.len());
            }
        }

        info!(
            "Writing {} records to table {}",
            records.len(),
            source.table_name()
        );
        let written = store
            .replace_table(source.table_name(), &records, self.embedder.dimension())
            .await?;

        let stats = IndexingStats {
            source: source.name().to_string(),
            table_name: source.table_name().to_string(),
            units_discovered: units.len(),
            units_processed: processed,
            units_failed: failed,
            records_written: written,
            duration: started.elapsed(),
        };
        info!(
            "Indexing {} complete: {} records from {} units ({} failed) in {:.1}s",
            stats.source,
            stats.records_written,
            stats.units_processed,
            stats.units_failed,
            stats.duration.as_secs_f64()
        );
        Ok(stats)
    }

    async fn process_unit<S: IndexSource>(
        &self,
        source: &Arc<S>,
        unit: &IndexUnit,
    ) -> Result<Vec<EmbeddingRecord<S::Record>>> {
        let records = extract_blocking(source, unit).await?;
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<String> = records
            .iter()
            .map(|record| source.embedding_text(record))
            .collect();
        let vectors = self.embedder.embed_batch(&texts).await?;

        if vectors.len() != records.len() {
            return Err(DocsError::Embedding(format!(
                "Expected {} embeddings, got {}",
                records.len(),
                vectors.len()
            )));
        }
        let dimension = self.embedder.dimension();
        if let Some(vector) = vectors.iter().find(|vector| vector.len() != dimension) {
            return Err(DocsError::Embedding(format!(
                "Expected {}-dimensional embeddings, got {}",
                dimension,
                vector.len()
            )));
        }

        Ok(records
            .into_iter()
            .zip(vectors)
            .map(|(record, vector)| EmbeddingRecord::new(record, vector))
            .collect())
    }

    /// Release the store connection; a no-op when never initialized
    #[inline]
    pub fn close(&mut self) {
        if self.store.take().is_some() {
            info!("Indexer closed");
        }
    }
}

/// Run `extract` for one unit on the blocking pool
async fn extract_blocking<S: IndexSource>(source: &Arc<S>, unit: &IndexUnit) -> Result<Vec<S::Record>> {
    let source = Arc::clone(source);
    let unit = unit.clone();
    tokio::task::spawn_blocking(move || source.extract(&unit))
        .await
        .map_err(|e| DocsError::Extraction(format!("Extraction task failed: {}", e)))?
}
