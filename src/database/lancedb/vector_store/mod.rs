
use super::EmbeddingRecord;
use super::schema::{self, TableRecord, VECTOR_COLUMN};
use crate::{DocsError, Result, config::Config};
use arrow::array::RecordBatchIterator;
use arrow::datatypes::DataType;
use futures::TryStreamExt;
use lancedb::{
    Connection, Table,
    arrow::SendableRecordBatchStream,
    query::{ExecutableQuery, QueryBase},
};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// LanceDB connection shared by the indexer and the query engine
pub struct VectorStore {
    connection: Connection,
    path: PathBuf,
}

impl VectorStore {
    /// Open the store under the configured vector database path
    #[inline]
    pub async fn new(config: &Config) -> Result<Self> {
        Self::open(&config.vector_database_path()).await
    }

    /// Open (creating if needed) a LanceDB directory
    ///
    /// # Arguments
    /// * `path` - Directory holding the LanceDB tables
    ///
    /// # Returns
    /// * `Result<Self>` - Connected store or error
    #[inline]
    pub async fn open(path: &Path) -> Result<Self> {
        debug!("Connecting to LanceDB at path: {:?}", path);

        std::fs::create_dir_all(path).map_err(|e| {
            DocsError::Database(format!("Failed to create vector database directory: {}", e))
        })?;

        let uri = format!("file://{}", path.display());
        let connection = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| DocsError::Database(format!("Failed to connect to LanceDB: {}", e)))?;

        Ok(Self {
            connection,
            path: path.to_path_buf(),
        })
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub async fn table_names(&self) -> Result<Vec<String>> {
        self.connection
            .table_names()
            .execute()
            .await
            .map_err(|e| DocsError::Database(format!("Failed to list tables: {}", e)))
    }

    #[inline]
    pub async fn has_table(&self, name: &str) -> Result<bool> {
        Ok(self.table_names().await?.iter().any(|table| table == name))
    }

    async fn open_table(&self, name: &str) -> Result<Table> {
        self.connection
            .open_table(name)
            .execute()
            .await
            .map_err(|e| DocsError::Database(format!("Failed to open table {}: {}", name, e)))
    }

    /// Drop a table; returns whether it existed
    #[inline]
    pub async fn drop_table_if_exists(&self, name: &str) -> Result<bool> {
        if !self.has_table(name).await? {
            return Ok(false);
        }

        info!("Dropping existing table {}", name);
        self.connection
            .drop_table(name)
            .await
            .map_err(|e| DocsError::Database(format!("Failed to drop table {}: {}", name, e)))?;
        Ok(true)
    }

    /// Replace a table's contents with `records` in one bulk write
    ///
    /// The Arrow batch is built before the old table is dropped, so a
    /// malformed record leaves the previous table untouched. An empty input
    /// creates an empty table of the given dimension.
    ///
    /// # Returns
    /// * `Result<usize>` - Number of rows written
    #[inline]
    pub async fn replace_table<R: TableRecord>(
        &self,
        name: &str,
        records: &[EmbeddingRecord<R>],
        dimension: usize,
    ) -> Result<usize> {
        let batch = if records.is_empty() {
            None
        } else {
            Some(schema::record_batch(records, dimension)?)
        };
        let table_schema = schema::schema_for::<R>(dimension)?;

        self.drop_table_if_exists(name).await?;

        match batch {
            Some(batch) => {
                let reader =
                    RecordBatchIterator::new(std::iter::once(Ok(batch)), table_schema);
                self.connection
                    .create_table(name, reader)
                    .execute()
                    .await
                    .map_err(|e| {
                        DocsError::Database(format!("Failed to create table {}: {}", name, e))
                    })?;
            }
            None => {
                self.connection
                    .create_empty_table(name, table_schema)
                    .execute()
                    .await
                    .map_err(|e| {
                        DocsError::Database(format!("Failed to create table {}: {}", name, e))
                    })?;
            }
        }

        info!("Wrote {} rows to table {}", records.len(), name);
        Ok(records.len())
    }

    /// Nearest neighbours of `vector`, each with its distance when reported
    ///
    /// # Arguments
    /// * `name` - Table to search
    /// * `vector` - Query embedding
    /// * `limit` - Maximum number of rows
    /// * `filter` - Optional SQL predicate applied before ranking
    #[inline]
    pub async fn search<R: TableRecord>(
        &self,
        name: &str,
        vector: &[f32],
        limit: usize,
        filter: Option<&str>,
    ) -> Result<Vec<(R, Option<f32>)>> {
        debug!("Searching {} with limit {}", name, limit);

        let table = self.open_table(name).await?;
        let mut query = table
            .vector_search(vector)
            .map_err(|e| DocsError::Database(format!("Failed to create vector search: {}", e)))?
            .column(VECTOR_COLUMN)
            .limit(limit);

        if let Some(predicate) = filter {
            query = query.only_if(predicate);
        }

        let stream = query
            .execute()
            .await
            .map_err(|e| DocsError::Database(format!("Failed to execute search: {}", e)))?;

        let mut results = Vec::new();
        for batch in collect_batches(stream).await? {
            let distances = schema::distances(&batch);
            results.extend(R::from_batch(&batch)?.into_iter().zip(distances));
        }

        debug!("Search on {} returned {} rows", name, results.len());
        Ok(results)
    }

    /// Rows matching a predicate, without ranking
    #[inline]
    pub async fn query<R: TableRecord>(
        &self,
        name: &str,
        filter: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<R>> {
        let table = self.open_table(name).await?;
        let mut query = table.query();
        if let Some(predicate) = filter {
            query = query.only_if(predicate);
        }
        if let Some(limit) = limit {
            query = query.limit(limit);
        }

        let stream = query
            .execute()
            .await
            .map_err(|e| DocsError::Database(format!("Failed to execute query: {}", e)))?;

        let mut records = Vec::new();
        for batch in collect_batches(stream).await? {
            records.extend(R::from_batch(&batch)?);
        }
        Ok(records)
    }

    #[inline]
    pub async fn count_rows(&self, name: &str) -> Result<usize> {
        self.open_table(name)
            .await?
            .count_rows(None)
            .await
            .map_err(|e| DocsError::Database(format!("Failed to count rows: {}", e)))
    }

    /// Width of a table's vector column
    #[inline]
    pub async fn vector_dimension(&self, name: &str) -> Result<usize> {
        let table_schema = self
            .open_table(name)
            .await?
            .schema()
            .await
            .map_err(|e| DocsError::Database(format!("Failed to get table schema: {}", e)))?;

        table_schema
            .field_with_name(VECTOR_COLUMN)
            .ok()
            .and_then(|field| match field.data_type() {
                DataType::FixedSizeList(_, size) => usize::try_from(*size).ok(),
                _ => None,
            })
            .ok_or_else(|| {
                DocsError::Database(format!(
                    "Could not determine vector dimension of table {}",
                    name
                ))
            })
    }
}

async fn collect_batches(
    stream: SendableRecordBatchStream,
) -> Result<Vec<arrow::record_batch::RecordBatch>> {
    stream
        .try_collect()
        .await
        .map_err(|e| DocsError::Database(format!("Failed to read result stream: {}", e)))
}
