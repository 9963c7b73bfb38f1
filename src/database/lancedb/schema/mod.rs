
use arrow::array::{Array, ArrayRef, FixedSizeListArray, Float32Array, StringArray, UInt32Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;

use super::EmbeddingRecord;
use crate::records::{ApiEntryRecord, ApiKind, DocumentRecord, SourceChunkRecord};
use crate::{DocsError, Result};

/// Name of the embedding column in every table
pub const VECTOR_COLUMN: &str = "vector";
/// Column LanceDB adds to similarity search results
pub const DISTANCE_COLUMN: &str = "_distance";

/// A record type with a fixed columnar layout in the vector store
pub trait TableRecord: Sized {
    /// Scalar columns in storage order, excluding the vector
    fn fields() -> Vec<Field>;

    /// One array per field of [`TableRecord::fields`]
    fn columns(records: &[&Self]) -> Vec<ArrayRef>;

    /// Rebuild records from a batch read back from the store
    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>>;
}

fn text_field(name: &str) -> Field {
    Field::new(name, DataType::Utf8, false)
}

fn number_field(name: &str) -> Field {
    Field::new(name, DataType::UInt32, false)
}

fn vector_dimension(dimension: usize) -> Result<i32> {
    i32::try_from(dimension)
        .map_err(|_| DocsError::Database(format!("Vector dimension {} is too large", dimension)))
}

/// Full table schema: the record's columns followed by the vector column
#[inline]
pub fn schema_for<R: TableRecord>(dimension: usize) -> Result<Arc<Schema>> {
    let mut fields = R::fields();
    fields.push(Field::new(
        VECTOR_COLUMN,
        DataType::FixedSizeList(
            Arc::new(Field::new("item", DataType::Float32, false)),
            vector_dimension(dimension)?,
        ),
        false,
    ));
    Ok(Arc::new(Schema::new(fields)))
}

/// Build one Arrow batch holding every record and its vector
///
/// # Arguments
/// * `records` - Records with vectors of exactly `dimension` values
/// * `dimension` - Width of the vector column
#[inline]
pub fn record_batch<R: TableRecord>(
    records: &[EmbeddingRecord<R>],
    dimension: usize,
) -> Result<RecordBatch> {
    if let Some(bad) = records.iter().find(|r| r.vector.len() != dimension) {
        return Err(DocsError::Database(format!(
            "Vector of length {} does not match table dimension {}",
            bad.vector.len(),
            dimension
        )));
    }

    let schema = schema_for::<R>(dimension)?;
    let rows: Vec<&R> = records.iter().map(|r| &r.record).collect();
    let mut arrays = R::columns(&rows);

    let mut flat_values = Vec::with_capacity(records.len() * dimension);
    for record in records {
        flat_values.extend_from_slice(&record.vector);
    }
    let field = Arc::new(Field::new("item", DataType::Float32, false));
    let vector_array = FixedSizeListArray::try_new(
        field,
        vector_dimension(dimension)?,
        Arc::new(Float32Array::from(flat_values)),
        None,
    )
    .map_err(|e| DocsError::Database(format!("Failed to create vector array: {}", e)))?;
    arrays.push(Arc::new(vector_array));

    RecordBatch::try_new(schema, arrays)
        .map_err(|e| DocsError::Database(format!("Failed to create record batch: {}", e)))
}

/// Per-row distances of a search batch, `None` where the column is absent or null
#[inline]
pub fn distances(batch: &RecordBatch) -> Vec<Option<f32>> {
    let column = batch
        .column_by_name(DISTANCE_COLUMN)
        .and_then(|col| col.as_any().downcast_ref::<Float32Array>());
    (0..batch.num_rows())
        .map(|row| column.and_then(|d| (!d.is_null(row)).then(|| d.value(row))))
        .collect()
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .ok_or_else(|| DocsError::Database(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| DocsError::Database(format!("Invalid {} column type", name)))
}

fn number_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a UInt32Array> {
    batch
        .column_by_name(name)
        .ok_or_else(|| DocsError::Database(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<UInt32Array>()
        .ok_or_else(|| DocsError::Database(format!("Invalid {} column type", name)))
}

fn texts<R>(records: &[&R], get: impl Fn(&R) -> &str) -> ArrayRef {
    Arc::new(StringArray::from_iter_values(records.iter().map(|r| get(r))))
}

fn numbers<R>(records: &[&R], get: impl Fn(&R) -> u32) -> ArrayRef {
    Arc::new(UInt32Array::from_iter_values(records.iter().map(|r| get(r))))
}

impl TableRecord for DocumentRecord {
    #[inline]
    fn fields() -> Vec<Field> {
        [
            "id",
            "title",
            "description",
            "content",
            "keywords",
            "category",
            "breadcrumbs",
            "file_path",
            "url",
            "source",
            "headings",
            "code_snippets",
            "playground_ids",
            "last_modified",
        ]
        .into_iter()
        .map(text_field)
        .collect()
    }

    #[inline]
    fn columns(records: &[&Self]) -> Vec<ArrayRef> {
        vec![
            texts(records, |r| &r.id),
            texts(records, |r| &r.title),
            texts(records, |r| &r.description),
            texts(records, |r| &r.content),
            texts(records, |r| &r.keywords),
            texts(records, |r| &r.category),
            texts(records, |r| &r.breadcrumbs),
            texts(records, |r| &r.file_path),
            texts(records, |r| &r.url),
            texts(records, |r| &r.source),
            texts(records, |r| &r.headings),
            texts(records, |r| &r.code_snippets),
            texts(records, |r| &r.playground_ids),
            texts(records, |r| &r.last_modified),
        ]
    }

    #[inline]
    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        let ids = string_column(batch, "id")?;
        let titles = string_column(batch, "title")?;
        let descriptions = string_column(batch, "description")?;
        let contents = string_column(batch, "content")?;
        let keywords = string_column(batch, "keywords")?;
        let categories = string_column(batch, "category")?;
        let breadcrumbs = string_column(batch, "breadcrumbs")?;
        let file_paths = string_column(batch, "file_path")?;
        let urls = string_column(batch, "url")?;
        let sources = string_column(batch, "source")?;
        let headings = string_column(batch, "headings")?;
        let code_snippets = string_column(batch, "code_snippets")?;
        let playground_ids = string_column(batch, "playground_ids")?;
        let last_modified = string_column(batch, "last_modified")?;

        Ok((0..batch.num_rows())
            .map(|row| Self {
                id: ids.value(row).to_string(),
                title: titles.value(row).to_string(),
                description: descriptions.value(row).to_string(),
                content: contents.value(row).to_string(),
                keywords: keywords.value(row).to_string(),
                category: categories.value(row).to_string(),
                breadcrumbs: breadcrumbs.value(row).to_string(),
                file_path: file_paths.value(row).to_string(),
                url: urls.value(row).to_string(),
                source: sources.value(row).to_string(),
                headings: headings.value(row).to_string(),
                code_snippets: code_snippets.value(row).to_string(),
                playground_ids: playground_ids.value(row).to_string(),
                last_modified: last_modified.value(row).to_string(),
            })
            .collect())
    }
}

impl TableRecord for ApiEntryRecord {
    #[inline]
    fn fields() -> Vec<Field> {
        vec![
            text_field("id"),
            text_field("name"),
            text_field("full_name"),
            text_field("kind"),
            text_field("summary"),
            text_field("description"),
            text_field("examples"),
            text_field("parameters"),
            text_field("returns"),
            text_field("type"),
            text_field("deprecated"),
            text_field("see"),
            text_field("since"),
            text_field("source_file"),
            number_field("source_line"),
            text_field("category"),
            text_field("url"),
        ]
    }

    #[inline]
    fn columns(records: &[&Self]) -> Vec<ArrayRef> {
        vec![
            texts(records, |r| &r.id),
            texts(records, |r| &r.name),
            texts(records, |r| &r.full_name),
            texts(records, |r| r.kind.as_str()),
            texts(records, |r| &r.summary),
            texts(records, |r| &r.description),
            texts(records, |r| &r.examples),
            texts(records, |r| &r.parameters),
            texts(records, |r| &r.returns),
            texts(records, |r| &r.type_name),
            texts(records, |r| &r.deprecated),
            texts(records, |r| &r.see),
            texts(records, |r| &r.since),
            texts(records, |r| &r.source_file),
            numbers(records, |r| r.source_line),
            texts(records, |r| &r.category),
            texts(records, |r| &r.url),
        ]
    }

    #[inline]
    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        let ids = string_column(batch, "id")?;
        let names = string_column(batch, "name")?;
        let full_names = string_column(batch, "full_name")?;
        let kinds = string_column(batch, "kind")?;
        let summaries = string_column(batch, "summary")?;
        let descriptions = string_column(batch, "description")?;
        let examples = string_column(batch, "examples")?;
        let parameters = string_column(batch, "parameters")?;
        let returns = string_column(batch, "returns")?;
        let types = string_column(batch, "type")?;
        let deprecated = string_column(batch, "deprecated")?;
        let see = string_column(batch, "see")?;
        let since = string_column(batch, "since")?;
        let source_files = string_column(batch, "source_file")?;
        let source_lines = number_column(batch, "source_line")?;
        let categories = string_column(batch, "category")?;
        let urls = string_column(batch, "url")?;

        Ok((0..batch.num_rows())
            .map(|row| Self {
                id: ids.value(row).to_string(),
                name: names.value(row).to_string(),
                full_name: full_names.value(row).to_string(),
                kind: ApiKind::parse(kinds.value(row)),
                summary: summaries.value(row).to_string(),
                description: descriptions.value(row).to_string(),
                examples: examples.value(row).to_string(),
                parameters: parameters.value(row).to_string(),
                returns: returns.value(row).to_string(),
                type_name: types.value(row).to_string(),
                deprecated: deprecated.value(row).to_string(),
                see: see.value(row).to_string(),
                since: since.value(row).to_string(),
                source_file: source_files.value(row).to_string(),
                source_line: source_lines.value(row),
                category: categories.value(row).to_string(),
                url: urls.value(row).to_string(),
            })
            .collect())
    }
}

impl TableRecord for SourceChunkRecord {
    #[inline]
    fn fields() -> Vec<Field> {
        vec![
            text_field("id"),
            text_field("file_path"),
            text_field("package"),
            text_field("content"),
            number_field("start_line"),
            number_field("end_line"),
            text_field("language"),
            text_field("imports"),
            text_field("exports"),
            text_field("url"),
        ]
    }

    #[inline]
    fn columns(records: &[&Self]) -> Vec<ArrayRef> {
        vec![
            texts(records, |r| &r.id),
            texts(records, |r| &r.file_path),
            texts(records, |r| &r.package),
            texts(records, |r| &r.content),
            numbers(records, |r| r.start_line),
            numbers(records, |r| r.end_line),
            texts(records, |r| &r.language),
            texts(records, |r| &r.imports),
            texts(records, |r| &r.exports),
            texts(records, |r| &r.url),
        ]
    }

    #[inline]
    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        let ids = string_column(batch, "id")?;
        let file_paths = string_column(batch, "file_path")?;
        let packages = string_column(batch, "package")?;
        let contents = string_column(batch, "content")?;
        let start_lines = number_column(batch, "start_line")?;
        let end_lines = number_column(batch, "end_line")?;
        let languages = string_column(batch, "language")?;
        let imports = string_column(batch, "imports")?;
        let exports = string_column(batch, "exports")?;
        let urls = string_column(batch, "url")?;

        Ok((0..batch.num_rows())
            .map(|row| Self {
                id: ids.value(row).to_string(),
                file_path: file_paths.value(row).to_string(),
                package: packages.value(row).to_string(),
                content: contents.value(row).to_string(),
                start_line: start_lines.value(row),
                end_line: end_lines.value(row),
                language: languages.value(row).to_string(),
                imports: imports.value(row).to_string(),
                exports: exports.value(row).to_string(),
                url: urls.value(row).to_string(),
            })
            .collect())
    }
}
