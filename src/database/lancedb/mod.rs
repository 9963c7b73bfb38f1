// LanceDB vector storage
// One table per index source, each holding records of a single TableRecord type

#[cfg(test)]
mod tests;

pub mod schema;
pub mod vector_store;

pub use schema::TableRecord;
pub use vector_store::VectorStore;

/// A record paired with its embedding, the unit written to a table
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingRecord<R> {
    pub record: R,
    pub vector: Vec<f32>,
}

impl<R> EmbeddingRecord<R> {
    #[inline]
    pub fn new(record: R, vector: Vec<f32>) -> Self {
        Self { record, vector }
    }
}

/// `column = 'value'` filter with single quotes escaped
#[inline]
pub fn equality_predicate(column: &str, value: &str) -> String {
    format!("{} = '{}'", column, value.replace('\'', "''"))
}
