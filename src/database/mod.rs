// Vector storage for the docs, API and source tables

pub mod lancedb;

pub use self::lancedb::{EmbeddingRecord, TableRecord, VectorStore, equality_predicate};
