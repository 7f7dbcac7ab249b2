//! Storage trait definition.
//!
//! Defines the interface for persisted collections, so the pipeline does
//! not depend on a particular database.

use crate::core::Document;
use crate::error::Result;
use serde::Serialize;

/// Trait for persisted document collections.
///
/// Implementations own the documents of one collection. Vectors and
/// collection metadata are backend specific and live on the concrete type.
pub trait Storage: Send {
    /// Initializes storage (creates the schema).
    ///
    /// Idempotent. Refuses a collection written by a newer schema version.
    ///
    /// # Errors
    ///
    /// Returns an error if schema creation fails or the version is unsupported.
    fn init(&mut self) -> Result<()>;

    /// Checks if storage is initialized.
    ///
    /// # Errors
    ///
    /// Returns an error if the check cannot be performed.
    fn is_initialized(&self) -> Result<bool>;

    /// Deletes all documents, vectors and metadata but keeps the schema.
    ///
    /// # Errors
    ///
    /// Returns an error if deletion fails.
    fn reset(&mut self) -> Result<()>;

    /// Adds documents, skipping any whose content is already stored.
    ///
    /// Returns one id per input document, in input order. A duplicate gets
    /// the id of the stored copy.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    fn add_documents(&mut self, documents: &[Document]) -> Result<Vec<i64>>;

    /// Retrieves a document by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn get_document(&self, id: i64) -> Result<Option<Document>>;

    /// Lists all documents in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn list_documents(&self) -> Result<Vec<Document>>;

    /// Deletes a document and its vector.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::DocumentNotFound` if no document has this id.
    fn delete_document(&mut self, id: i64) -> Result<()>;

    /// Counts stored documents.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn document_count(&self) -> Result<usize>;

    /// Returns collection statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if statistics cannot be gathered.
    fn stats(&self) -> Result<StorageStats>;
}

/// Collection statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StorageStats {
    /// Number of documents stored.
    pub document_count: usize,
    /// Number of stored vectors.
    pub embedding_count: usize,
    /// Embedding model recorded for the collection.
    pub embedding_model: Option<String>,
    /// Vector dimensions recorded for the collection.
    pub dimensions: Option<usize>,
    /// Schema version.
    pub schema_version: u32,
    /// Database file size in bytes (if applicable).
    pub db_size: Option<u64>,
}
