//! Persisted vector collection.
//!
//! A collection lives in a directory (default `chroma_db`) as a single
//! `SQLite` file holding documents, their vectors and the embedding model
//! that produced them.

pub mod schema;
pub mod sqlite;
pub mod traits;

pub use schema::CURRENT_SCHEMA_VERSION;
pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageStats};

use crate::core::Document;
use crate::error::{EmbeddingError, Result, SearchError};
use std::path::{Path, PathBuf};

/// Default persistence directory.
pub const DEFAULT_PERSIST_DIR: &str = "chroma_db";

/// Database file name inside the persistence directory.
pub const COLLECTION_FILE: &str = "collection.sqlite3";

/// Metadata key for the embedding model identifier.
pub const METADATA_EMBEDDING_MODEL: &str = "embedding_model";

/// Metadata key for the vector dimensions.
pub const METADATA_DIMENSIONS: &str = "dimensions";

/// Returns the database path for a persistence directory.
#[must_use]
pub fn collection_path(persist_dir: &Path) -> PathBuf {
    persist_dir.join(COLLECTION_FILE)
}

/// Opens (creating if needed) and initializes the collection in `persist_dir`.
///
/// # Errors
///
/// Returns an error if the directory or database cannot be created.
pub fn open_collection(persist_dir: &Path) -> Result<SqliteStorage> {
    let mut storage = SqliteStorage::open(collection_path(persist_dir))?;
    storage.init()?;
    Ok(storage)
}

/// Writes documents, their vectors and the model name to a collection.
///
/// Documents already present (same content) are not duplicated; their
/// vectors are replaced. Returns the storage ids in input order.
///
/// # Errors
///
/// Returns an error if documents and embeddings do not line up, if the
/// collection was built with another model, or if a write fails.
pub fn persist_collection(
    storage: &mut SqliteStorage,
    documents: &[Document],
    embeddings: &[Vec<f32>],
    model_name: &str,
) -> Result<Vec<i64>> {
    if documents.len() != embeddings.len() {
        return Err(SearchError::EmbeddingCountMismatch {
            documents: documents.len(),
            embeddings: embeddings.len(),
        }
        .into());
    }

    if storage.document_count()? > 0
        && let Some(stored) = storage.get_metadata(METADATA_EMBEDDING_MODEL)?
        && stored != model_name
    {
        return Err(EmbeddingError::ModelMismatch {
            stored,
            current: model_name.to_string(),
        }
        .into());
    }

    let ids = storage.write_collection(documents, embeddings, model_name)?;

    tracing::info!(
        documents = ids.len(),
        model = model_name,
        path = ?storage.path(),
        "persisted collection"
    );
    Ok(ids)
}
