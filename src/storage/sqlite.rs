//! `SQLite` storage implementation.
//!
//! One database file per collection, holding documents, their vectors and
//! the embedding model they were produced with.

// SQLite stores all integers as i64. These casts are intentional and safe
// because we only store non-negative values that fit in usize.
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]

use crate::core::Document;
use crate::core::document::current_timestamp;
use crate::error::{Result, StorageError};
use crate::storage::schema::{
    CHECK_SCHEMA_SQL, CURRENT_SCHEMA_VERSION, GET_VERSION_SQL, RESET_SQL, SCHEMA_SQL,
    SET_VERSION_SQL,
};
use crate::storage::traits::{Storage, StorageStats};
use crate::storage::{METADATA_DIMENSIONS, METADATA_EMBEDDING_MODEL};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::{Path, PathBuf};

const DOCUMENT_COLUMNS: &str = "id, content, source, content_hash, created_at";

/// SQLite-backed persisted collection.
///
/// # Examples
///
/// ```no_run
/// use ragpipe::storage::{SqliteStorage, Storage};
///
/// let mut storage = SqliteStorage::open("chroma_db/collection.sqlite3").unwrap();
/// storage.init().unwrap();
/// ```
pub struct SqliteStorage {
    conn: Connection,
    /// Path to the database file (None for in-memory).
    path: Option<PathBuf>,
}

impl std::fmt::Debug for SqliteStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStorage")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl SqliteStorage {
    /// Opens or creates a database at the given path.
    ///
    /// Creates the parent directory if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or database cannot be created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            crate::io::ensure_dir(parent)?;
        }

        let conn = Connection::open(&path).map_err(StorageError::from)?;
        conn.execute("PRAGMA foreign_keys = ON;", [])
            .map_err(StorageError::from)?;

        // journal_mode returns a row, so it goes through query_row
        let _: String = conn
            .query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))
            .map_err(StorageError::from)?;

        tracing::debug!(path = %path.display(), "opened collection");
        Ok(Self {
            conn,
            path: Some(path),
        })
    }

    /// Creates an in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(StorageError::from)?;
        conn.execute("PRAGMA foreign_keys = ON;", [])
            .map_err(StorageError::from)?;

        Ok(Self { conn, path: None })
    }

    /// Returns the database path (None for in-memory).
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn get_schema_version(&self) -> Result<Option<u32>> {
        let version: Option<String> = self
            .conn
            .query_row(GET_VERSION_SQL, [], |row| row.get(0))
            .optional()
            .map_err(StorageError::from)?;

        Ok(version.and_then(|v| v.parse().ok()))
    }

    fn set_schema_version(&self, version: u32) -> Result<()> {
        self.conn
            .execute(SET_VERSION_SQL, params![version.to_string()])
            .map_err(StorageError::from)?;
        Ok(())
    }

    fn row_to_document(row: &Row<'_>) -> rusqlite::Result<Document> {
        Ok(Document {
            id: Some(row.get(0)?),
            content: row.get(1)?,
            source: row.get(2)?,
            content_hash: row.get(3)?,
            created_at: row.get(4)?,
        })
    }

    // ==================== Embedding Operations ====================

    /// Stores vectors for documents in one transaction, replacing existing ones.
    ///
    /// # Errors
    ///
    /// Returns an error if any vector cannot be stored (for example when the
    /// document does not exist).
    pub fn store_embeddings_batch(
        &mut self,
        embeddings: &[(i64, Vec<f32>)],
        model_name: Option<&str>,
    ) -> Result<()> {
        let tx = self.conn.transaction().map_err(StorageError::from)?;
        insert_embeddings(&tx, embeddings, model_name)?;
        tx.commit().map_err(StorageError::from)?;
        Ok(())
    }

    /// Writes documents, their vectors and the model metadata atomically.
    ///
    /// Returns the document ids in input order. Nothing is kept if any
    /// write fails.
    ///
    /// # Errors
    ///
    /// Returns an error if any write or the commit fails.
    pub fn write_collection(
        &mut self,
        documents: &[Document],
        embeddings: &[Vec<f32>],
        model_name: &str,
    ) -> Result<Vec<i64>> {
        let tx = self
            .conn
            .transaction()
            .map_err(|e| StorageError::Transaction(e.to_string()))?;

        let ids = insert_documents(&tx, documents)?;
        let batch: Vec<(i64, Vec<f32>)> =
            ids.iter().copied().zip(embeddings.iter().cloned()).collect();
        insert_embeddings(&tx, &batch, Some(model_name))?;

        upsert_metadata(&tx, METADATA_EMBEDDING_MODEL, model_name)?;
        if let Some(first) = embeddings.first() {
            upsert_metadata(&tx, METADATA_DIMENSIONS, &first.len().to_string())?;
        }

        tx.commit()
            .map_err(|e| StorageError::Transaction(e.to_string()))?;
        Ok(ids)
    }

    /// Retrieves the vector for a document.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_embedding(&self, document_id: i64) -> Result<Option<Vec<f32>>> {
        let bytes: Option<Vec<u8>> = self
            .conn
            .query_row(
                "SELECT embedding FROM embeddings WHERE document_id = ?",
                params![document_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(StorageError::from)?;

        Ok(bytes.map(|b| decode_vector(&b)))
    }

    /// Returns every `(document_id, vector)` pair in document order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_all_embeddings(&self) -> Result<Vec<(i64, Vec<f32>)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT document_id, embedding FROM embeddings ORDER BY document_id")
            .map_err(StorageError::from)?;

        let rows = stmt
            .query_map([], |row| {
                let document_id: i64 = row.get(0)?;
                let bytes: Vec<u8> = row.get(1)?;
                Ok((document_id, decode_vector(&bytes)))
            })
            .map_err(StorageError::from)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StorageError::from)?;

        Ok(rows)
    }

    /// Counts stored vectors.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn embedding_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM embeddings", [], |row| row.get(0))
            .map_err(StorageError::from)?;
        Ok(count as usize)
    }

    // ==================== Metadata Operations ====================

    /// Sets a collection metadata value.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn set_metadata(&mut self, key: &str, value: &str) -> Result<()> {
        upsert_metadata(&self.conn, key, value)
    }

    /// Reads a collection metadata value.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM metadata WHERE key = ?",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(StorageError::from)?;
        Ok(value)
    }
}

impl Storage for SqliteStorage {
    fn init(&mut self) -> Result<()> {
        if self.is_initialized()? {
            match self.get_schema_version()? {
                Some(version) if version > CURRENT_SCHEMA_VERSION => {
                    return Err(StorageError::Migration(format!(
                        "collection schema v{version} is newer than supported v{CURRENT_SCHEMA_VERSION}"
                    ))
                    .into());
                }
                Some(_) => return Ok(()),
                None => {}
            }
        }

        self.conn
            .execute_batch(SCHEMA_SQL)
            .map_err(StorageError::from)?;
        self.set_schema_version(CURRENT_SCHEMA_VERSION)?;
        tracing::debug!(version = CURRENT_SCHEMA_VERSION, "initialized schema");
        Ok(())
    }

    fn is_initialized(&self) -> Result<bool> {
        let count: i64 = self
            .conn
            .query_row(CHECK_SCHEMA_SQL, [], |row| row.get(0))
            .map_err(StorageError::from)?;
        Ok(count > 0)
    }

    fn reset(&mut self) -> Result<()> {
        self.conn
            .execute_batch(RESET_SQL)
            .map_err(StorageError::from)?;
        tracing::info!("collection reset");
        Ok(())
    }

    fn add_documents(&mut self, documents: &[Document]) -> Result<Vec<i64>> {
        let tx = self
            .conn
            .transaction()
            .map_err(|e| StorageError::Transaction(e.to_string()))?;
        let ids = insert_documents(&tx, documents)?;
        tx.commit()
            .map_err(|e| StorageError::Transaction(e.to_string()))?;
        Ok(ids)
    }

    fn get_document(&self, id: i64) -> Result<Option<Document>> {
        let doc = self
            .conn
            .query_row(
                &format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = ?"),
                params![id],
                Self::row_to_document,
            )
            .optional()
            .map_err(StorageError::from)?;
        Ok(doc)
    }

    fn list_documents(&self) -> Result<Vec<Document>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {DOCUMENT_COLUMNS} FROM documents ORDER BY id"
            ))
            .map_err(StorageError::from)?;

        let docs = stmt
            .query_map([], Self::row_to_document)
            .map_err(StorageError::from)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StorageError::from)?;
        Ok(docs)
    }

    fn delete_document(&mut self, id: i64) -> Result<()> {
        let deleted = self
            .conn
            .execute("DELETE FROM documents WHERE id = ?", params![id])
            .map_err(StorageError::from)?;
        if deleted == 0 {
            return Err(StorageError::DocumentNotFound { id }.into());
        }
        Ok(())
    }

    fn document_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))
            .map_err(StorageError::from)?;
        Ok(count as usize)
    }

    fn stats(&self) -> Result<StorageStats> {
        let db_size = self
            .path
            .as_ref()
            .and_then(|p| std::fs::metadata(p).ok().map(|m| m.len()));

        Ok(StorageStats {
            document_count: self.document_count()?,
            embedding_count: self.embedding_count()?,
            embedding_model: self.get_metadata(METADATA_EMBEDDING_MODEL)?,
            dimensions: self
                .get_metadata(METADATA_DIMENSIONS)?
                .and_then(|d| d.parse().ok()),
            schema_version: self.get_schema_version()?.unwrap_or(0),
            db_size,
        })
    }
}

/// Serializes a vector as little-endian f32 bytes.
/// Inserts documents, skipping known content, and returns their ids in input order.
fn insert_documents(conn: &Connection, documents: &[Document]) -> Result<Vec<i64>> {
    let mut insert = conn
        .prepare(
            r"
            INSERT OR IGNORE INTO documents (content, source, content_hash, size, created_at)
            VALUES (?, ?, ?, ?, ?)
        ",
        )
        .map_err(StorageError::from)?;
    let mut lookup = conn
        .prepare("SELECT id FROM documents WHERE content_hash = ?")
        .map_err(StorageError::from)?;

    let mut ids = Vec::with_capacity(documents.len());
    for doc in documents {
        insert
            .execute(params![
                doc.content,
                doc.source,
                doc.content_hash,
                doc.size() as i64,
                doc.created_at,
            ])
            .map_err(StorageError::from)?;
        let id: i64 = lookup
            .query_row(params![doc.content_hash], |row| row.get(0))
            .map_err(StorageError::from)?;
        ids.push(id);
    }
    Ok(ids)
}

fn insert_embeddings(
    conn: &Connection,
    embeddings: &[(i64, Vec<f32>)],
    model_name: Option<&str>,
) -> Result<()> {
    let now = current_timestamp();
    let mut stmt = conn
        .prepare(
            r"
            INSERT OR REPLACE INTO embeddings (document_id, embedding, dimensions, model_name, created_at)
            VALUES (?, ?, ?, ?, ?)
        ",
        )
        .map_err(StorageError::from)?;

    for (document_id, embedding) in embeddings {
        stmt.execute(params![
            document_id,
            encode_vector(embedding),
            embedding.len() as i64,
            model_name,
            now
        ])
        .map_err(StorageError::from)?;
    }
    Ok(())
}

fn upsert_metadata(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        r"
        INSERT INTO metadata (key, value, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?3)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
    ",
        params![key, value, current_timestamp()],
    )
    .map_err(StorageError::from)?;
    Ok(())
}

fn encode_vector(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn decode_vector(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> SqliteStorage {
        let mut storage = SqliteStorage::in_memory().unwrap();
        storage.init().unwrap();
        storage
    }

    #[test]
    fn test_init() {
        let mut storage = SqliteStorage::in_memory().unwrap();
        assert!(!storage.is_initialized().unwrap());
        storage.init().unwrap();
        assert!(storage.is_initialized().unwrap());
    }

    #[test]
    fn test_init_idempotent() {
        let mut storage = setup();
        storage.add_documents(&[Document::new("kept")]).unwrap();
        storage.init().unwrap();
        assert_eq!(storage.document_count().unwrap(), 1);
    }

    #[test]
    fn test_init_refuses_newer_schema() {
        let mut storage = setup();
        storage.set_schema_version(CURRENT_SCHEMA_VERSION + 1).unwrap();
        let err = storage.init().unwrap_err();
        assert!(err.to_string().contains("newer than supported"));
    }

    #[test]
    fn test_document_crud() {
        let mut storage = setup();

        let ids = storage
            .add_documents(&[
                Document::with_source("Bonjour", "a.txt"),
                Document::new("Monde"),
            ])
            .unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids[0] < ids[1]);

        let loaded = storage.get_document(ids[0]).unwrap().unwrap();
        assert_eq!(loaded.content, "Bonjour");
        assert_eq!(loaded.source.as_deref(), Some("a.txt"));
        assert_eq!(loaded.id, Some(ids[0]));

        let all = storage.list_documents().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].content, "Monde");

        storage.delete_document(ids[0]).unwrap();
        assert!(storage.get_document(ids[0]).unwrap().is_none());
        assert_eq!(storage.document_count().unwrap(), 1);
    }

    #[test]
    fn test_delete_missing_document() {
        let mut storage = setup();
        let err = storage.delete_document(42).unwrap_err();
        assert!(err.to_string().contains("document not found: 42"));
    }

    #[test]
    fn test_add_documents_deduplicates() {
        let mut storage = setup();
        let first = storage.add_documents(&[Document::new("same")]).unwrap();
        let again = storage
            .add_documents(&[Document::new("other"), Document::new("same")])
            .unwrap();

        assert_eq!(again[1], first[0]);
        assert_eq!(storage.document_count().unwrap(), 2);
    }

    #[test]
    fn test_embeddings_round_trip() {
        let mut storage = setup();
        let ids = storage
            .add_documents(&[Document::new("a"), Document::new("b")])
            .unwrap();

        storage
            .store_embeddings_batch(
                &[(ids[0], vec![0.25, -1.5, 3.0]), (ids[1], vec![1.0, 0.0, 0.0])],
                Some("test-model"),
            )
            .unwrap();

        assert_eq!(storage.embedding_count().unwrap(), 2);
        assert_eq!(
            storage.get_embedding(ids[0]).unwrap(),
            Some(vec![0.25, -1.5, 3.0])
        );

        let all = storage.get_all_embeddings().unwrap();
        assert_eq!(all[1].0, ids[1]);
    }

    #[test]
    fn test_embedding_requires_document() {
        let mut storage = setup();
        assert!(
            storage
                .store_embeddings_batch(&[(99, vec![1.0])], None)
                .is_err()
        );
    }

    #[test]
    fn test_cascade_delete() {
        let mut storage = setup();
        let ids = storage.add_documents(&[Document::new("a")]).unwrap();
        storage
            .store_embeddings_batch(&[(ids[0], vec![1.0, 2.0])], None)
            .unwrap();

        storage.delete_document(ids[0]).unwrap();
        assert!(storage.get_embedding(ids[0]).unwrap().is_none());
    }

    #[test]
    fn test_write_collection() {
        let mut storage = setup();
        let docs = vec![Document::new("un"), Document::new("deux")];
        let ids = storage
            .write_collection(&docs, &[vec![1.0, 0.0], vec![0.0, 1.0]], "m")
            .unwrap();

        assert_eq!(ids.len(), 2);
        assert_eq!(storage.get_embedding(ids[1]).unwrap(), Some(vec![0.0, 1.0]));
        assert_eq!(
            storage.get_metadata(METADATA_DIMENSIONS).unwrap().as_deref(),
            Some("2")
        );
    }

    #[test]
    fn test_write_collection_rolls_back_on_failure() {
        let mut storage = setup();
        storage
            .conn
            .execute_batch(
                "CREATE TRIGGER reject_vectors BEFORE INSERT ON embeddings
                 BEGIN SELECT RAISE(ABORT, 'disk full'); END;",
            )
            .unwrap();

        let docs = vec![Document::new("un"), Document::new("deux")];
        let err = storage.write_collection(&docs, &[vec![1.0], vec![0.5]], "m");
        assert!(err.is_err());

        assert_eq!(storage.document_count().unwrap(), 0);
        assert_eq!(storage.embedding_count().unwrap(), 0);
        assert!(storage.get_metadata(METADATA_EMBEDDING_MODEL).unwrap().is_none());
    }

    #[test]
    fn test_metadata_upsert() {
        let mut storage = setup();
        assert!(storage.get_metadata("k").unwrap().is_none());
        storage.set_metadata("k", "v1").unwrap();
        storage.set_metadata("k", "v2").unwrap();
        assert_eq!(storage.get_metadata("k").unwrap().as_deref(), Some("v2"));
    }

    #[test]
    fn test_reset() {
        let mut storage = setup();
        let ids = storage.add_documents(&[Document::new("a")]).unwrap();
        storage
            .store_embeddings_batch(&[(ids[0], vec![1.0])], None)
            .unwrap();
        storage.set_metadata(METADATA_EMBEDDING_MODEL, "m").unwrap();

        storage.reset().unwrap();
        assert!(storage.is_initialized().unwrap());
        assert_eq!(storage.document_count().unwrap(), 0);
        assert_eq!(storage.embedding_count().unwrap(), 0);
        assert!(storage.get_metadata(METADATA_EMBEDDING_MODEL).unwrap().is_none());
    }

    #[test]
    fn test_stats() {
        let mut storage = setup();
        let ids = storage
            .add_documents(&[Document::new("a"), Document::new("b")])
            .unwrap();
        storage
            .store_embeddings_batch(&[(ids[0], vec![1.0, 0.0])], Some("m"))
            .unwrap();
        storage.set_metadata(METADATA_EMBEDDING_MODEL, "m").unwrap();
        storage.set_metadata(METADATA_DIMENSIONS, "2").unwrap();

        let stats = storage.stats().unwrap();
        assert_eq!(stats.document_count, 2);
        assert_eq!(stats.embedding_count, 1);
        assert_eq!(stats.embedding_model.as_deref(), Some("m"));
        assert_eq!(stats.dimensions, Some(2));
        assert_eq!(stats.schema_version, CURRENT_SCHEMA_VERSION);
        assert!(stats.db_size.is_none());
    }

    #[test]
    fn test_open_creates_directory() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("chroma_db").join("collection.sqlite3");

        let mut storage = SqliteStorage::open(&path).unwrap();
        storage.init().unwrap();
        assert!(path.exists());
        assert_eq!(storage.path(), Some(path.as_path()));
        assert!(storage.stats().unwrap().db_size.is_some());
    }
}
