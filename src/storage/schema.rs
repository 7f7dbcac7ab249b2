//! Database schema definitions for the persisted collection.

/// Current schema version.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// SQL schema for initial database setup.
pub const SCHEMA_SQL: &str = r"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_info (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- Corpus documents
CREATE TABLE IF NOT EXISTS documents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    content TEXT NOT NULL,
    source TEXT,
    content_hash TEXT NOT NULL UNIQUE,
    size INTEGER NOT NULL,
    created_at INTEGER NOT NULL
);

-- Document vectors
CREATE TABLE IF NOT EXISTS embeddings (
    document_id INTEGER PRIMARY KEY,
    embedding BLOB NOT NULL,  -- little-endian f32 array
    dimensions INTEGER NOT NULL,
    model_name TEXT,
    created_at INTEGER NOT NULL,
    FOREIGN KEY (document_id) REFERENCES documents(id) ON DELETE CASCADE
);

-- Collection-level key/value metadata (embedding model, dimensions)
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
";

/// SQL to check if schema is initialized.
pub const CHECK_SCHEMA_SQL: &str = r"
SELECT COUNT(*) FROM sqlite_master
WHERE type='table' AND name='schema_info';
";

/// SQL to get schema version.
pub const GET_VERSION_SQL: &str = r"
SELECT value FROM schema_info WHERE key = 'version';
";

/// SQL to set schema version.
pub const SET_VERSION_SQL: &str = r"
INSERT OR REPLACE INTO schema_info (key, value) VALUES ('version', ?);
";

/// SQL to clear collection data.
pub const RESET_SQL: &str = r"
DELETE FROM embeddings;
DELETE FROM documents;
DELETE FROM metadata;
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_sql_tables() {
        for table in ["schema_info", "documents", "embeddings", "metadata"] {
            assert!(SCHEMA_SQL.contains(&format!("CREATE TABLE IF NOT EXISTS {table}")));
        }
    }

    #[test]
    fn test_reset_covers_data_tables() {
        assert!(RESET_SQL.contains("embeddings"));
        assert!(RESET_SQL.contains("documents"));
        assert!(!RESET_SQL.contains("schema_info"));
    }
}
