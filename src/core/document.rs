//! Documents and their tabular view.
//!
//! A document is a plain-text passage that gets embedded, indexed and
//! retrieved as context. Documents are created once at startup and are
//! read-only afterwards.

use crate::io::unicode::{grapheme_count, truncate_graphemes};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt::Write;

/// Default number of rows shown by [`DocumentTable::head`].
pub const DEFAULT_HEAD_ROWS: usize = 5;

/// A text passage in the corpus.
///
/// # Examples
///
/// ```
/// use ragpipe::core::Document;
///
/// let doc = Document::new("Le RAG combine recherche et génération.");
/// assert!(doc.id.is_none());
/// assert_eq!(doc.content_hash.len(), 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Identifier (assigned by storage or by position in the corpus).
    pub id: Option<i64>,

    /// Document text.
    pub content: String,

    /// Where the text came from (file path, `builtin`, ...).
    pub source: Option<String>,

    /// Hash of the content, used for deduplication.
    pub content_hash: String,

    /// Unix timestamp when the document was created.
    pub created_at: i64,
}

impl Document {
    /// Creates a document from its text.
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        let content = content.into();
        let content_hash = hash_content(&content);
        Self {
            id: None,
            content,
            source: None,
            content_hash,
            created_at: current_timestamp(),
        }
    }

    /// Creates a document and records its source.
    #[must_use]
    pub fn with_source(content: impl Into<String>, source: impl Into<String>) -> Self {
        let mut doc = Self::new(content);
        doc.source = Some(source.into());
        doc
    }

    /// Sets the identifier.
    #[must_use]
    pub const fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    /// Returns the size of the content in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.content.len()
    }

    /// Checks if the document has no text.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }

    /// Returns at most `max_graphemes` of the content, with an ellipsis when cut.
    #[must_use]
    pub fn preview(&self, max_graphemes: usize) -> String {
        if grapheme_count(&self.content) <= max_graphemes {
            return self.content.clone();
        }
        if max_graphemes <= 3 {
            return truncate_graphemes(&self.content, max_graphemes).to_string();
        }
        format!(
            "{}...",
            truncate_graphemes(&self.content, max_graphemes - 3)
        )
    }
}

/// One row of the tabular view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentRow {
    /// Row identifier.
    pub id: i64,
    /// Document text.
    pub content: String,
}

/// Tabular (id, content) representation of a corpus.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DocumentTable {
    rows: Vec<DocumentRow>,
}

impl DocumentTable {
    /// Builds the table from documents.
    ///
    /// Documents without a storage id get their position as id.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub fn from_documents(documents: &[Document]) -> Self {
        let rows = documents
            .iter()
            .enumerate()
            .map(|(position, doc)| DocumentRow {
                id: doc.id.unwrap_or(position as i64),
                content: doc.content.clone(),
            })
            .collect();
        Self { rows }
    }

    /// Returns the first `n` rows.
    #[must_use]
    pub fn head(&self, n: usize) -> &[DocumentRow] {
        &self.rows[..n.min(self.rows.len())]
    }

    /// Returns all rows.
    #[must_use]
    pub fn rows(&self) -> &[DocumentRow] {
        &self.rows
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Checks if the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Assigns positional ids to documents that have none.
#[allow(clippy::cast_possible_wrap)]
pub fn assign_positional_ids(documents: &mut [Document]) {
    for (position, doc) in documents.iter_mut().enumerate() {
        if doc.id.is_none() {
            doc.id = Some(position as i64);
        }
    }
}

/// SHA-256 of the content as lowercase hex.
fn hash_content(content: &str) -> String {
    Sha256::digest(content.as_bytes())
        .iter()
        .fold(String::with_capacity(64), |mut hex, byte| {
            let _ = write!(hex, "{byte:02x}");
            hex
        })
}

/// Returns the current Unix timestamp in seconds.
#[allow(clippy::cast_possible_wrap)]
pub(crate) fn current_timestamp() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
