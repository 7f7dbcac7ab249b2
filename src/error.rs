//! Error types for ragpipe operations.
//!
//! This module provides the error hierarchy using `thiserror` for every
//! pipeline stage: storage, embedding, search, prompting, generation, I/O
//! and CLI commands.

use thiserror::Error;

/// Result type alias for ragpipe operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for pipeline operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Storage-related errors (persisted collection).
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Embedding model errors.
    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    /// Vector index and retrieval errors.
    #[error("search error: {0}")]
    Search(#[from] SearchError),

    /// Prompt template errors.
    #[error("prompt error: {0}")]
    Prompt(#[from] PromptError),

    /// Language model generation errors.
    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),

    /// I/O errors (file operations).
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// CLI command errors.
    #[error("command error: {0}")]
    Command(#[from] CommandError),

    /// Invalid state errors.
    #[error("invalid state: {message}")]
    InvalidState {
        /// Description of the invalid state.
        message: String,
    },

    /// Configuration errors.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },
}

impl Error {
    /// Shorthand for building a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// Storage-specific errors for the persisted collection.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Database connection or query error.
    #[error("database error: {0}")]
    Database(String),

    /// Collection not initialized (nothing persisted yet).
    #[error("collection not initialized. Run: ragpipe index")]
    NotInitialized,

    /// Document not found by ID.
    #[error("document not found: {id}")]
    DocumentNotFound {
        /// Document ID that was not found.
        id: i64,
    },

    /// Schema version mismatch.
    #[error("migration error: {0}")]
    Migration(String),

    /// Transaction error.
    #[error("transaction error: {0}")]
    Transaction(String),

    /// A collection metadata value cannot be interpreted.
    #[error("invalid collection metadata {key}: {value:?}")]
    InvalidMetadata {
        /// Metadata key.
        key: String,
        /// Stored value.
        value: String,
    },
}

/// Embedding model errors.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// The requested model identifier is not supported.
    #[error("unknown embedding model: {name}")]
    UnknownModel {
        /// Requested model identifier.
        name: String,
    },

    /// The model could not be downloaded or loaded.
    #[error("failed to load embedding model {model}: {reason}")]
    LoadFailed {
        /// Model identifier.
        model: String,
        /// Reason for failure.
        reason: String,
    },

    /// Embedding inference failed.
    #[error("embedding failed: {0}")]
    InferenceFailed(String),

    /// Empty text cannot be embedded.
    #[error("cannot embed empty text")]
    EmptyInput,

    /// A collection was built with a different model than the one in use.
    #[error("model mismatch: collection uses {stored}, pipeline uses {current}")]
    ModelMismatch {
        /// Model recorded in the collection.
        stored: String,
        /// Model configured for this run.
        current: String,
    },
}

/// Vector index and retrieval errors.
#[derive(Error, Debug)]
pub enum SearchError {
    /// Vector length does not match index dimensions.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Dimensions of the index.
        expected: usize,
        /// Dimensions of the offending vector.
        got: usize,
    },

    /// Underlying index failure.
    #[error("index error: {message}")]
    IndexError {
        /// Description of the failure.
        message: String,
    },

    /// Query text is empty.
    #[error("query must not be empty")]
    EmptyQuery,

    /// Documents and embeddings do not line up.
    #[error("expected {documents} embeddings, got {embeddings}")]
    EmbeddingCountMismatch {
        /// Number of documents.
        documents: usize,
        /// Number of embeddings.
        embeddings: usize,
    },

    /// A cargo feature required for this backend is not enabled.
    #[error("feature not enabled: {feature}")]
    FeatureNotEnabled {
        /// Feature name.
        feature: String,
    },
}

/// Prompt template errors.
#[derive(Error, Debug)]
pub enum PromptError {
    /// A template variable was not supplied at format time.
    #[error("missing template variable: {name}")]
    MissingVariable {
        /// Variable name.
        name: String,
    },

    /// The template is missing a placeholder the pipeline needs.
    #[error("template must contain {{{name}}}")]
    MissingPlaceholder {
        /// Placeholder name.
        name: String,
    },

    /// Unbalanced or malformed brace in the template.
    #[error("malformed template at byte {offset}")]
    Malformed {
        /// Byte offset of the offending brace.
        offset: usize,
    },

    /// Regex compilation error.
    #[error("regex error: {0}")]
    Regex(String),
}

/// Language model generation errors.
#[derive(Error, Debug)]
pub enum GenerationError {
    /// Request to the model server failed.
    #[error("request failed: {0}")]
    Request(String),

    /// The server answered but returned no text.
    #[error("model returned an empty response")]
    EmptyResponse,

    /// Invalid generation parameter.
    #[error("invalid generation parameter: {0}")]
    InvalidParameter(String),

    /// Async runtime could not be created.
    #[error("runtime error: {0}")]
    Runtime(String),
}

/// I/O-specific errors for file operations.
#[derive(Error, Debug)]
pub enum IoError {
    /// File not found.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path to the file that was not found.
        path: String,
    },

    /// Failed to read file.
    #[error("failed to read file: {path}: {reason}")]
    ReadFailed {
        /// Path to the file.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Memory mapping error.
    #[error("memory mapping failed: {path}: {reason}")]
    MmapFailed {
        /// Path to the file.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Directory creation error.
    #[error("failed to create directory: {path}: {reason}")]
    DirectoryFailed {
        /// Path to the directory.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Generic I/O error wrapper.
    #[error("I/O error: {0}")]
    Generic(String),
}

/// CLI command-specific errors.
#[derive(Error, Debug)]
pub enum CommandError {
    /// Invalid argument provided.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Command execution failed.
    #[error("command execution failed: {0}")]
    ExecutionFailed(String),
}

// Implement From traits for library errors

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(IoError::Generic(err.to_string()))
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage(StorageError::Database(err.to_string()))
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<regex::Error> for PromptError {
    fn from(err: regex::Error) -> Self {
        Self::Regex(err.to_string())
    }
}

impl From<async_openai::error::OpenAIError> for GenerationError {
    fn from(err: async_openai::error::OpenAIError) -> Self {
        match err {
            async_openai::error::OpenAIError::InvalidArgument(msg) => Self::InvalidParameter(msg),
            other => Self::Request(other.to_string()),
        }
    }
}

impl From<async_openai::error::OpenAIError> for Error {
    fn from(err: async_openai::error::OpenAIError) -> Self {
        Self::Generation(err.into())
    }
}
