//! # ragpipe
//!
//! Retrieval Augmented Generation pipeline.
//!
//! ragpipe embeds a small corpus, indexes the vectors, retrieves the
//! documents closest to a question and asks a language model to answer
//! from them. Vectors and documents persist to a `SQLite` collection.
//!
//! ## Features
//!
//! - **Embeddings**: fastembed sentence-transformer models, or a
//!   deterministic hash fallback
//! - **Vector search**: exact cosine search, or usearch HNSW
//! - **Generation**: any OpenAI-compatible chat-completions server
//! - **`SQLite` Storage**: persisted collection with model metadata
//!
//! ## Example
//!
//! ```
//! use ragpipe::{FallbackEmbedder, VectorStore, DEFAULT_DIMENSIONS};
//! use ragpipe::core::sample_documents;
//!
//! let embedder = FallbackEmbedder::new(DEFAULT_DIMENSIONS);
//! let store = VectorStore::from_documents(sample_documents(), &embedder).unwrap();
//! let results = store.similarity_search("Qu'est-ce que le RAG?", 2).unwrap();
//! assert_eq!(results.len(), 2);
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
// Note: unsafe is needed for memory-mapped I/O (memmap2)
#![warn(unsafe_code)]

pub mod chain;
pub mod cli;
pub mod config;
pub mod core;
pub mod diagnostics;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod io;
pub mod prompt;
pub mod search;
pub mod storage;

// Re-export commonly used types at crate root
pub use error::{Error, Result};

// Re-export core domain types
pub use core::{Document, DocumentTable, sample_documents};

// Re-export storage types
pub use storage::{DEFAULT_PERSIST_DIR, SqliteStorage, Storage, persist_collection};

// Re-export CLI types
pub use cli::{Cli, Commands, OutputFormat};

// Re-export embedding types
#[cfg(feature = "fastembed-embeddings")]
pub use embedding::FastEmbedEmbedder;
pub use embedding::{
    DEFAULT_DIMENSIONS, DEFAULT_EMBEDDING_MODEL, Embedder, FallbackEmbedder, cosine_similarity,
    create_embedder,
};

// Re-export search types
pub use search::{DEFAULT_TOP_K, Retriever, SearchConfig, SearchResult, VectorStore};

// Re-export pipeline types
pub use chain::{PreparedPrompt, RagAnswer, RagChain};
pub use config::PipelineConfig;
pub use diagnostics::EnvironmentReport;
pub use generation::{GenerationConfig, Generator, OpenAiGenerator};
pub use prompt::{PromptTemplate, format_docs};
