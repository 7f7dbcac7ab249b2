//! I/O utilities for ragpipe.
//!
//! Provides file reading with memory mapping support, corpus file loading,
//! and Unicode helpers.

pub mod loader;
pub mod reader;
pub mod unicode;

pub use loader::{load_documents, split_documents};
pub use reader::{FileReader, ensure_dir, read_file};
