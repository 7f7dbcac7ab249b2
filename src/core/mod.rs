//! Core domain models for ragpipe.
//!
//! Documents, their tabular view and the built-in sample corpus. These are
//! pure domain models with no I/O dependencies.

pub mod corpus;
pub mod document;

pub use corpus::{BUILTIN_SOURCE, sample_documents};
pub use document::{
    DEFAULT_HEAD_ROWS, Document, DocumentRow, DocumentTable, assign_positional_ids,
};
