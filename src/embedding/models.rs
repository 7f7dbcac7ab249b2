//! Supported embedding models.
//!
//! Maps Hugging Face style identifiers to the models fastembed ships.

use crate::error::{EmbeddingError, Result};

/// Default sentence-embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// A supported embedding model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelSpec {
    /// Hugging Face identifier.
    pub id: &'static str,
    /// Output vector size.
    pub dimensions: usize,
}

/// All models accepted by [`resolve_model`].
pub const SUPPORTED_MODELS: &[ModelSpec] = &[
    ModelSpec {
        id: DEFAULT_EMBEDDING_MODEL,
        dimensions: 384,
    },
    ModelSpec {
        id: "sentence-transformers/all-MiniLM-L12-v2",
        dimensions: 384,
    },
    ModelSpec {
        id: "sentence-transformers/paraphrase-multilingual-MiniLM-L12-v2",
        dimensions: 384,
    },
    ModelSpec {
        id: "BAAI/bge-small-en-v1.5",
        dimensions: 384,
    },
    ModelSpec {
        id: "intfloat/multilingual-e5-small",
        dimensions: 384,
    },
];

impl ModelSpec {
    /// Returns the identifier without the organisation prefix.
    #[must_use]
    pub fn short_name(&self) -> &'static str {
        self.id.rsplit('/').next().unwrap_or(self.id)
    }

    /// Returns the fastembed model for this spec.
    #[cfg(feature = "fastembed-embeddings")]
    #[must_use]
    pub fn fastembed_model(&self) -> fastembed::EmbeddingModel {
        use fastembed::EmbeddingModel;
        match self.short_name() {
            "all-MiniLM-L12-v2" => EmbeddingModel::AllMiniLML12V2,
            "paraphrase-multilingual-MiniLM-L12-v2" => EmbeddingModel::ParaphraseMLMiniLML12V2,
            "bge-small-en-v1.5" => EmbeddingModel::BGESmallENV15,
            "multilingual-e5-small" => EmbeddingModel::MultilingualE5Small,
            _ => EmbeddingModel::AllMiniLML6V2,
        }
    }
}

/// Resolves a model identifier.
///
/// Matching is case-insensitive and accepts the bare model name
/// (`all-MiniLM-L6-v2`) as well as the full identifier.
///
/// # Errors
///
/// Returns `EmbeddingError::UnknownModel` for unsupported identifiers.
pub fn resolve_model(id: &str) -> Result<ModelSpec> {
    let wanted = id.trim();
    SUPPORTED_MODELS
        .iter()
        .find(|spec| {
            spec.id.eq_ignore_ascii_case(wanted) || spec.short_name().eq_ignore_ascii_case(wanted)
        })
        .copied()
        .ok_or_else(|| {
            EmbeddingError::UnknownModel {
                name: id.to_string(),
            }
            .into()
        })
}
