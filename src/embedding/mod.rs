//! Embedding generation for semantic retrieval.
//!
//! Provides embedding generation using fastembed (when available) or a
//! hash-based fallback for deterministic pseudo-embeddings.
//!
//! # Feature Flags
//!
//! - `fastembed-embeddings`: Enables `FastEmbed` sentence-transformer models (384 dimensions)
//! - Without the feature: Uses hash-based fallback (deterministic but not semantic)

mod fallback;
mod models;

#[cfg(feature = "fastembed-embeddings")]
mod fastembed_impl;

pub use fallback::{FALLBACK_MODEL_NAME, FallbackEmbedder};
pub use models::{DEFAULT_EMBEDDING_MODEL, ModelSpec, SUPPORTED_MODELS, resolve_model};

#[cfg(feature = "fastembed-embeddings")]
pub use fastembed_impl::FastEmbedEmbedder;

use crate::Result;

/// Default embedding dimensions for the all-MiniLM-L6-v2 model.
///
/// Every supported model produces vectors of this size.
pub const DEFAULT_DIMENSIONS: usize = 384;

/// Trait for embedding generators.
///
/// Implementations must be thread-safe (`Send + Sync`).
///
/// # Examples
///
/// ```
/// use ragpipe::embedding::{Embedder, FallbackEmbedder, DEFAULT_DIMENSIONS};
///
/// let embedder = FallbackEmbedder::new(DEFAULT_DIMENSIONS);
/// let embedding = embedder.embed("Bonjour").unwrap();
/// assert_eq!(embedding.len(), DEFAULT_DIMENSIONS);
/// ```
pub trait Embedder: Send + Sync {
    /// Returns the embedding dimensions.
    fn dimensions(&self) -> usize;

    /// Returns the model identifier recorded alongside stored vectors.
    fn model_name(&self) -> &str;

    /// Generates an embedding for the given text.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding generation fails.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generates embeddings for multiple texts.
    ///
    /// The default implementation calls `embed` for each text sequentially.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding generation fails for any text.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

/// Creates the embedder for a model identifier.
///
/// - With `fastembed-embeddings`: Returns `FastEmbedEmbedder`
/// - Without: Returns `FallbackEmbedder`
///
/// # Errors
///
/// Returns an error if the identifier is not a supported model.
#[cfg(feature = "fastembed-embeddings")]
pub fn create_embedder(model_id: &str) -> Result<Box<dyn Embedder>> {
    Ok(Box::new(FastEmbedEmbedder::new(model_id)?))
}

/// Creates the embedder for a model identifier.
///
/// - With `fastembed-embeddings`: Returns `FastEmbedEmbedder`
/// - Without: Returns `FallbackEmbedder`
///
/// # Errors
///
/// Returns an error if the identifier is not a supported model.
#[cfg(not(feature = "fastembed-embeddings"))]
pub fn create_embedder(model_id: &str) -> Result<Box<dyn Embedder>> {
    let spec = resolve_model(model_id)?;
    Ok(Box::new(FallbackEmbedder::new(spec.dimensions)))
}

/// Returns the name of the compiled-in embedding backend.
#[must_use]
pub const fn backend_name() -> &'static str {
    if cfg!(feature = "fastembed-embeddings") {
        "fastembed"
    } else {
        "hash-fallback"
    }
}

/// Computes cosine similarity between two embedding vectors.
///
/// Returns a value between -1.0 (opposite) and 1.0 (identical).
/// Returns 0.0 if vectors have different lengths or zero magnitude.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    dot / (mag_a * mag_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_cosine_similarity_identical() {
        let a = vec![1.0, 0.0, 0.0];
        let sim = cosine_similarity(&a, &a);
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_opposite() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_different_lengths() {
        let a = vec![1.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_zero_vector() {
        let a = vec![0.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_create_embedder_default_model() {
        let embedder = create_embedder(DEFAULT_EMBEDDING_MODEL).unwrap();
        assert_eq!(embedder.dimensions(), DEFAULT_DIMENSIONS);
    }

    #[test]
    fn test_create_embedder_unknown_model() {
        assert!(create_embedder("acme/not-a-model").is_err());
    }

    #[test]
    fn test_embed_batch_default_impl() {
        struct Constant;
        impl Embedder for Constant {
            fn dimensions(&self) -> usize {
                2
            }
            fn model_name(&self) -> &str {
                "constant"
            }
            fn embed(&self, _text: &str) -> Result<Vec<f32>> {
                Ok(vec![1.0, 0.0])
            }
        }

        let embeddings = Constant.embed_batch(&["a", "b", "c"]).unwrap();
        assert_eq!(embeddings.len(), 3);
        assert!(Constant.embed_batch(&[]).unwrap().is_empty());
    }

    proptest! {
        #[test]
        fn cosine_is_bounded(
            a in proptest::collection::vec(-100.0f32..100.0, 8),
            b in proptest::collection::vec(-100.0f32..100.0, 8),
        ) {
            let sim = cosine_similarity(&a, &b);
            prop_assert!((-1.0001..=1.0001).contains(&sim));
        }

        #[test]
        fn cosine_is_symmetric(
            a in proptest::collection::vec(-10.0f32..10.0, 4),
            b in proptest::collection::vec(-10.0f32..10.0, 4),
        ) {
            prop_assert!((cosine_similarity(&a, &b) - cosine_similarity(&b, &a)).abs() < 1e-5);
        }
    }
}
