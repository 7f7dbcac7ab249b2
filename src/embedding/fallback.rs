//! Lexical hashing embedder.
//!
//! Used when no sentence-transformer backend is compiled in, and by tests
//! that must not download model weights. Vectors are stable across runs and
//! reflect shared words and spelling, not meaning.

use crate::Result;
use crate::embedding::Embedder;
use sha2::{Digest, Sha256};
use unicode_segmentation::UnicodeSegmentation;

/// Model name recorded for vectors produced by [`FallbackEmbedder`].
pub const FALLBACK_MODEL_NAME: &str = "hash-fallback";

const WORD_WEIGHT: f32 = 1.0;
const TRIGRAM_WEIGHT: f32 = 0.5;

/// Feature-hashing embedder.
///
/// Every lowercased word and every character trigram inside a word is hashed
/// into one slot of the output vector with a signed weight. The result is
/// scaled to unit length, so cosine similarity measures lexical overlap.
///
/// # Examples
///
/// ```
/// use ragpipe::embedding::{Embedder, FallbackEmbedder, DEFAULT_DIMENSIONS};
///
/// let embedder = FallbackEmbedder::new(DEFAULT_DIMENSIONS);
/// let a = embedder.embed("le deep learning").unwrap();
/// let b = embedder.embed("Le Deep Learning").unwrap();
/// assert_eq!(a, b);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FallbackEmbedder {
    dimensions: usize,
}

impl FallbackEmbedder {
    /// Creates an embedder producing vectors of `dimensions` components.
    #[must_use]
    pub const fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    /// Adds `weight` to the slot selected by `feature`, with a hash-derived sign.
    ///
    /// The slot comes from SHA-256 so persisted vectors stay comparable
    /// across builds.
    #[allow(clippy::cast_possible_truncation)]
    fn scatter(&self, vector: &mut [f32], feature: &str, weight: f32) {
        let digest = Sha256::digest(feature.as_bytes());
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        let bits = u64::from_le_bytes(head);

        let slot = (bits % self.dimensions as u64) as usize;
        let sign = if bits >> 63 == 0 { 1.0 } else { -1.0 };
        vector[slot] += sign * weight;
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        if self.dimensions == 0 {
            return vector;
        }

        let lowered = text.to_lowercase();
        for word in lowered.unicode_words() {
            self.scatter(&mut vector, word, WORD_WEIGHT);

            let chars: Vec<char> = word.chars().collect();
            for window in chars.windows(3) {
                let trigram: String = window.iter().collect();
                self.scatter(&mut vector, &trigram, TRIGRAM_WEIGHT);
            }
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }
}

impl Embedder for FallbackEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        FALLBACK_MODEL_NAME
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.vectorize(text))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        use rayon::prelude::*;

        Ok(texts.par_iter().map(|text| self.vectorize(text)).collect())
    }
}
