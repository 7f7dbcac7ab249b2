//! `FastEmbed`-based semantic embedder.
//!
//! Provides real semantic embeddings for the sentence-transformer models
//! fastembed-rs ships. Only available when the `fastembed-embeddings`
//! feature is enabled.

use crate::Result;
use crate::embedding::models::{ModelSpec, resolve_model};
use crate::embedding::Embedder;
use crate::error::EmbeddingError;
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Mutex, OnceLock};

/// `FastEmbed` embedder.
///
/// The model is lazily loaded on first embed call, so constructing an
/// embedder never touches the network.
///
/// # Examples
///
/// ```ignore
/// use ragpipe::embedding::{Embedder, FastEmbedEmbedder};
///
/// let embedder = FastEmbedEmbedder::new("sentence-transformers/all-MiniLM-L6-v2")?;
/// let embedding = embedder.embed("Qu'est-ce que le RAG?")?;
/// assert_eq!(embedding.len(), 384);
/// ```
pub struct FastEmbedEmbedder {
    spec: ModelSpec,
    model: OnceLock<Mutex<fastembed::TextEmbedding>>,
}

impl std::fmt::Debug for FastEmbedEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedEmbedder")
            .field("model", &self.spec.id)
            .field("loaded", &self.model.get().is_some())
            .finish()
    }
}

impl FastEmbedEmbedder {
    /// Creates a new `FastEmbed` embedder for a model identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the identifier is not a supported model.
    pub fn new(model_id: &str) -> Result<Self> {
        Ok(Self {
            spec: resolve_model(model_id)?,
            model: OnceLock::new(),
        })
    }

    /// Returns whether the model weights have been loaded.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.model.get().is_some()
    }

    /// Gets or initializes the embedding model.
    fn get_model(&self) -> Result<&Mutex<fastembed::TextEmbedding>> {
        if let Some(model) = self.model.get() {
            return Ok(model);
        }

        tracing::info!(model = self.spec.id, "loading embedding model");
        let options = fastembed::InitOptions::new(self.spec.fastembed_model())
            .with_show_download_progress(false);

        let model =
            fastembed::TextEmbedding::try_new(options).map_err(|e| EmbeddingError::LoadFailed {
                model: self.spec.id.to_string(),
                reason: e.to_string(),
            })?;

        // Another thread may have won the race; either instance is fine
        let _ = self.model.set(Mutex::new(model));

        self.model.get().ok_or_else(|| {
            EmbeddingError::LoadFailed {
                model: self.spec.id.to_string(),
                reason: "model initialization race".to_string(),
            }
            .into()
        })
    }

    /// Runs the model over `texts`, converting ONNX runtime panics into errors.
    fn run(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let model = self.get_model()?;
        let mut model = model.lock().map_err(|e| {
            EmbeddingError::InferenceFailed(format!("failed to lock embedding model: {e}"))
        })?;

        let result = catch_unwind(AssertUnwindSafe(|| model.embed(texts, None)));

        result
            .map_err(|panic_info| {
                EmbeddingError::InferenceFailed(format!(
                    "ONNX runtime panic: {}",
                    panic_message(panic_info.as_ref())
                ))
            })?
            .map_err(|e| EmbeddingError::InferenceFailed(e.to_string()).into())
    }
}

fn panic_message(panic_info: &(dyn Any + Send)) -> String {
    panic_info
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic_info.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

impl Embedder for FastEmbedEmbedder {
    fn dimensions(&self) -> usize {
        self.spec.dimensions
    }

    fn model_name(&self) -> &str {
        self.spec.id
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.is_empty() {
            return Err(EmbeddingError::EmptyInput.into());
        }

        self.run(&[text])?.into_iter().next().ok_or_else(|| {
            EmbeddingError::InferenceFailed("no embedding returned from model".to_string()).into()
        })
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        if texts.iter().any(|t| t.is_empty()) {
            return Err(EmbeddingError::EmptyInput.into());
        }

        let embeddings = self.run(texts)?;
        tracing::debug!(count = embeddings.len(), "embedded batch");
        Ok(embeddings)
    }
}
