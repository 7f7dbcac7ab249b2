//! Answer generation with a hosted language model.
//!
//! The model runs behind an OpenAI-compatible HTTP API; this module sends
//! the formatted prompt and cleans up the returned text.

mod config;
mod openai;

pub use config::{
    DEFAULT_API_BASE, DEFAULT_FREQUENCY_PENALTY, DEFAULT_MAX_TOKENS, DEFAULT_MODEL,
    DEFAULT_TEMPERATURE, DEFAULT_TIMEOUT_SECS, DEFAULT_TOP_P, GenerationConfig,
};
pub use openai::OpenAiGenerator;

use crate::error::{GenerationError, Result};
use async_trait::async_trait;
use std::future::Future;

/// Marker some models echo before their answer.
const ANSWER_MARKER: &str = "Réponse détaillée:";

/// Text generator.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use ragpipe::generation::{block_on, Generator};
///
/// struct Echo;
///
/// #[async_trait]
/// impl Generator for Echo {
///     fn model_name(&self) -> &str {
///         "echo"
///     }
///
///     async fn generate(&self, prompt: &str) -> ragpipe::Result<String> {
///         Ok(prompt.to_string())
///     }
/// }
///
/// let answer = block_on(Echo.generate("Bonjour")).unwrap().unwrap();
/// assert_eq!(answer, "Bonjour");
/// ```
#[async_trait]
pub trait Generator: Send + Sync {
    /// Model identifier, for display.
    fn model_name(&self) -> &str;

    /// Generates a completion for `prompt`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails or produces no text.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Drives a future to completion on a current-thread runtime.
///
/// # Errors
///
/// Returns `GenerationError::Runtime` if the runtime cannot be created.
pub fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| GenerationError::Runtime(e.to_string()))?;
    Ok(runtime.block_on(future))
}

/// Cleans raw model output.
///
/// Trims whitespace and drops a leading `Réponse détaillée:` that some
/// servers echo from the end of the prompt.
#[must_use]
pub fn parse_output(raw: &str) -> String {
    let text = raw.trim();
    text.strip_prefix(ANSWER_MARKER)
        .map_or(text, str::trim_start)
        .to_string()
}

/// Remediation hint for a failed generation.
#[must_use]
pub const fn suggestion_for(err: &GenerationError) -> &'static str {
    match err {
        GenerationError::Request(_) => {
            "Check that an OpenAI-compatible server is running at --api-base. Large models \
             need a GPU with enough memory: use a smaller model or a machine with more resources."
        }
        GenerationError::EmptyResponse => {
            "The model returned no text. Raise --max-tokens or try another model."
        }
        GenerationError::InvalidParameter(_) => {
            "Check the generation settings: temperature in [0, 2], top-p in (0, 1], max-tokens > 0."
        }
        GenerationError::Runtime(_) => {
            "The async runtime could not start. Free some system resources and retry."
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("  Le RAG combine...  ", "Le RAG combine..." ; "trims")]
    #[test_case("Réponse détaillée:\n  Le RAG", "Le RAG" ; "strips echoed marker")]
    #[test_case("Une réponse détaillée: ici", "Une réponse détaillée: ici" ; "marker mid text kept")]
    #[test_case("", "" ; "empty")]
    fn test_parse_output(raw: &str, expected: &str) {
        assert_eq!(parse_output(raw), expected);
    }

    #[test]
    fn test_suggestions_non_empty() {
        let errors = [
            GenerationError::Request("connection refused".to_string()),
            GenerationError::EmptyResponse,
            GenerationError::InvalidParameter("top_p".to_string()),
            GenerationError::Runtime("io".to_string()),
        ];
        for err in &errors {
            assert!(!suggestion_for(err).is_empty());
        }
        assert!(suggestion_for(&errors[0]).contains("smaller model"));
    }

    #[test]
    fn test_block_on() {
        let value = block_on(async { 21 * 2 }).unwrap();
        assert_eq!(value, 42);
    }
}
