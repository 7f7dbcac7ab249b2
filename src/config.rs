//! Pipeline configuration.
//!
//! Gathers the values the commands need from parsed CLI flags (which carry
//! their own environment fallbacks) and checks them once, up front.

use crate::cli::{Cli, Commands};
use crate::embedding::resolve_model;
use crate::error::{Error, Result};
use crate::generation::GenerationConfig;
use crate::search::{DEFAULT_TOP_K, SearchConfig};
use crate::storage::DEFAULT_PERSIST_DIR;
use serde::Serialize;
use std::path::PathBuf;

/// Environment variable consulted when no API key flag is given.
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Everything a pipeline run needs.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineConfig {
    /// Directory holding the persisted collection.
    pub persist_dir: PathBuf,
    /// Sentence-embedding model identifier.
    pub embedding_model: String,
    /// Number of documents retrieved per query.
    pub top_k: usize,
    /// Minimum cosine similarity for retrieved documents.
    pub similarity_threshold: Option<f32>,
    /// Prompt template file, if not the built-in one.
    pub template_path: Option<PathBuf>,
    /// Language model settings.
    pub generation: GenerationConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            persist_dir: PathBuf::from(DEFAULT_PERSIST_DIR),
            embedding_model: crate::embedding::DEFAULT_EMBEDDING_MODEL.to_string(),
            top_k: DEFAULT_TOP_K,
            similarity_threshold: None,
            template_path: None,
            generation: GenerationConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Builds the configuration for a parsed command line.
    #[must_use]
    pub fn from_cli(cli: &Cli) -> Self {
        let (top_k, similarity_threshold) = match cli.command_or_default() {
            Commands::Demo(args) => (args.top_k, None),
            Commands::Search {
                top_k, threshold, ..
            } => (top_k, threshold),
            Commands::Ask { top_k, .. } => (top_k, None),
            _ => (DEFAULT_TOP_K, None),
        };

        let args = &cli.generation;
        let api_key = args
            .api_key
            .clone()
            .or_else(|| std::env::var(OPENAI_API_KEY_ENV).ok())
            .filter(|key| !key.trim().is_empty());

        let generation = GenerationConfig::new()
            .with_model(args.model.clone())
            .with_api_base(args.api_base.clone())
            .with_api_key(api_key)
            .with_max_tokens(args.max_tokens)
            .with_temperature(args.temperature)
            .with_top_p(args.top_p)
            .with_frequency_penalty(args.frequency_penalty)
            .with_timeout_secs(args.timeout);

        Self {
            persist_dir: cli.get_persist_dir(),
            embedding_model: cli.embedding_model.clone(),
            top_k,
            similarity_threshold,
            template_path: cli.template.clone(),
            generation,
        }
    }

    /// Retrieval parameters derived from this configuration.
    #[must_use]
    pub fn search_config(&self) -> SearchConfig {
        let config = SearchConfig::new().with_top_k(self.top_k);
        match self.similarity_threshold {
            Some(threshold) => config.with_threshold(threshold),
            None => config,
        }
    }

    /// Checks every value.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(Error::config("top-k must be greater than 0"));
        }
        if let Some(threshold) = self.similarity_threshold
            && !(-1.0..=1.0).contains(&threshold)
        {
            return Err(Error::config(format!(
                "threshold must be between -1 and 1, got {threshold}"
            )));
        }
        if self.persist_dir.as_os_str().is_empty() {
            return Err(Error::config("persist directory must not be empty"));
        }
        resolve_model(&self.embedding_model).map_err(|e| Error::config(e.to_string()))?;
        self.generation
            .validate()
            .map_err(|e| Error::config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use test_case::test_case;

    fn parse(args: &[&str]) -> PipelineConfig {
        PipelineConfig::from_cli(&Cli::try_parse_from(args).unwrap())
    }

    #[test]
    fn test_default_is_valid() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_from_cli_search() {
        let config = parse(&["ragpipe", "search", "RAG", "-k", "4", "--threshold", "0.3"]);
        assert_eq!(config.top_k, 4);
        assert_eq!(config.similarity_threshold, Some(0.3));

        let search = config.search_config();
        assert_eq!(search.top_k, 4);
        assert_eq!(search.similarity_threshold, Some(0.3));
    }

    #[test]
    fn test_from_cli_generation_flags() {
        let config = parse(&[
            "ragpipe",
            "ask",
            "Qu'est-ce que LangChain?",
            "--model",
            "llama3",
            "--max-tokens",
            "64",
            "--api-key",
            "secret",
        ]);
        assert_eq!(config.generation.model, "llama3");
        assert_eq!(config.generation.max_tokens, 64);
        assert_eq!(config.generation.api_key.as_deref(), Some("secret"));
    }

    #[test]
    fn test_from_cli_status_uses_default_top_k() {
        let config = parse(&["ragpipe", "status"]);
        assert_eq!(config.top_k, DEFAULT_TOP_K);
        assert!(config.similarity_threshold.is_none());
    }

    #[test_case(PipelineConfig { top_k: 0, ..PipelineConfig::default() }, "top-k" ; "zero top k")]
    #[test_case(PipelineConfig { similarity_threshold: Some(1.5), ..PipelineConfig::default() }, "threshold" ; "threshold")]
    #[test_case(PipelineConfig { embedding_model: "acme/unknown".to_string(), ..PipelineConfig::default() }, "acme/unknown" ; "unknown model")]
    #[test_case(PipelineConfig { generation: GenerationConfig::new().with_temperature(9.0), ..PipelineConfig::default() }, "temperature" ; "generation range")]
    fn test_validate_rejects(config: PipelineConfig, needle: &str) {
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        assert!(err.to_string().contains(needle), "{err}");
    }
}
