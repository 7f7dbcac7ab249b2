//! Generation parameters.

use crate::error::{GenerationError, Result};
use serde::Serialize;

/// Default generative model.
pub const DEFAULT_MODEL: &str = "mistralai/Mistral-7B-Instruct-v0.2";

/// Default OpenAI-compatible endpoint (a local inference server).
pub const DEFAULT_API_BASE: &str = "http://localhost:8080/v1";

/// Default cap on generated tokens.
pub const DEFAULT_MAX_TOKENS: u32 = 512;

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Default nucleus sampling mass.
pub const DEFAULT_TOP_P: f32 = 0.95;

/// Default frequency penalty.
///
/// OpenAI-compatible servers expose an additive penalty rather than the
/// multiplicative repetition penalty of 1.15 used by local pipelines.
pub const DEFAULT_FREQUENCY_PENALTY: f32 = 0.15;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Settings for one generation backend.
#[derive(Clone, PartialEq, Serialize)]
pub struct GenerationConfig {
    /// Model identifier sent to the server.
    pub model: String,
    /// Base URL of the OpenAI-compatible API.
    pub api_base: String,
    /// Bearer token, if the server wants one.
    #[serde(skip)]
    pub api_key: Option<String>,
    /// Maximum number of generated tokens.
    pub max_tokens: u32,
    /// Sampling temperature (0 to 2).
    pub temperature: f32,
    /// Nucleus sampling mass, in (0, 1].
    pub top_p: f32,
    /// Penalty for repeated tokens (-2 to 2).
    pub frequency_penalty: f32,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

// Keeps the key out of logs.
impl std::fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .field("frequency_penalty", &self.frequency_penalty)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
            frequency_penalty: DEFAULT_FREQUENCY_PENALTY,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl GenerationConfig {
    /// Creates a config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the API base URL.
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    /// Sets the maximum number of generated tokens.
    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Sets the temperature.
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets top-p.
    #[must_use]
    pub const fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = top_p;
        self
    }

    /// Sets the frequency penalty.
    #[must_use]
    pub const fn with_frequency_penalty(mut self, penalty: f32) -> Self {
        self.frequency_penalty = penalty;
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Checks parameter ranges.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError::InvalidParameter` naming the first bad value.
    pub fn validate(&self) -> Result<()> {
        fn invalid(msg: String) -> Result<()> {
            Err(GenerationError::InvalidParameter(msg).into())
        }

        if self.model.trim().is_empty() {
            return invalid("model must not be empty".to_string());
        }
        if self.api_base.trim().is_empty() {
            return invalid("api base must not be empty".to_string());
        }
        if self.max_tokens == 0 {
            return invalid("max_tokens must be greater than 0".to_string());
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return invalid(format!(
                "temperature must be between 0 and 2, got {}",
                self.temperature
            ));
        }
        if !(self.top_p > 0.0 && self.top_p <= 1.0) {
            return invalid(format!("top_p must be in (0, 1], got {}", self.top_p));
        }
        if !(-2.0..=2.0).contains(&self.frequency_penalty) {
            return invalid(format!(
                "frequency_penalty must be between -2 and 2, got {}",
                self.frequency_penalty
            ));
        }
        if self.timeout_secs == 0 {
            return invalid("timeout must be greater than 0".to_string());
        }
        Ok(())
    }
}
