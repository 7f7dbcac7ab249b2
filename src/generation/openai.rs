//! Chat-completions client for OpenAI-compatible servers.
//!
//! Works with any server exposing `/v1/chat/completions`: text-generation
//! inference, vLLM, llama.cpp server, Ollama and the hosted OpenAI API.

use crate::error::{GenerationError, Result};
use crate::generation::{GenerationConfig, Generator};
use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs};
use async_trait::async_trait;
use std::time::Duration;

/// Generator backed by `async-openai`.
pub struct OpenAiGenerator {
    client: Client<OpenAIConfig>,
    config: GenerationConfig,
}

impl std::fmt::Debug for OpenAiGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiGenerator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl OpenAiGenerator {
    /// Creates a client for `config`. No request is made until `generate`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: GenerationConfig) -> Result<Self> {
        config.validate()?;

        let mut client_config = OpenAIConfig::new().with_api_base(&config.api_base);
        if let Some(key) = &config.api_key {
            client_config = client_config.with_api_key(key);
        }

        Ok(Self {
            client: Client::with_config(client_config),
            config,
        })
    }

    /// The configuration this client was built with.
    #[must_use]
    pub const fn config(&self) -> &GenerationConfig {
        &self.config
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    fn model_name(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.config.model)
            .messages([ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()?
                .into()])
            .max_completion_tokens(self.config.max_tokens)
            .temperature(self.config.temperature)
            .top_p(self.config.top_p)
            .frequency_penalty(self.config.frequency_penalty)
            .build()?;

        tracing::info!(
            model = %self.config.model,
            api_base = %self.config.api_base,
            prompt_chars = prompt.chars().count(),
            "requesting completion"
        );

        let timeout = Duration::from_secs(self.config.timeout_secs);
        let response = tokio::time::timeout(timeout, self.client.chat().create(request))
            .await
            .map_err(|_| {
                GenerationError::Request(format!(
                    "no answer from {} within {}s",
                    self.config.api_base, self.config.timeout_secs
                ))
            })??;

        if let Some(usage) = &response.usage {
            tracing::debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "completion usage"
            );
        }

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| GenerationError::EmptyResponse.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_validates() {
        assert!(OpenAiGenerator::new(GenerationConfig::new().with_max_tokens(0)).is_err());
    }

    #[test]
    fn test_model_name() {
        let generator = OpenAiGenerator::new(GenerationConfig::new().with_model("llama3")).unwrap();
        assert_eq!(generator.model_name(), "llama3");
        assert_eq!(generator.config().api_base, "http://localhost:8080/v1");
    }

    #[test]
    fn test_debug_hides_key() {
        let generator = OpenAiGenerator::new(
            GenerationConfig::new().with_api_key(Some("sk-secret".to_string())),
        )
        .unwrap();
        assert!(!format!("{generator:?}").contains("sk-secret"));
    }

    #[test]
    fn test_unreachable_server() {
        // Port 9 (discard) is closed on test machines
        let generator = OpenAiGenerator::new(
            GenerationConfig::new()
                .with_api_base("http://127.0.0.1:9/v1")
                .with_timeout_secs(5),
        )
        .unwrap();

        let err = crate::generation::block_on(generator.generate("Bonjour"))
            .unwrap()
            .unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Generation(GenerationError::Request(_))
        ));
    }
}
