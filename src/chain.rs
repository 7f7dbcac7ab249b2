//! Retrieval-augmented answering.
//!
//! A [`RagChain`] retrieves context for a question, formats the prompt,
//! generates with the configured model and cleans the output.

use crate::error::Result;
use crate::generation::{Generator, block_on, parse_output};
use crate::prompt::{PromptTemplate, format_docs};
use crate::search::{Retriever, SearchResult};
use serde::Serialize;

/// Prompt ready to be sent to the model.
#[derive(Debug, Clone, Serialize)]
pub struct PreparedPrompt {
    /// Question asked.
    pub question: String,
    /// Retrieved context documents, best first.
    pub documents: Vec<SearchResult>,
    /// Documents joined into the context block.
    pub context: String,
    /// Fully formatted prompt.
    pub prompt: String,
}

/// Answer produced by the chain.
#[derive(Debug, Clone, Serialize)]
pub struct RagAnswer {
    /// Question asked.
    pub question: String,
    /// Context documents the answer was grounded on.
    pub documents: Vec<SearchResult>,
    /// Prompt sent to the model.
    pub prompt: String,
    /// Cleaned model output.
    pub answer: String,
}

/// Retriever, prompt template and generator wired together.
pub struct RagChain<'a, G: Generator> {
    retriever: Retriever<'a>,
    template: PromptTemplate,
    generator: G,
}

impl<G: Generator> std::fmt::Debug for RagChain<'_, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RagChain")
            .field("retriever", &self.retriever)
            .field("template", &self.template.input_variables())
            .field("model", &self.generator.model_name())
            .finish()
    }
}

impl<'a, G: Generator> RagChain<'a, G> {
    /// Creates a chain.
    #[must_use]
    pub const fn new(retriever: Retriever<'a>, template: PromptTemplate, generator: G) -> Self {
        Self {
            retriever,
            template,
            generator,
        }
    }

    /// The generator used for answers.
    #[must_use]
    pub const fn generator(&self) -> &G {
        &self.generator
    }

    /// Retrieves context and formats the prompt without calling the model.
    ///
    /// # Errors
    ///
    /// Returns an error if retrieval or formatting fails.
    pub fn prepare(&self, question: &str) -> Result<PreparedPrompt> {
        let documents = self.retriever.get_relevant_documents(question)?;
        let context = format_docs(&documents);
        let prompt = self.template.format_rag(&context, question)?;
        tracing::debug!(
            documents = documents.len(),
            prompt_chars = prompt.chars().count(),
            "prepared prompt"
        );

        Ok(PreparedPrompt {
            question: question.to_string(),
            documents,
            context,
            prompt,
        })
    }

    /// Answers `question`.
    ///
    /// # Errors
    ///
    /// Returns an error if retrieval, formatting or generation fails.
    pub async fn invoke(&self, question: &str) -> Result<RagAnswer> {
        let prepared = self.prepare(question)?;
        let raw = self.generator.generate(&prepared.prompt).await?;

        Ok(RagAnswer {
            question: prepared.question,
            documents: prepared.documents,
            prompt: prepared.prompt,
            answer: parse_output(&raw),
        })
    }

    /// Answers `question`, blocking the current thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime cannot start or the chain fails.
    pub fn invoke_blocking(&self, question: &str) -> Result<RagAnswer> {
        block_on(self.invoke(question))?
    }
}
