//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use crate::embedding::DEFAULT_EMBEDDING_MODEL;
use crate::generation::{
    DEFAULT_API_BASE, DEFAULT_FREQUENCY_PENALTY, DEFAULT_MAX_TOKENS, DEFAULT_MODEL,
    DEFAULT_TEMPERATURE, DEFAULT_TIMEOUT_SECS, DEFAULT_TOP_P,
};
use crate::search::DEFAULT_TOP_K;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Query used by the demo retrieval step.
pub const DEFAULT_QUERY: &str = "Qu'est-ce que le RAG?";

/// Question answered by the demo generation step.
pub const DEFAULT_QUESTION: &str = "Explique-moi le concept de RAG et son utilité.";

/// ragpipe: Retrieval Augmented Generation pipeline.
///
/// Embeds a small corpus, retrieves the documents closest to a question
/// and asks a language model to answer from them.
#[derive(Parser, Debug)]
#[command(name = "ragpipe")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory holding the persisted collection.
    ///
    /// Defaults to `chroma_db` in the current directory.
    #[arg(short = 'd', long, env = "RAGPIPE_PERSIST_DIR", global = true)]
    pub persist_dir: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// Sentence-embedding model identifier.
    #[arg(
        long,
        env = "RAGPIPE_EMBEDDING_MODEL",
        default_value = DEFAULT_EMBEDDING_MODEL,
        global = true
    )]
    pub embedding_model: String,

    /// Prompt template file with `{context}` and `{question}` placeholders.
    #[arg(long, env = "RAGPIPE_PROMPT_TEMPLATE", global = true)]
    pub template: Option<PathBuf>,

    /// Generation settings.
    #[command(flatten)]
    pub generation: GenerationArgs,

    /// The subcommand to execute (defaults to `demo`).
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Settings for the language model server.
#[derive(Args, Debug, Clone)]
pub struct GenerationArgs {
    /// Generative model identifier.
    #[arg(short, long, env = "RAGPIPE_MODEL", default_value = DEFAULT_MODEL, global = true)]
    pub model: String,

    /// Base URL of the OpenAI-compatible API.
    #[arg(long, env = "RAGPIPE_API_BASE", default_value = DEFAULT_API_BASE, global = true)]
    pub api_base: String,

    /// API key (falls back to `OPENAI_API_KEY`).
    #[arg(long, env = "RAGPIPE_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// Maximum number of generated tokens.
    #[arg(long, default_value_t = DEFAULT_MAX_TOKENS, global = true)]
    pub max_tokens: u32,

    /// Sampling temperature.
    #[arg(long, default_value_t = DEFAULT_TEMPERATURE, global = true)]
    pub temperature: f32,

    /// Nucleus sampling mass.
    #[arg(long, default_value_t = DEFAULT_TOP_P, global = true)]
    pub top_p: f32,

    /// Penalty for repeated tokens.
    #[arg(long, default_value_t = DEFAULT_FREQUENCY_PENALTY, global = true)]
    pub frequency_penalty: f32,

    /// Request timeout in seconds.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS, global = true)]
    pub timeout: u64,
}

/// Options of the demo run.
#[derive(Args, Debug, Clone, PartialEq)]
pub struct DemoArgs {
    /// Corpus file (paragraphs separated by blank lines) replacing the
    /// built-in documents.
    #[arg(long)]
    pub corpus: Option<PathBuf>,

    /// Query for the retrieval step.
    #[arg(long, default_value = DEFAULT_QUERY)]
    pub query: String,

    /// Question for the answer step.
    #[arg(long, default_value = DEFAULT_QUESTION)]
    pub question: String,

    /// Number of documents to retrieve.
    #[arg(short = 'k', long, default_value_t = DEFAULT_TOP_K)]
    pub top_k: usize,

    /// Stop after retrieval.
    #[arg(long)]
    pub skip_generation: bool,

    /// Do not write the collection to disk.
    #[arg(long)]
    pub no_persist: bool,
}

impl Default for DemoArgs {
    fn default() -> Self {
        Self {
            corpus: None,
            query: DEFAULT_QUERY.to_string(),
            question: DEFAULT_QUESTION.to_string(),
            top_k: DEFAULT_TOP_K,
            skip_generation: false,
            no_persist: false,
        }
    }
}

/// Available CLI commands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the whole pipeline on the sample corpus.
    ///
    /// Diagnostics, corpus preview, embedding, indexing, retrieval,
    /// generation and persistence.
    Demo(DemoArgs),

    /// Embed a corpus and persist it.
    Index {
        /// Corpus file (built-in documents if omitted).
        #[arg(long)]
        corpus: Option<PathBuf>,

        /// Delete the existing collection first.
        #[arg(short, long)]
        force: bool,
    },

    /// Retrieve the documents closest to a query.
    Search {
        /// Search query.
        query: String,

        /// Number of documents to retrieve.
        #[arg(short = 'k', long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,

        /// Minimum cosine similarity.
        #[arg(short, long)]
        threshold: Option<f32>,
    },

    /// Answer a question from the persisted collection.
    Ask {
        /// Question to answer.
        question: String,

        /// Number of context documents.
        #[arg(short = 'k', long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,
    },

    /// Show collection statistics.
    Status,

    /// Delete all persisted data.
    Reset {
        /// Confirm the deletion.
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Show environment diagnostics.
    Env,
}

impl Cli {
    /// Returns the persistence directory, using the default if not specified.
    #[must_use]
    pub fn get_persist_dir(&self) -> PathBuf {
        self.persist_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(crate::storage::DEFAULT_PERSIST_DIR))
    }

    /// Returns the command to run; no subcommand means the demo.
    #[must_use]
    pub fn command_or_default(&self) -> Commands {
        self.command
            .clone()
            .unwrap_or_else(|| Commands::Demo(DemoArgs::default()))
    }
}
