//! CLI command implementations.
//!
//! Contains the business logic for each CLI command.

use crate::chain::{RagAnswer, RagChain};
use crate::cli::output::{
    DemoReport, EmbeddingSummary, OutputFormat, PersistSummary, StepOutcome, format_answer,
    format_demo, format_env, format_persist, format_search_results, format_status,
};
use crate::cli::parser::{Cli, Commands, DemoArgs};
use crate::config::PipelineConfig;
use crate::core::{DEFAULT_HEAD_ROWS, Document, DocumentTable, sample_documents};
use crate::diagnostics::EnvironmentReport;
use crate::embedding::{Embedder, create_embedder};
use crate::error::{CommandError, Error, Result, StorageError};
use crate::generation::{OpenAiGenerator, suggestion_for};
use crate::io::load_documents;
use crate::prompt::PromptTemplate;
use crate::search::{Retriever, SearchResult, VectorStore};
use crate::storage::{
    SqliteStorage, Storage, collection_path, open_collection, persist_collection,
};
use std::path::Path;

/// Hint shown when the persistence step fails.
pub const PERSIST_SUGGESTION: &str = "Check that the persist directory is writable and not used by \
     another process, run `ragpipe reset --yes` if it holds a collection built with another \
     embedding model, or pass --no-persist.";

/// Hint shown when the prompt template cannot be used.
pub const TEMPLATE_SUGGESTION: &str = "Check that the prompt template file exists and contains both \
     {context} and {question}, or unset RAGPIPE_PROMPT_TEMPLATE to use the built-in template.";

/// Executes the CLI command.
///
/// # Arguments
///
/// * `cli` - Parsed CLI arguments.
///
/// # Returns
///
/// Result with output string on success.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the command fails.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);
    let config = PipelineConfig::from_cli(cli);

    match cli.command_or_default() {
        Commands::Env => Ok(format_env(&EnvironmentReport::detect(), format)),
        Commands::Status => cmd_status(&config.persist_dir, format),
        Commands::Reset { yes } => cmd_reset(&config.persist_dir, yes, format),
        Commands::Demo(args) => {
            config.validate()?;
            cmd_demo(&config, &args, format)
        }
        Commands::Index { corpus, force } => {
            config.validate()?;
            cmd_index(&config, corpus.as_deref(), force, format)
        }
        Commands::Search { query, .. } => {
            config.validate()?;
            cmd_search(&config, &query, format)
        }
        Commands::Ask { question, .. } => {
            config.validate()?;
            cmd_ask(&config, &question, format)
        }
    }
}

/// Opens an existing collection without creating it.
fn open_existing(persist_dir: &Path) -> Result<SqliteStorage> {
    let path = collection_path(persist_dir);
    if !path.exists() {
        return Err(StorageError::NotInitialized.into());
    }

    let storage = SqliteStorage::open(&path)?;
    if !storage.is_initialized()? {
        return Err(StorageError::NotInitialized.into());
    }

    Ok(storage)
}

/// Reads the corpus file, or the built-in documents.
fn load_corpus(corpus: Option<&Path>) -> Result<Vec<Document>> {
    let documents = match corpus {
        Some(path) => load_documents(path)?,
        None => sample_documents(),
    };

    if documents.is_empty() {
        return Err(CommandError::InvalidArgument("corpus contains no documents".to_string()).into());
    }

    tracing::info!(documents = documents.len(), "loaded corpus");
    Ok(documents)
}

/// Writes documents and vectors to the collection in `persist_dir`.
fn persist(
    persist_dir: &Path,
    documents: &[Document],
    embeddings: &[Vec<f32>],
    embedder: &dyn Embedder,
) -> Result<PersistSummary> {
    let mut storage = open_collection(persist_dir)?;
    let ids = persist_collection(&mut storage, documents, embeddings, embedder.model_name())?;

    Ok(PersistSummary {
        path: collection_path(persist_dir).display().to_string(),
        model: embedder.model_name().to_string(),
        dimensions: embedder.dimensions(),
        written: ids.len(),
        total: storage.document_count()?,
    })
}

/// Loads the template and answers `question`; failures are reported, not raised.
fn answer_step(
    config: &PipelineConfig,
    store: &VectorStore<'_>,
    question: &str,
) -> StepOutcome<RagAnswer> {
    let outcome = PromptTemplate::load(config.template_path.as_deref()).and_then(|template| {
        let generator = OpenAiGenerator::new(config.generation.clone())?;
        let chain = RagChain::new(
            Retriever::new(store, config.search_config()),
            template,
            generator,
        );
        tracing::info!(step = "generate", model = %config.generation.model, "answering");
        chain.invoke_blocking(question)
    });

    match outcome {
        Ok(answer) => StepOutcome::Completed(answer),
        Err(e) => {
            tracing::warn!(error = %e, "generation failed");
            StepOutcome::Failed {
                error: e.to_string(),
                suggestion: generation_suggestion(&e).to_string(),
            }
        }
    }
}

/// Persists the indexed corpus; failures are reported, not raised.
fn persist_step(persist_dir: &Path, store: &VectorStore<'_>) -> StepOutcome<PersistSummary> {
    tracing::info!(step = "persist", dir = %persist_dir.display(), "persisting");
    match persist(
        persist_dir,
        store.documents(),
        store.embeddings(),
        store.embedder(),
    ) {
        Ok(summary) => StepOutcome::Completed(summary),
        Err(e) => {
            tracing::warn!(error = %e, "persistence failed");
            StepOutcome::Failed {
                error: e.to_string(),
                suggestion: PERSIST_SUGGESTION.to_string(),
            }
        }
    }
}

fn generation_suggestion(err: &Error) -> &'static str {
    match err {
        Error::Generation(e) => suggestion_for(e),
        Error::Prompt(_) | Error::Io(_) => TEMPLATE_SUGGESTION,
        _ => "Use a smaller model or a machine with more resources.",
    }
}

// ==================== Command Implementations ====================

fn cmd_demo(config: &PipelineConfig, args: &DemoArgs, format: OutputFormat) -> Result<String> {
    let environment = EnvironmentReport::detect();
    tracing::info!(step = "diagnostics", ?environment, "environment detected");

    let documents = load_corpus(args.corpus.as_deref())?;
    let corpus = DocumentTable::from_documents(&documents);

    let embedder = create_embedder(&config.embedding_model)?;
    tracing::info!(step = "embed", model = embedder.model_name(), "embedding corpus");
    let store = VectorStore::from_documents(documents, embedder.as_ref())?;
    let embedding = EmbeddingSummary {
        model: embedder.model_name().to_string(),
        dimensions: embedder.dimensions(),
        documents: store.len(),
        index_backend: store.backend().to_string(),
    };

    tracing::info!(step = "retrieve", query = %args.query, "searching");
    let retrieved = store.similarity_search_with_threshold(&args.query, &config.search_config())?;

    let answer = if args.skip_generation {
        StepOutcome::Skipped
    } else {
        answer_step(config, &store, &args.question)
    };

    let persistence = if args.no_persist {
        StepOutcome::Skipped
    } else {
        persist_step(&config.persist_dir, &store)
    };

    let report = DemoReport {
        environment,
        corpus,
        embedding,
        query: args.query.clone(),
        retrieved,
        answer,
        persistence,
    };
    Ok(format_demo(&report, DEFAULT_HEAD_ROWS, format))
}

fn cmd_index(
    config: &PipelineConfig,
    corpus: Option<&Path>,
    force: bool,
    format: OutputFormat,
) -> Result<String> {
    let documents = load_corpus(corpus)?;

    if force && collection_path(&config.persist_dir).exists() {
        let mut storage = open_collection(&config.persist_dir)?;
        storage.reset()?;
    }

    let embedder = create_embedder(&config.embedding_model)?;
    let texts: Vec<&str> = documents.iter().map(|d| d.content.as_str()).collect();
    let embeddings = embedder.embed_batch(&texts)?;

    let summary = persist(&config.persist_dir, &documents, &embeddings, embedder.as_ref())?;
    Ok(format_persist(&summary, format))
}

fn cmd_search(config: &PipelineConfig, query: &str, format: OutputFormat) -> Result<String> {
    let storage = open_existing(&config.persist_dir)?;
    let embedder = create_embedder(&config.embedding_model)?;
    let store = VectorStore::from_storage(&storage, embedder.as_ref())?;

    let results: Vec<SearchResult> =
        store.similarity_search_with_threshold(query, &config.search_config())?;
    Ok(format_search_results(&results, query, format))
}

fn cmd_ask(config: &PipelineConfig, question: &str, format: OutputFormat) -> Result<String> {
    let storage = open_existing(&config.persist_dir)?;
    let embedder = create_embedder(&config.embedding_model)?;
    let store = VectorStore::from_storage(&storage, embedder.as_ref())?;
    let template = PromptTemplate::load(config.template_path.as_deref())?;
    let generator = OpenAiGenerator::new(config.generation.clone())?;

    let chain = RagChain::new(
        Retriever::new(&store, config.search_config()),
        template,
        generator,
    );
    let answer = chain.invoke_blocking(question)?;
    Ok(format_answer(&answer, format))
}

fn cmd_status(persist_dir: &Path, format: OutputFormat) -> Result<String> {
    let storage = open_existing(persist_dir)?;
    let stats = storage.stats()?;
    Ok(format_status(&stats, format))
}

fn cmd_reset(persist_dir: &Path, yes: bool, format: OutputFormat) -> Result<String> {
    if !yes {
        return Err(CommandError::ExecutionFailed(
            "Use --yes to confirm reset. This will delete all persisted data.".to_string(),
        )
        .into());
    }

    let mut storage = open_existing(persist_dir)?;
    storage.reset()?;

    let path = collection_path(persist_dir).display().to_string();
    Ok(match format {
        OutputFormat::Text => format!("Collection reset: {path}\n"),
        OutputFormat::Json => format!(
            "{}\n",
            serde_json::json!({ "reset": true, "path": path })
        ),
    })
}
