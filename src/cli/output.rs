//! Output formatting for CLI commands.
//!
//! Supports text and JSON output formats.

use crate::chain::RagAnswer;
use crate::core::DocumentTable;
use crate::diagnostics::EnvironmentReport;
use crate::error::Error;
use crate::io::unicode::{single_line, truncate_graphemes};
use crate::search::SearchResult;
use crate::storage::StorageStats;
use serde::Serialize;
use std::fmt::Write;

/// Width of the content column in tables.
const PREVIEW_WIDTH: usize = 60;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// JSON output.
    Json,
}

impl OutputFormat {
    /// Parses format from string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Result of a pipeline step that may fail without aborting the run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome<T> {
    /// The step ran.
    Completed(T),
    /// The step was disabled by a flag.
    Skipped,
    /// The step failed; the run went on.
    Failed {
        /// Error message.
        error: String,
        /// What to try next.
        suggestion: String,
    },
}

/// Where and what the persistence step wrote.
#[derive(Debug, Clone, Serialize)]
pub struct PersistSummary {
    /// Collection database file.
    pub path: String,
    /// Embedding model recorded with the vectors.
    pub model: String,
    /// Vector dimensions.
    pub dimensions: usize,
    /// Documents written by this run.
    pub written: usize,
    /// Documents in the collection afterwards.
    pub total: usize,
}

/// Embedding step summary.
#[derive(Debug, Clone, Serialize)]
pub struct EmbeddingSummary {
    /// Model identifier.
    pub model: String,
    /// Vector dimensions.
    pub dimensions: usize,
    /// Number of embedded documents.
    pub documents: usize,
    /// Vector index backend.
    pub index_backend: String,
}

/// Everything the demo run produced.
#[derive(Debug, Clone, Serialize)]
pub struct DemoReport {
    /// Environment diagnostics.
    pub environment: EnvironmentReport,
    /// Corpus table (first rows only in text output).
    pub corpus: DocumentTable,
    /// Embedding and indexing.
    pub embedding: EmbeddingSummary,
    /// Retrieval query.
    pub query: String,
    /// Retrieved documents, best first.
    pub retrieved: Vec<SearchResult>,
    /// Generated answer.
    pub answer: StepOutcome<RagAnswer>,
    /// Persistence.
    pub persistence: StepOutcome<PersistSummary>,
}

/// Formats environment diagnostics.
#[must_use]
pub fn format_env(report: &EnvironmentReport, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format_env_text(report),
        OutputFormat::Json => format_json(report),
    }
}

fn format_env_text(report: &EnvironmentReport) -> String {
    let mut output = String::new();
    output.push_str("Environment\n");
    output.push_str("===========\n");
    let _ = writeln!(output, "  ragpipe:     {}", report.version);
    let _ = writeln!(output, "  Platform:    {}/{}", report.os, report.arch);
    let _ = writeln!(output, "  CPU threads: {}", report.cpu_threads);
    let _ = writeln!(output, "  Device:      {}", report.device);
    let _ = writeln!(output, "  Embeddings:  {}", report.embedding_backend);
    let _ = writeln!(output, "  Index:       {}", report.vector_backend);
    output
}

/// Formats collection statistics.
#[must_use]
pub fn format_status(stats: &StorageStats, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format_status_text(stats),
        OutputFormat::Json => format_json(stats),
    }
}

fn format_status_text(stats: &StorageStats) -> String {
    let mut output = String::new();
    output.push_str("Collection Status\n");
    output.push_str("=================\n\n");
    let _ = writeln!(output, "  Documents:     {}", stats.document_count);
    let _ = writeln!(output, "  Embeddings:    {}", stats.embedding_count);
    let _ = writeln!(
        output,
        "  Model:         {}",
        stats.embedding_model.as_deref().unwrap_or("-")
    );
    let _ = writeln!(
        output,
        "  Dimensions:    {}",
        stats
            .dimensions
            .map_or_else(|| "-".to_string(), |d| d.to_string())
    );
    let _ = writeln!(output, "  Schema:        v{}", stats.schema_version);
    if let Some(size) = stats.db_size {
        let _ = writeln!(output, "  DB size:       {}", format_size(size));
    }
    output
}

/// Formats the corpus preview table.
#[must_use]
pub fn format_table(table: &DocumentTable, rows: usize, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format_table_text(table, rows),
        OutputFormat::Json => format_json(&table.head(rows)),
    }
}

fn format_table_text(table: &DocumentTable, rows: usize) -> String {
    if table.is_empty() {
        return "No documents.\n".to_string();
    }

    let mut output = String::new();
    let _ = writeln!(output, "{:<6} Content", "ID");
    output.push_str(&"-".repeat(PREVIEW_WIDTH + 7));
    output.push('\n');
    for row in table.head(rows) {
        let _ = writeln!(output, "{:<6} {}", row.id, preview(&row.content, PREVIEW_WIDTH));
    }
    if table.len() > rows {
        let _ = writeln!(output, "... {} more", table.len() - rows);
    }
    output
}

/// Formats retrieval results.
#[must_use]
pub fn format_search_results(
    results: &[SearchResult],
    query: &str,
    format: OutputFormat,
) -> String {
    match format {
        OutputFormat::Text => format_search_text(results, query),
        OutputFormat::Json => {
            let json = serde_json::json!({
                "query": query,
                "count": results.len(),
                "results": results,
            });
            format_json(&json)
        }
    }
}

fn format_search_text(results: &[SearchResult], query: &str) -> String {
    if results.is_empty() {
        return format!("No results found for query: \"{query}\"\n");
    }

    let mut output = String::new();
    let _ = writeln!(
        output,
        "Search results for \"{query}\" ({} results):\n",
        results.len()
    );
    let _ = writeln!(output, "{:<6} {:<8} Content", "ID", "Score");
    output.push_str(&"-".repeat(PREVIEW_WIDTH + 16));
    output.push('\n');
    for result in results {
        let _ = writeln!(
            output,
            "{:<6} {:<8.4} {}",
            result.id,
            result.score,
            preview(&result.content, PREVIEW_WIDTH)
        );
    }
    output
}

/// Formats a RAG answer.
#[must_use]
pub fn format_answer(answer: &RagAnswer, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format_answer_text(answer),
        OutputFormat::Json => format_json(answer),
    }
}

fn format_answer_text(answer: &RagAnswer) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "Question: {}\n", answer.question);
    output.push_str(&answer.answer);
    output.push_str("\n\nSources:\n");
    for doc in &answer.documents {
        let _ = writeln!(
            output,
            "  [{}] {}",
            doc.id,
            preview(&doc.content, PREVIEW_WIDTH)
        );
    }
    output
}

/// Formats a persistence summary.
#[must_use]
pub fn format_persist(summary: &PersistSummary, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format!(
            "Indexed {} documents with {} ({} dimensions)\n  Collection: {} ({} documents)\n",
            summary.written, summary.model, summary.dimensions, summary.path, summary.total
        ),
        OutputFormat::Json => format_json(summary),
    }
}

/// Formats the full demo run.
#[must_use]
pub fn format_demo(report: &DemoReport, preview_rows: usize, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format_demo_text(report, preview_rows),
        OutputFormat::Json => format_json(report),
    }
}

fn format_demo_text(report: &DemoReport, preview_rows: usize) -> String {
    let mut output = format_env_text(&report.environment);

    section(&mut output, "Corpus");
    output.push_str(&format_table_text(&report.corpus, preview_rows));

    section(&mut output, "Embeddings");
    let embedding = &report.embedding;
    let _ = writeln!(output, "  Model:      {}", embedding.model);
    let _ = writeln!(output, "  Dimensions: {}", embedding.dimensions);
    let _ = writeln!(output, "  Documents:  {}", embedding.documents);
    let _ = writeln!(output, "  Index:      {}", embedding.index_backend);

    section(&mut output, "Retrieval");
    output.push_str(&format_search_text(&report.retrieved, &report.query));

    section(&mut output, "Answer");
    match &report.answer {
        StepOutcome::Completed(answer) => output.push_str(&format_answer_text(answer)),
        StepOutcome::Skipped => output.push_str("Generation skipped.\n"),
        StepOutcome::Failed { error, suggestion } => {
            let _ = writeln!(output, "Generation failed: {error}");
            let _ = writeln!(output, "Suggestion: {suggestion}");
        }
    }

    section(&mut output, "Persistence");
    match &report.persistence {
        StepOutcome::Completed(summary) => {
            let _ = writeln!(
                output,
                "Saved {} documents to {} ({} in collection)",
                summary.written, summary.path, summary.total
            );
        }
        StepOutcome::Skipped => output.push_str("Persistence skipped.\n"),
        StepOutcome::Failed { error, suggestion } => {
            let _ = writeln!(output, "Persistence failed: {error}");
            let _ = writeln!(output, "Suggestion: {suggestion}");
        }
    }

    output.push_str("\nDemo complete.\n");
    output
}

fn section(output: &mut String, title: &str) {
    let _ = writeln!(output, "\n{title}\n{}", "=".repeat(title.len()));
}

/// Formats an error for display.
///
/// JSON errors carry a `type` tag so scripts can branch on the stage that
/// failed.
#[must_use]
pub fn format_error(error: &Error, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => error.to_string(),
        OutputFormat::Json => {
            let kind = match error {
                Error::Storage(_) => "storage",
                Error::Embedding(_) => "embedding",
                Error::Search(_) => "search",
                Error::Prompt(_) => "prompt",
                Error::Generation(_) => "generation",
                Error::Io(_) => "io",
                Error::Command(_) => "command",
                Error::InvalidState { .. } => "invalid_state",
                Error::Config { .. } => "config",
            };
            let mut json = serde_json::json!({
                "error": error.to_string(),
                "type": kind,
            });
            if let Error::Generation(e) = error {
                json["suggestion"] = crate::generation::suggestion_for(e).into();
            }
            serde_json::to_string(&json).unwrap_or_else(|_| "{}".to_string())
        }
    }
}

/// Formats a value as JSON.
fn format_json<T: Serialize + ?Sized>(value: &T) -> String {
    let mut json = serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string());
    json.push('\n');
    json
}

/// Formats a byte size as human-readable.
#[allow(clippy::cast_precision_loss)]
fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// One-line preview of `content`, at most `width` graphemes.
fn preview(content: &str, width: usize) -> String {
    let line = single_line(content);
    let truncated = truncate_graphemes(&line, width);
    if truncated.len() == line.len() {
        line
    } else {
        format!("{}...", truncate_graphemes(&line, width.saturating_sub(3)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sample_documents;
    use crate::error::{GenerationError, StorageError};

    fn result(id: i64, content: &str, score: f32) -> SearchResult {
        SearchResult {
            id,
            content: content.to_string(),
            source: None,
            score,
        }
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(OutputFormat::parse("json"), OutputFormat::Json);
        assert_eq!(OutputFormat::parse("JSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::parse("text"), OutputFormat::Text);
        assert_eq!(OutputFormat::parse("unknown"), OutputFormat::Text);
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(100), "100 B");
        assert_eq!(format_size(1024), "1.0 KB");
        assert_eq!(format_size(1024 * 1024), "1.0 MB");
    }

    #[test]
    fn test_preview() {
        assert_eq!(preview("Bonjour", 10), "Bonjour");
        assert_eq!(preview("Bonjour le monde", 10), "Bonjour...");
        assert_eq!(preview("deux\nlignes", 20), "deux lignes");
        assert_eq!(preview("éèêëàâäôö", 6), "éèê...");
    }

    #[test]
    fn test_format_status() {
        let stats = StorageStats {
            document_count: 5,
            embedding_count: 5,
            embedding_model: Some("hash-fallback".to_string()),
            dimensions: Some(384),
            schema_version: 1,
            db_size: Some(4096),
        };

        let text = format_status(&stats, OutputFormat::Text);
        assert!(text.contains("Documents:     5"));
        assert!(text.contains("Dimensions:    384"));
        assert!(text.contains("4.0 KB"));

        let json = format_status(&stats, OutputFormat::Json);
        assert!(json.contains("\"document_count\": 5"));
    }

    #[test]
    fn test_format_table_head() {
        let table = DocumentTable::from_documents(&sample_documents());
        let text = format_table(&table, 2, OutputFormat::Text);
        assert!(text.contains("L'intelligence artificielle"));
        assert!(!text.contains("transformers"));
        assert!(text.contains("... 3 more"));

        let json: serde_json::Value =
            serde_json::from_str(&format_table(&table, 5, OutputFormat::Json)).unwrap();
        assert_eq!(json.as_array().unwrap().len(), 5);
        assert_eq!(json[4]["id"], 4);
    }

    #[test]
    fn test_format_search_results() {
        let results = [result(4, "Le RAG combine", 0.81)];
        let text = format_search_results(&results, "RAG", OutputFormat::Text);
        assert!(text.contains("1 results"));
        assert!(text.contains("0.8100"));

        let empty = format_search_results(&[], "RAG", OutputFormat::Text);
        assert!(empty.contains("No results"));

        let json: serde_json::Value =
            serde_json::from_str(&format_search_results(&results, "RAG", OutputFormat::Json))
                .unwrap();
        assert_eq!(json["count"], 1);
        assert_eq!(json["results"][0]["id"], 4);
    }

    #[test]
    fn test_step_outcome_serialization() {
        let failed: StepOutcome<PersistSummary> = StepOutcome::Failed {
            error: "disk full".to_string(),
            suggestion: "free space".to_string(),
        };
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"], "disk full");

        let skipped: StepOutcome<PersistSummary> = StepOutcome::Skipped;
        assert_eq!(serde_json::to_value(&skipped).unwrap()["status"], "skipped");
    }

    #[test]
    fn test_format_error_json() {
        let err: Error = GenerationError::EmptyResponse.into();
        let json: serde_json::Value =
            serde_json::from_str(&format_error(&err, OutputFormat::Json)).unwrap();
        assert_eq!(json["type"], "generation");
        assert!(json["suggestion"].is_string());

        let err: Error = StorageError::NotInitialized.into();
        let json: serde_json::Value =
            serde_json::from_str(&format_error(&err, OutputFormat::Json)).unwrap();
        assert_eq!(json["type"], "storage");
        assert!(json.get("suggestion").is_none());
    }
}
