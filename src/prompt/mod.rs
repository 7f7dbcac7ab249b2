//! Prompt construction.
//!
//! Retrieved documents are joined into a context block and substituted,
//! together with the question, into a [`PromptTemplate`].

mod template;

pub use template::{
    CONTEXT_VARIABLE, DEFAULT_RAG_TEMPLATE, PromptTemplate, QUESTION_VARIABLE, TEMPLATE_ENV_VAR,
};

use crate::search::SearchResult;

/// Separator placed between documents in the context block.
pub const DOCUMENT_SEPARATOR: &str = "\n\n";

/// Joins the contents of retrieved documents with a blank line.
#[must_use]
pub fn format_docs(results: &[SearchResult]) -> String {
    results
        .iter()
        .map(|r| r.content.as_str())
        .collect::<Vec<_>>()
        .join(DOCUMENT_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(id: i64, content: &str) -> SearchResult {
        SearchResult {
            id,
            content: content.to_string(),
            source: None,
            score: 0.5,
        }
    }

    #[test]
    fn test_format_docs() {
        let docs = [result(0, "premier"), result(1, "second")];
        assert_eq!(format_docs(&docs), "premier\n\nsecond");
    }

    #[test]
    fn test_format_docs_empty() {
        assert_eq!(format_docs(&[]), "");
    }
}
