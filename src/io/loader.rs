//! Corpus file loading.
//!
//! A corpus file holds one document per paragraph: documents are separated
//! by one or more blank lines.

use crate::core::{Document, assign_positional_ids};
use crate::error::Result;
use crate::io::read_file;
use std::path::Path;

/// Splits text into paragraph documents.
///
/// Paragraphs are trimmed and internal line breaks are kept. Empty
/// paragraphs are skipped.
#[must_use]
pub fn split_documents(text: &str, source: &str) -> Vec<Document> {
    let mut documents = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            push_paragraph(&mut documents, &mut current, source);
        } else {
            current.push(line.trim_end());
        }
    }
    push_paragraph(&mut documents, &mut current, source);

    assign_positional_ids(&mut documents);
    documents
}

fn push_paragraph(documents: &mut Vec<Document>, lines: &mut Vec<&str>, source: &str) {
    if lines.is_empty() {
        return;
    }
    let paragraph = lines.join("\n");
    lines.clear();
    let paragraph = paragraph.trim();
    if !paragraph.is_empty() {
        documents.push(Document::with_source(paragraph, source));
    }
}

/// Reads a corpus file into documents.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn load_documents<P: AsRef<Path>>(path: P) -> Result<Vec<Document>> {
    let path_ref = path.as_ref();
    let text = read_file(path_ref)?;
    let documents = split_documents(&text, &path_ref.to_string_lossy());
    tracing::debug!(
        path = %path_ref.display(),
        documents = documents.len(),
        "loaded corpus file"
    );
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_split_on_blank_lines() {
        let text = "Premier document.\n\nDeuxième document\nsur deux lignes.\n\n\n\nTroisième.";
        let docs = split_documents(text, "inline");
        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0].content, "Premier document.");
        assert_eq!(docs[1].content, "Deuxième document\nsur deux lignes.");
        assert_eq!(docs[2].content, "Troisième.");
        assert_eq!(docs[2].id, Some(2));
        assert_eq!(docs[0].source.as_deref(), Some("inline"));
    }

    #[test]
    fn test_split_whitespace_only() {
        assert!(split_documents("   \n\n \t \n", "x").is_empty());
        assert!(split_documents("", "x").is_empty());
    }

    #[test]
    fn test_split_crlf() {
        let docs = split_documents("a\r\n\r\nb\r\n", "x");
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1].content, "b");
    }

    #[test]
    fn test_load_documents() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("corpus.txt");
        std::fs::write(&path, "alpha\n\nbeta\n").unwrap();

        let docs = load_documents(&path).unwrap();
        assert_eq!(docs.len(), 2);
        assert!(docs[0].source.as_deref().unwrap().ends_with("corpus.txt"));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(load_documents("/nonexistent/corpus.txt").is_err());
    }
}
