//! Built-in sample corpus.

use crate::core::Document;

/// Source label for the built-in documents.
pub const BUILTIN_SOURCE: &str = "builtin";

const SAMPLE_TEXTS: [&str; 5] = [
    "L'intelligence artificielle est un domaine de la science informatique qui se concentre sur la création de machines capables d'imiter l'intelligence humaine.",
    "Le deep learning est une sous-catégorie du machine learning qui utilise des réseaux de neurones artificiels avec plusieurs couches.",
    "Les transformers sont une architecture de réseau de neurones introduite par Google en 2017 qui a révolutionné le traitement du langage naturel.",
    "LangChain est un framework qui permet de développer des applications alimentées par des modèles de langage.",
    "Le RAG, ou Retrieval Augmented Generation, combine la récupération d'informations à partir d'une base de connaissances avec la génération de texte par un LLM.",
];

/// Returns the five sample documents with positional ids `0..5`.
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub fn sample_documents() -> Vec<Document> {
    SAMPLE_TEXTS
        .iter()
        .enumerate()
        .map(|(i, text)| Document::with_source(*text, BUILTIN_SOURCE).with_id(i as i64))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_documents() {
        let docs = sample_documents();
        assert_eq!(docs.len(), 5);
        assert_eq!(docs[0].id, Some(0));
        assert_eq!(docs[4].id, Some(4));
        assert!(docs[4].content.starts_with("Le RAG"));
        assert!(docs.iter().all(|d| d.source.as_deref() == Some(BUILTIN_SOURCE)));
    }

    #[test]
    fn test_sample_documents_unique() {
        let docs = sample_documents();
        let mut hashes: Vec<&str> = docs.iter().map(|d| d.content_hash.as_str()).collect();
        hashes.sort_unstable();
        hashes.dedup();
        assert_eq!(hashes.len(), docs.len());
    }
}
