//! Vector indexing and similarity retrieval.
//!
//! A [`VectorStore`] holds the corpus, its embeddings and a [`VectorIndex`].
//! The index backend is [`FlatIndex`] (exact cosine) unless the
//! `usearch-hnsw` feature selects [`HnswIndex`].

mod flat;
mod hnsw;

pub use flat::FlatIndex;
pub use hnsw::{HnswConfig, HnswIndex};

use crate::core::{Document, assign_positional_ids};
use crate::embedding::Embedder;
use crate::error::{EmbeddingError, Result, SearchError, StorageError};
use crate::storage::{METADATA_DIMENSIONS, METADATA_EMBEDDING_MODEL, SqliteStorage, Storage};
use serde::Serialize;
use std::collections::HashMap;

/// Default number of documents retrieved per query.
pub const DEFAULT_TOP_K: usize = 2;

/// Raw hit returned by an index: a document id and its cosine similarity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexHit {
    /// Indexed document id.
    pub document_id: i64,
    /// Cosine similarity, higher is closer.
    pub score: f32,
}

/// Nearest-neighbour index over document vectors.
pub trait VectorIndex {
    /// Short backend name for diagnostics.
    fn backend(&self) -> &'static str;

    /// Vector size accepted by the index.
    fn dimensions(&self) -> usize;

    /// Number of indexed vectors.
    fn len(&self) -> usize;

    /// Whether the index holds no vectors.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Indexes `vector` under `document_id`, replacing any previous vector.
    ///
    /// # Errors
    ///
    /// Returns an error on dimension mismatch or backend failure.
    fn add(&mut self, document_id: i64, vector: &[f32]) -> Result<()>;

    /// Returns up to `k` hits, best first.
    ///
    /// # Errors
    ///
    /// Returns an error on dimension mismatch or backend failure.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<IndexHit>>;
}

/// Creates the index backend compiled into this build.
///
/// # Errors
///
/// Returns an error if the approximate backend cannot be allocated.
pub fn default_index(dimensions: usize) -> Result<Box<dyn VectorIndex>> {
    if HnswIndex::is_available() {
        Ok(Box::new(HnswIndex::new(&HnswConfig::with_dimensions(
            dimensions,
        ))?))
    } else {
        Ok(Box::new(FlatIndex::new(dimensions)))
    }
}

/// Name of the index backend compiled into this build.
#[must_use]
pub const fn backend_name() -> &'static str {
    if HnswIndex::is_available() {
        "usearch-hnsw"
    } else {
        "flat"
    }
}

/// A retrieved document with its similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    /// Document id.
    pub id: i64,
    /// Document text.
    pub content: String,
    /// Where the document came from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Cosine similarity to the query.
    pub score: f32,
}

/// Retrieval parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchConfig {
    /// Maximum number of results to return.
    pub top_k: usize,
    /// Minimum similarity a result must reach, if any.
    pub similarity_threshold: Option<f32>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            similarity_threshold: None,
        }
    }
}

impl SearchConfig {
    /// Creates a search config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the top-k limit.
    #[must_use]
    pub const fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Sets the minimum similarity.
    #[must_use]
    pub const fn with_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = Some(threshold);
        self
    }
}

/// Corpus, embeddings and index, queried through an embedder.
///
/// # Examples
///
/// ```
/// use ragpipe::core::sample_documents;
/// use ragpipe::embedding::{FallbackEmbedder, DEFAULT_DIMENSIONS};
/// use ragpipe::search::VectorStore;
///
/// let embedder = FallbackEmbedder::new(DEFAULT_DIMENSIONS);
/// let store = VectorStore::from_documents(sample_documents(), &embedder).unwrap();
/// let results = store.similarity_search("Qu'est-ce que le RAG?", 2).unwrap();
/// assert_eq!(results.len(), 2);
/// ```
pub struct VectorStore<'e> {
    embedder: &'e dyn Embedder,
    documents: Vec<Document>,
    embeddings: Vec<Vec<f32>>,
    positions: HashMap<i64, usize>,
    index: Box<dyn VectorIndex>,
}

impl std::fmt::Debug for VectorStore<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorStore")
            .field("model", &self.embedder.model_name())
            .field("documents", &self.documents.len())
            .field("backend", &self.index.backend())
            .finish_non_exhaustive()
    }
}

impl<'e> VectorStore<'e> {
    /// Embeds `documents` in one batch and indexes them.
    ///
    /// Documents without an id get their position in the list.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding or indexing fails.
    pub fn from_documents(mut documents: Vec<Document>, embedder: &'e dyn Embedder) -> Result<Self> {
        assign_positional_ids(&mut documents);

        let texts: Vec<&str> = documents.iter().map(|d| d.content.as_str()).collect();
        let started = std::time::Instant::now();
        let embeddings = embedder.embed_batch(&texts)?;
        tracing::info!(
            documents = documents.len(),
            model = embedder.model_name(),
            elapsed_ms = started.elapsed().as_millis(),
            "embedded corpus"
        );

        Self::from_parts(documents, embeddings, embedder)
    }

    /// Rebuilds a store from a persisted collection without re-embedding.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection is not initialized, was built with
    /// another embedding model or dimension, or has documents without vectors.
    pub fn from_storage(storage: &SqliteStorage, embedder: &'e dyn Embedder) -> Result<Self> {
        if !storage.is_initialized()? {
            return Err(StorageError::NotInitialized.into());
        }

        if let Some(stored) = storage.get_metadata(METADATA_EMBEDDING_MODEL)?
            && stored != embedder.model_name()
        {
            return Err(EmbeddingError::ModelMismatch {
                stored,
                current: embedder.model_name().to_string(),
            }
            .into());
        }

        if let Some(stored) = storage.get_metadata(METADATA_DIMENSIONS)? {
            let got: usize = stored.parse().map_err(|_| StorageError::InvalidMetadata {
                key: METADATA_DIMENSIONS.to_string(),
                value: stored.clone(),
            })?;
            if got != embedder.dimensions() {
                return Err(SearchError::DimensionMismatch {
                    expected: embedder.dimensions(),
                    got,
                }
                .into());
            }
        }

        let documents = storage.list_documents()?;
        let mut vectors: HashMap<i64, Vec<f32>> =
            storage.get_all_embeddings()?.into_iter().collect();

        let embeddings: Vec<Vec<f32>> = documents
            .iter()
            .filter_map(|d| d.id.and_then(|id| vectors.remove(&id)))
            .collect();
        if embeddings.len() != documents.len() {
            return Err(SearchError::EmbeddingCountMismatch {
                documents: documents.len(),
                embeddings: embeddings.len(),
            }
            .into());
        }

        tracing::debug!(documents = documents.len(), "loaded persisted collection");
        Self::from_parts(documents, embeddings, embedder)
    }

    fn from_parts(
        documents: Vec<Document>,
        embeddings: Vec<Vec<f32>>,
        embedder: &'e dyn Embedder,
    ) -> Result<Self> {
        if embeddings.len() != documents.len() {
            return Err(SearchError::EmbeddingCountMismatch {
                documents: documents.len(),
                embeddings: embeddings.len(),
            }
            .into());
        }

        let mut index = default_index(embedder.dimensions())?;
        let mut positions = HashMap::with_capacity(documents.len());
        for (position, (doc, vector)) in documents.iter().zip(&embeddings).enumerate() {
            let id = doc.id.unwrap_or_default();
            index.add(id, vector)?;
            positions.insert(id, position);
        }
        tracing::debug!(backend = index.backend(), size = index.len(), "built index");

        Ok(Self {
            embedder,
            documents,
            embeddings,
            positions,
            index,
        })
    }

    /// Indexed documents in corpus order.
    #[must_use]
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Embeddings aligned with [`VectorStore::documents`].
    #[must_use]
    pub fn embeddings(&self) -> &[Vec<f32>] {
        &self.embeddings
    }

    /// Embedder used for documents and queries.
    #[must_use]
    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder
    }

    /// Number of indexed documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Name of the index backend.
    #[must_use]
    pub fn backend(&self) -> &'static str {
        self.index.backend()
    }

    /// Returns the `k` documents most similar to `query`, best first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query is empty or cannot be embedded.
    pub fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        if query.trim().is_empty() {
            return Err(SearchError::EmptyQuery.into());
        }
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed(query)?;
        let hits = self.index.search(&query_vector, k.min(self.len()))?;
        tracing::debug!(k, hits = hits.len(), "similarity search");

        Ok(hits
            .into_iter()
            .filter_map(|hit| {
                let doc = &self.documents[*self.positions.get(&hit.document_id)?];
                Some(SearchResult {
                    id: hit.document_id,
                    content: doc.content.clone(),
                    source: doc.source.clone(),
                    score: hit.score,
                })
            })
            .collect())
    }

    /// Like [`VectorStore::similarity_search`], dropping results below the
    /// configured threshold.
    ///
    /// # Errors
    ///
    /// Returns an error if the query is empty or cannot be embedded.
    pub fn similarity_search_with_threshold(
        &self,
        query: &str,
        config: &SearchConfig,
    ) -> Result<Vec<SearchResult>> {
        let mut results = self.similarity_search(query, config.top_k)?;
        if let Some(threshold) = config.similarity_threshold {
            results.retain(|r| r.score >= threshold);
        }
        Ok(results)
    }

    /// Returns a retriever over this store fetching `k` documents.
    #[must_use]
    pub fn as_retriever(&self, k: usize) -> Retriever<'_> {
        Retriever {
            store: self,
            config: SearchConfig::new().with_top_k(k),
        }
    }
}

/// Fetches context documents for a question.
#[derive(Debug, Clone, Copy)]
pub struct Retriever<'a> {
    store: &'a VectorStore<'a>,
    config: SearchConfig,
}

impl<'a> Retriever<'a> {
    /// Creates a retriever with explicit parameters.
    #[must_use]
    pub const fn new(store: &'a VectorStore<'a>, config: SearchConfig) -> Self {
        Self { store, config }
    }

    /// Retrieval parameters.
    #[must_use]
    pub const fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Returns the documents relevant to `query`, best first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query is empty or cannot be embedded.
    pub fn get_relevant_documents(&self, query: &str) -> Result<Vec<SearchResult>> {
        self.store
            .similarity_search_with_threshold(query, &self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Document, sample_documents};
    use crate::embedding::{DEFAULT_DIMENSIONS, FallbackEmbedder};
    use crate::storage::persist_collection;

    fn embedder() -> FallbackEmbedder {
        FallbackEmbedder::new(DEFAULT_DIMENSIONS)
    }

    #[test]
    fn test_from_documents_assigns_ids() {
        let embedder = embedder();
        let docs = vec![Document::new("premier"), Document::new("second")];
        let store = VectorStore::from_documents(docs, &embedder).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.documents()[1].id, Some(1));
        assert_eq!(store.embeddings().len(), 2);
    }

    #[test]
    fn test_exact_text_ranks_first() {
        let embedder = embedder();
        let docs = sample_documents();
        let store = VectorStore::from_documents(docs.clone(), &embedder).unwrap();

        let results = store.similarity_search(&docs[2].content, 2).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, 2);
        assert!(results[0].score >= results[1].score);
        assert!((results[0].score - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_k_bounds() {
        let embedder = embedder();
        let store = VectorStore::from_documents(sample_documents(), &embedder).unwrap();
        assert_eq!(store.similarity_search("RAG", 100).unwrap().len(), 5);
        assert!(store.similarity_search("RAG", 0).unwrap().is_empty());
    }

    #[test]
    fn test_empty_query_rejected() {
        let embedder = embedder();
        let store = VectorStore::from_documents(sample_documents(), &embedder).unwrap();
        let err = store.similarity_search("   ", 2).unwrap_err();
        assert!(err.to_string().contains("query must not be empty"));
    }

    #[test]
    fn test_empty_store() {
        let embedder = embedder();
        let store = VectorStore::from_documents(Vec::new(), &embedder).unwrap();
        assert!(store.is_empty());
        assert!(store.similarity_search("RAG", 2).unwrap().is_empty());
    }

    #[test]
    fn test_threshold_filters() {
        let embedder = embedder();
        let docs = sample_documents();
        let store = VectorStore::from_documents(docs.clone(), &embedder).unwrap();

        let config = SearchConfig::new().with_top_k(5).with_threshold(0.99);
        let results = store
            .similarity_search_with_threshold(&docs[0].content, &config)
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, 0);
    }

    #[test]
    fn test_retriever_defaults() {
        let embedder = embedder();
        let store = VectorStore::from_documents(sample_documents(), &embedder).unwrap();
        let retriever = store.as_retriever(DEFAULT_TOP_K);
        assert_eq!(retriever.config().top_k, 2);
        assert!(retriever.config().similarity_threshold.is_none());
        assert_eq!(
            retriever.get_relevant_documents("Qu'est-ce que le RAG?").unwrap().len(),
            2
        );
    }

    #[test]
    fn test_from_storage_round_trip() {
        let embedder = embedder();
        let store = VectorStore::from_documents(sample_documents(), &embedder).unwrap();

        let mut storage = SqliteStorage::in_memory().unwrap();
        storage.init().unwrap();
        persist_collection(
            &mut storage,
            store.documents(),
            store.embeddings(),
            embedder.model_name(),
        )
        .unwrap();

        let reloaded = VectorStore::from_storage(&storage, &embedder).unwrap();
        assert_eq!(reloaded.len(), 5);

        let query = &sample_documents()[3].content;
        let before = store.similarity_search(query, 1).unwrap();
        let after = reloaded.similarity_search(query, 1).unwrap();
        assert_eq!(before[0].content, after[0].content);
    }

    #[test]
    fn test_from_storage_model_mismatch() {
        struct Other;
        impl Embedder for Other {
            fn dimensions(&self) -> usize {
                DEFAULT_DIMENSIONS
            }
            fn model_name(&self) -> &str {
                "other-model"
            }
            fn embed(&self, text: &str) -> Result<Vec<f32>> {
                FallbackEmbedder::new(DEFAULT_DIMENSIONS).embed(text)
            }
        }

        let embedder = embedder();
        let store = VectorStore::from_documents(sample_documents(), &embedder).unwrap();
        let mut storage = SqliteStorage::in_memory().unwrap();
        storage.init().unwrap();
        persist_collection(
            &mut storage,
            store.documents(),
            store.embeddings(),
            embedder.model_name(),
        )
        .unwrap();

        let err = VectorStore::from_storage(&storage, &Other).unwrap_err();
        assert!(err.to_string().contains("model mismatch"));
    }

    fn persisted_samples(embedder: &FallbackEmbedder) -> SqliteStorage {
        let store = VectorStore::from_documents(sample_documents(), embedder).unwrap();
        let mut storage = SqliteStorage::in_memory().unwrap();
        storage.init().unwrap();
        persist_collection(
            &mut storage,
            store.documents(),
            store.embeddings(),
            embedder.model_name(),
        )
        .unwrap();
        storage
    }

    #[test]
    fn test_from_storage_dimension_mismatch() {
        let embedder = embedder();
        let mut storage = persisted_samples(&embedder);
        storage.set_metadata(METADATA_DIMENSIONS, "768").unwrap();

        let err = VectorStore::from_storage(&storage, &embedder).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Search(SearchError::DimensionMismatch {
                expected: DEFAULT_DIMENSIONS,
                got: 768,
            })
        ));
    }

    #[test]
    fn test_from_storage_corrupt_dimensions() {
        let embedder = embedder();
        let mut storage = persisted_samples(&embedder);
        storage.set_metadata(METADATA_DIMENSIONS, "abc").unwrap();

        let err = VectorStore::from_storage(&storage, &embedder).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Storage(StorageError::InvalidMetadata { ref value, .. }) if value == "abc"
        ));
        assert!(err.to_string().contains("\"abc\""));
    }

    #[test]
    fn test_from_storage_uninitialized() {
        let storage = SqliteStorage::in_memory().unwrap();
        let embedder = embedder();
        assert!(VectorStore::from_storage(&storage, &embedder).is_err());
    }

    #[test]
    fn test_backend_name_matches_index() {
        let index = default_index(4).unwrap();
        assert_eq!(index.backend(), backend_name());
    }
}
