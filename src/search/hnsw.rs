//! Approximate cosine index backed by usearch.
//!
//! Only functional with the `usearch-hnsw` feature. Without it the index
//! can be constructed but every mutating or searching call returns
//! `SearchError::FeatureNotEnabled`, and callers use [`super::FlatIndex`].

use crate::error::{Result, SearchError};
use crate::search::{IndexHit, VectorIndex};

#[cfg(feature = "usearch-hnsw")]
use std::collections::HashMap;
#[cfg(feature = "usearch-hnsw")]
use usearch::{Index, IndexOptions, MetricKind, ScalarKind};

const FEATURE: &str = "usearch-hnsw";

/// Initial capacity reserved on the first insertion.
#[cfg(feature = "usearch-hnsw")]
const MIN_RESERVE: usize = 64;

/// HNSW graph parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HnswConfig {
    /// Number of dimensions in the vectors.
    pub dimensions: usize,
    /// Max connections per node (M).
    pub connectivity: usize,
    /// `ef_construction`.
    pub expansion_add: usize,
    /// `ef_search`.
    pub expansion_search: usize,
}

impl Default for HnswConfig {
    fn default() -> Self {
        Self::with_dimensions(crate::embedding::DEFAULT_DIMENSIONS)
    }
}

impl HnswConfig {
    /// Creates a configuration for `dimensions` with default graph parameters.
    #[must_use]
    pub const fn with_dimensions(dimensions: usize) -> Self {
        Self {
            dimensions,
            connectivity: 16,
            expansion_add: 128,
            expansion_search: 64,
        }
    }

    /// Sets the connectivity parameter (M).
    #[must_use]
    pub const fn with_connectivity(mut self, m: usize) -> Self {
        self.connectivity = m;
        self
    }

    /// Sets `ef_construction`.
    #[must_use]
    pub const fn with_expansion_add(mut self, ef: usize) -> Self {
        self.expansion_add = ef;
        self
    }

    /// Sets `ef_search`.
    #[must_use]
    pub const fn with_expansion_search(mut self, ef: usize) -> Self {
        self.expansion_search = ef;
        self
    }

    #[cfg(feature = "usearch-hnsw")]
    fn options(&self) -> IndexOptions {
        IndexOptions {
            dimensions: self.dimensions,
            metric: MetricKind::Cos,
            quantization: ScalarKind::F32,
            connectivity: self.connectivity,
            expansion_add: self.expansion_add,
            expansion_search: self.expansion_search,
            multi: false,
        }
    }
}

/// Approximate nearest-neighbour index keyed by document id.
pub struct HnswIndex {
    config: HnswConfig,
    #[cfg(feature = "usearch-hnsw")]
    inner: Index,
    #[cfg(feature = "usearch-hnsw")]
    by_key: HashMap<u64, i64>,
    #[cfg(feature = "usearch-hnsw")]
    by_document: HashMap<i64, u64>,
    #[cfg(feature = "usearch-hnsw")]
    next_key: u64,
}

// usearch::Index has no Debug impl
#[allow(clippy::missing_fields_in_debug)]
impl std::fmt::Debug for HnswIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut debug_struct = f.debug_struct("HnswIndex");
        debug_struct.field("config", &self.config);
        #[cfg(feature = "usearch-hnsw")]
        debug_struct.field("documents", &self.by_document.len());
        debug_struct.finish()
    }
}

#[cfg(feature = "usearch-hnsw")]
fn index_error(action: &str, e: impl std::fmt::Display) -> crate::Error {
    SearchError::IndexError {
        message: format!("{action}: {e}"),
    }
    .into()
}

#[cfg(not(feature = "usearch-hnsw"))]
fn not_enabled() -> crate::Error {
    SearchError::FeatureNotEnabled {
        feature: FEATURE.to_string(),
    }
    .into()
}

impl HnswIndex {
    /// Returns whether the usearch backend is compiled in.
    #[must_use]
    pub const fn is_available() -> bool {
        cfg!(feature = "usearch-hnsw")
    }

    /// Returns the graph parameters.
    #[must_use]
    pub const fn config(&self) -> &HnswConfig {
        &self.config
    }
}

#[cfg(feature = "usearch-hnsw")]
impl HnswIndex {
    /// Creates an empty index.
    ///
    /// # Errors
    ///
    /// Returns an error if usearch cannot allocate the index.
    pub fn new(config: &HnswConfig) -> Result<Self> {
        let inner = Index::new(&config.options()).map_err(|e| index_error("create index", e))?;
        Ok(Self {
            config: *config,
            inner,
            by_key: HashMap::new(),
            by_document: HashMap::new(),
            next_key: 0,
        })
    }

    /// Checks if a document is indexed.
    #[must_use]
    pub fn contains(&self, document_id: i64) -> bool {
        self.by_document.contains_key(&document_id)
    }

    /// Removes a document's vector. Returns whether it was present.
    ///
    /// # Errors
    ///
    /// Returns an error if usearch fails to remove the key.
    pub fn remove(&mut self, document_id: i64) -> Result<bool> {
        let Some(key) = self.by_document.remove(&document_id) else {
            return Ok(false);
        };
        self.inner
            .remove(key)
            .map_err(|e| index_error("remove vector", e))?;
        self.by_key.remove(&key);
        Ok(true)
    }

    /// Removes every vector.
    ///
    /// # Errors
    ///
    /// Returns an error if usearch fails to reset.
    pub fn clear(&mut self) -> Result<()> {
        self.inner
            .reset()
            .map_err(|e| index_error("reset index", e))?;
        self.by_key.clear();
        self.by_document.clear();
        self.next_key = 0;
        Ok(())
    }

    /// Adds multiple vectors.
    ///
    /// # Errors
    ///
    /// Returns an error on the first failed insertion.
    pub fn add_batch(&mut self, items: &[(i64, Vec<f32>)]) -> Result<usize> {
        self.reserve(self.inner.size() + items.len())?;
        for (document_id, vector) in items {
            self.add(*document_id, vector)?;
        }
        Ok(items.len())
    }

    /// Grows capacity so that `wanted` vectors fit. usearch refuses inserts
    /// beyond the reserved capacity.
    fn reserve(&self, wanted: usize) -> Result<()> {
        let capacity = self.inner.capacity();
        if wanted <= capacity {
            return Ok(());
        }
        let target = wanted.max(capacity * 2).max(MIN_RESERVE);
        self.inner
            .reserve(target)
            .map_err(|e| index_error("reserve capacity", e))
    }

    fn check_dimensions(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.config.dimensions {
            return Err(SearchError::DimensionMismatch {
                expected: self.config.dimensions,
                got: vector.len(),
            }
            .into());
        }
        Ok(())
    }
}

#[cfg(feature = "usearch-hnsw")]
impl VectorIndex for HnswIndex {
    fn backend(&self) -> &'static str {
        FEATURE
    }

    fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    fn len(&self) -> usize {
        self.inner.size()
    }

    fn add(&mut self, document_id: i64, vector: &[f32]) -> Result<()> {
        self.check_dimensions(vector)?;
        self.remove(document_id)?;
        self.reserve(self.inner.size() + 1)?;

        let key = self.next_key;
        self.next_key += 1;
        self.inner
            .add(key, vector)
            .map_err(|e| index_error("add vector", e))?;

        self.by_key.insert(key, document_id);
        self.by_document.insert(document_id, key);
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<IndexHit>> {
        self.check_dimensions(query)?;
        if k == 0 || self.inner.size() == 0 {
            return Ok(Vec::new());
        }

        let matches = self
            .inner
            .search(query, k)
            .map_err(|e| index_error("search", e))?;

        Ok(matches
            .keys
            .iter()
            .zip(matches.distances.iter())
            .filter_map(|(key, distance)| {
                self.by_key.get(key).map(|&document_id| IndexHit {
                    document_id,
                    // Cosine distance
                    score: 1.0 - distance,
                })
            })
            .collect())
    }
}

#[cfg(not(feature = "usearch-hnsw"))]
impl HnswIndex {
    /// Creates an index placeholder; every operation on it fails.
    ///
    /// # Errors
    ///
    /// Never fails without the feature.
    pub const fn new(config: &HnswConfig) -> Result<Self> {
        Ok(Self { config: *config })
    }

    /// Always `false` without the feature.
    #[must_use]
    pub const fn contains(&self, _document_id: i64) -> bool {
        false
    }

    /// Fails with `FeatureNotEnabled`.
    ///
    /// # Errors
    ///
    /// Always.
    pub fn remove(&mut self, _document_id: i64) -> Result<bool> {
        Err(not_enabled())
    }

    /// No-op without the feature.
    ///
    /// # Errors
    ///
    /// Never.
    pub const fn clear(&mut self) -> Result<()> {
        Ok(())
    }

    /// Fails with `FeatureNotEnabled`.
    ///
    /// # Errors
    ///
    /// Always.
    pub fn add_batch(&mut self, _items: &[(i64, Vec<f32>)]) -> Result<usize> {
        Err(not_enabled())
    }
}

#[cfg(not(feature = "usearch-hnsw"))]
impl VectorIndex for HnswIndex {
    fn backend(&self) -> &'static str {
        FEATURE
    }

    fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    fn len(&self) -> usize {
        0
    }

    fn add(&mut self, _document_id: i64, _vector: &[f32]) -> Result<()> {
        Err(not_enabled())
    }

    fn search(&self, _query: &[f32], _k: usize) -> Result<Vec<IndexHit>> {
        Err(not_enabled())
    }
}
