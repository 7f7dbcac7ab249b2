//! Exact cosine index.
//!
//! Scores every stored vector against the query. Suitable for small corpora
//! and as the reference behavior for the approximate backend.

use crate::embedding::cosine_similarity;
use crate::error::{Result, SearchError};
use crate::search::{IndexHit, VectorIndex};

/// Brute-force cosine similarity index.
///
/// # Examples
///
/// ```
/// use ragpipe::search::{FlatIndex, VectorIndex};
///
/// let mut index = FlatIndex::new(2);
/// index.add(1, &[1.0, 0.0]).unwrap();
/// index.add(2, &[0.0, 1.0]).unwrap();
///
/// let hits = index.search(&[0.9, 0.1], 1).unwrap();
/// assert_eq!(hits[0].document_id, 1);
/// ```
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dimensions: usize,
    entries: Vec<(i64, Vec<f32>)>,
}

impl FlatIndex {
    /// Creates an empty index for vectors of `dimensions` components.
    #[must_use]
    pub const fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            entries: Vec::new(),
        }
    }

    /// Adds multiple vectors.
    ///
    /// # Errors
    ///
    /// Returns an error on the first vector with the wrong dimensions.
    pub fn add_batch(&mut self, items: &[(i64, Vec<f32>)]) -> Result<usize> {
        for (document_id, vector) in items {
            self.add(*document_id, vector)?;
        }
        Ok(items.len())
    }

    /// Checks if a document is indexed.
    #[must_use]
    pub fn contains(&self, document_id: i64) -> bool {
        self.position(document_id).is_some()
    }

    /// Removes a document's vector. Returns whether it was present.
    pub fn remove(&mut self, document_id: i64) -> bool {
        match self.position(document_id) {
            Some(pos) => {
                self.entries.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Removes every vector.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn position(&self, document_id: i64) -> Option<usize> {
        self.entries.iter().position(|(id, _)| *id == document_id)
    }

    fn check_dimensions(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimensions {
            return Err(SearchError::DimensionMismatch {
                expected: self.dimensions,
                got: vector.len(),
            }
            .into());
        }
        Ok(())
    }
}

impl VectorIndex for FlatIndex {
    fn backend(&self) -> &'static str {
        "flat"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    /// Re-adding an indexed document replaces its vector in place, so it
    /// keeps its original insertion rank.
    fn add(&mut self, document_id: i64, vector: &[f32]) -> Result<()> {
        self.check_dimensions(vector)?;

        match self.position(document_id) {
            Some(pos) => self.entries[pos].1 = vector.to_vec(),
            None => self.entries.push((document_id, vector.to_vec())),
        }
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<IndexHit>> {
        self.check_dimensions(query)?;

        if k == 0 || self.entries.is_empty() {
            return Ok(Vec::new());
        }

        let mut hits: Vec<IndexHit> = self
            .entries
            .iter()
            .map(|(document_id, vector)| IndexHit {
                document_id: *document_id,
                score: cosine_similarity(query, vector),
            })
            .collect();

        // Stable sort: equal scores stay in insertion order
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);

        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> FlatIndex {
        let mut index = FlatIndex::new(3);
        index
            .add_batch(&[
                (10, vec![1.0, 0.0, 0.0]),
                (11, vec![0.0, 1.0, 0.0]),
                (12, vec![0.7, 0.7, 0.0]),
            ])
            .unwrap();
        index
    }

    #[test]
    fn test_search_orders_by_similarity() {
        let index = sample_index();
        let hits = index.search(&[1.0, 0.1, 0.0], 3).unwrap();
        let ids: Vec<i64> = hits.iter().map(|h| h.document_id).collect();
        assert_eq!(ids, vec![10, 12, 11]);
        assert!(hits[0].score >= hits[1].score);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let mut index = FlatIndex::new(2);
        index.add(5, &[1.0, 0.0]).unwrap();
        index.add(3, &[1.0, 0.0]).unwrap();
        index.add(4, &[1.0, 0.0]).unwrap();

        let hits = index.search(&[1.0, 0.0], 3).unwrap();
        let ids: Vec<i64> = hits.iter().map(|h| h.document_id).collect();
        assert_eq!(ids, vec![5, 3, 4]);
    }

    #[test]
    fn test_k_larger_than_corpus() {
        let index = sample_index();
        assert_eq!(index.search(&[1.0, 0.0, 0.0], 50).unwrap().len(), 3);
    }

    #[test]
    fn test_k_zero() {
        let index = sample_index();
        assert!(index.search(&[1.0, 0.0, 0.0], 0).unwrap().is_empty());
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut index = FlatIndex::new(3);
        assert!(index.add(1, &[1.0, 0.0]).is_err());
        assert!(index.search(&[1.0], 1).is_err());
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut index = sample_index();
        index.add(10, &[0.0, 1.0, 0.0]).unwrap();
        assert_eq!(index.len(), 3);

        let hits = index.search(&[0.0, 1.0, 0.0], 2).unwrap();
        assert_eq!(hits[0].document_id, 10);
        assert_eq!(hits[1].document_id, 11);
    }

    #[test]
    fn test_remove_and_clear() {
        let mut index = sample_index();
        assert!(index.remove(11));
        assert!(!index.remove(11));
        assert!(!index.contains(11));
        assert_eq!(index.len(), 2);

        index.clear();
        assert!(index.is_empty());
    }
}
