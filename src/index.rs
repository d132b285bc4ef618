//! In-memory nearest-neighbor index over knowledge chunks.
//!
//! Brute-force cosine similarity over all stored vectors; the corpus is
//! one document's worth of chunks, so there is nothing to gain from an
//! approximate structure. The index is immutable after construction and
//! safely shared read-concurrently across sessions; rebuilding means full
//! reconstruction.

use anyhow::{bail, Result};

use crate::models::KnowledgeChunk;

struct IndexEntry {
    chunk: KnowledgeChunk,
    vector: Vec<f32>,
}

/// Immutable vector index built once at pipeline startup.
pub struct KnowledgeIndex {
    entries: Vec<IndexEntry>,
}

/// A retrieved chunk with its similarity score.
pub struct ScoredChunk<'a> {
    pub chunk: &'a KnowledgeChunk,
    pub score: f32,
}

impl KnowledgeIndex {
    /// Build the index from parallel chunk and vector lists.
    pub fn new(chunks: Vec<KnowledgeChunk>, vectors: Vec<Vec<f32>>) -> Result<Self> {
        if chunks.len() != vectors.len() {
            bail!(
                "chunk/vector count mismatch: {} chunks, {} vectors",
                chunks.len(),
                vectors.len()
            );
        }
        let entries = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexEntry { chunk, vector })
            .collect();
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return the `k` nearest chunks by cosine similarity, best first.
    pub fn search(&self, query_vec: &[f32], k: usize) -> Vec<ScoredChunk<'_>> {
        let mut scored: Vec<ScoredChunk<'_>> = self
            .entries
            .iter()
            .map(|e| ScoredChunk {
                chunk: &e.chunk,
                score: cosine_similarity(query_vec, &e.vector),
            })
            .collect();
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);
        scored
    }
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`. Returns `0.0` for empty vectors or
/// vectors of different lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_chunk(index: usize, text: &str) -> KnowledgeChunk {
        KnowledgeChunk {
            index,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_cosine_identical() {
        let v = vec![1.0, 2.0, 3.0];
        let sim = cosine_similarity(&v, &v);
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_empty_and_mismatched() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
    }

    #[test]
    fn test_search_orders_by_similarity() {
        let chunks = vec![
            make_chunk(0, "refund policy"),
            make_chunk(1, "shipping times"),
            make_chunk(2, "warranty terms"),
        ];
        let vectors = vec![
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.7, 0.7, 0.0],
        ];
        let index = KnowledgeIndex::new(chunks, vectors).unwrap();

        let results = index.search(&[1.0, 0.0, 0.0], 2);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.index, 0);
        assert_eq!(results[1].chunk.index, 2);
        assert!(results[0].score > results[1].score);
    }

    #[test]
    fn test_search_truncates_to_k() {
        let chunks = (0..10).map(|i| make_chunk(i, "text")).collect::<Vec<_>>();
        let vectors = (0..10).map(|i| vec![i as f32, 1.0]).collect::<Vec<_>>();
        let index = KnowledgeIndex::new(chunks, vectors).unwrap();

        assert_eq!(index.search(&[1.0, 0.0], 3).len(), 3);
        assert_eq!(index.search(&[1.0, 0.0], 50).len(), 10);
    }

    #[test]
    fn test_mismatched_lengths_rejected() {
        let chunks = vec![make_chunk(0, "a")];
        assert!(KnowledgeIndex::new(chunks, vec![]).is_err());
    }
}
