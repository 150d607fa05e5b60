//! PDFChat Vector - Embeddings and in-memory nearest-neighbor search
//!
//! A `VectorIndex` owns the (chunk, embedding) pairs of one document and
//! answers top-k similarity queries. It lives only as long as the session
//! that built it.

use pdfchat_core::{DistanceMetric, PdfChatError, Result, ScoredChunk, TextChunk};
pub mod embedding;

pub use embedding::{EmbeddingClient, OpenAiEmbedding};

/// A chunk together with its embedding
#[derive(Debug, Clone)]
pub struct IndexedChunk {
    pub chunk: TextChunk,
    pub vector: Vec<f32>,
}

/// In-memory vector index for a single document
#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    metric: DistanceMetric,
    dimension: Option<usize>,
    entries: Vec<IndexedChunk>,
}

impl VectorIndex {
    /// Create an empty index
    pub fn new(metric: DistanceMetric) -> Self {
        Self {
            metric,
            dimension: None,
            entries: Vec::new(),
        }
    }

    /// Insert a chunk with its embedding.
    ///
    /// The first vector fixes the index dimension; later vectors must match it.
    pub fn insert(&mut self, chunk: TextChunk, vector: Vec<f32>) -> Result<()> {
        if vector.is_empty() {
            return Err(PdfChatError::IndexError(format!(
                "Empty embedding for chunk {}",
                chunk.index
            )));
        }

        match self.dimension {
            Some(dim) if dim != vector.len() => {
                return Err(PdfChatError::IndexError(format!(
                    "Dimension mismatch for chunk {}: expected {dim}, got {}",
                    chunk.index,
                    vector.len()
                )));
            }
            Some(_) => {}
            None => self.dimension = Some(vector.len()),
        }

        self.entries.push(IndexedChunk { chunk, vector });
        Ok(())
    }

    /// Search for the `k` chunks most similar to `query`.
    ///
    /// Results are ordered by descending score, ties by chunk order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        if let Some(dim) = self.dimension {
            if dim != query.len() {
                return Err(PdfChatError::IndexError(format!(
                    "Query dimension {} does not match index dimension {dim}",
                    query.len()
                )));
            }
        }

        let mut scored: Vec<ScoredChunk> = self
            .entries
            .iter()
            .map(|entry| ScoredChunk {
                chunk: entry.chunk.clone(),
                score: score(self.metric, query, &entry.vector),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.chunk.index.cmp(&b.chunk.index))
        });
        scored.truncate(k);

        tracing::debug!(
            candidates = self.entries.len(),
            returned = scored.len(),
            metric = ?self.metric,
            "Vector search completed"
        );
        Ok(scored)
    }

    /// Number of indexed chunks
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Embedding dimension, once the first vector is inserted
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Indexed chunks in insertion order
    pub fn chunks(&self) -> impl Iterator<Item = &TextChunk> {
        self.entries.iter().map(|e| &e.chunk)
    }
}

/// Similarity score for a metric; higher is more similar.
///
/// Vectors with NaN components score `-inf` so they rank last.
pub fn score(metric: DistanceMetric, a: &[f32], b: &[f32]) -> f32 {
    let value = match metric {
        DistanceMetric::Cosine => cosine_similarity(a, b),
        DistanceMetric::Euclidean => 1.0 / (1.0 + euclidean_distance(a, b)),
    };
    if value.is_nan() {
        f32::NEG_INFINITY
    } else {
        value
    }
}

/// Cosine similarity; zero-norm vectors score 0
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom <= f64::EPSILON {
        return 0.0;
    }
    (dot / denom) as f32
}

/// Euclidean (L2) distance
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let d = f64::from(x) - f64::from(y);
            d * d
        })
        .sum::<f64>()
        .sqrt() as f32
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(index: u32, content: &str) -> TextChunk {
        TextChunk {
            index,
            content: content.to_string(),
            start_offset: 0,
            end_offset: content.chars().count(),
            overlap: 0,
        }
    }

    fn sample_index(metric: DistanceMetric) -> VectorIndex {
        let mut index = VectorIndex::new(metric);
        index.insert(chunk(0, "north"), vec![0.0, 1.0]).unwrap();
        index.insert(chunk(1, "east"), vec![1.0, 0.0]).unwrap();
        index.insert(chunk(2, "north-east"), vec![0.7, 0.7]).unwrap();
        index.insert(chunk(3, "south"), vec![0.0, -1.0]).unwrap();
        index
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_euclidean_score() {
        assert!((score(DistanceMetric::Euclidean, &[1.0, 1.0], &[1.0, 1.0]) - 1.0).abs() < 1e-6);
        assert!((euclidean_distance(&[0.0, 0.0], &[3.0, 4.0]) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_search_returns_top_k_descending() {
        let index = sample_index(DistanceMetric::Cosine);
        let results = index.search(&[0.1, 1.0], 3).unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].chunk.content, "north");
        assert_eq!(results[1].chunk.content, "north-east");
        assert_eq!(results[2].chunk.content, "east");
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_search_with_euclidean_metric() {
        let index = sample_index(DistanceMetric::Euclidean);
        let results = index.search(&[0.0, -0.9], 1).unwrap();
        assert_eq!(results[0].chunk.content, "south");
    }

    #[test]
    fn test_search_small_index_returns_all() {
        let mut index = VectorIndex::new(DistanceMetric::Cosine);
        index.insert(chunk(0, "only"), vec![1.0, 0.0]).unwrap();

        let results = index.search(&[1.0, 0.0], 3).unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_ties_keep_document_order() {
        let mut index = VectorIndex::new(DistanceMetric::Cosine);
        index.insert(chunk(0, "first"), vec![1.0, 0.0]).unwrap();
        index.insert(chunk(1, "second"), vec![2.0, 0.0]).unwrap();

        let results = index.search(&[1.0, 0.0], 2).unwrap();
        assert_eq!(results[0].chunk.index, 0);
        assert_eq!(results[1].chunk.index, 1);
    }

    #[test]
    fn test_nan_vectors_rank_last() {
        for metric in [DistanceMetric::Cosine, DistanceMetric::Euclidean] {
            let mut index = VectorIndex::new(metric);
            index.insert(chunk(0, "broken"), vec![f32::NAN, 1.0]).unwrap();
            index.insert(chunk(1, "east"), vec![1.0, 0.0]).unwrap();
            index.insert(chunk(2, "north"), vec![0.0, 1.0]).unwrap();

            let results = index.search(&[0.1, 1.0], 3).unwrap();
            let order: Vec<&str> = results.iter().map(|r| r.chunk.content.as_str()).collect();
            assert_eq!(order, vec!["north", "east", "broken"]);
            assert_eq!(results[2].score, f32::NEG_INFINITY);
        }
    }

    #[test]
    fn test_dimension_mismatch_is_rejected() {
        let mut index = VectorIndex::new(DistanceMetric::Cosine);
        index.insert(chunk(0, "a"), vec![1.0, 0.0]).unwrap();

        assert!(index.insert(chunk(1, "b"), vec![1.0, 0.0, 0.0]).is_err());
        assert!(index.insert(chunk(1, "b"), Vec::new()).is_err());
        assert!(index.search(&[1.0], 3).is_err());
        assert_eq!(index.len(), 1);
        assert_eq!(index.dimension(), Some(2));
    }

    #[test]
    fn test_empty_index_search() {
        let index = VectorIndex::default();
        assert!(index.is_empty());
        assert!(index.search(&[1.0, 2.0], 3).unwrap().is_empty());
    }
}
