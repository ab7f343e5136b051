//! Vector index abstraction for document chunks.
//!
//! Defines a trait for backend-agnostic vector storage and retrieval.

use crate::types::{DocumentChunk, ScoredChunk};
use flashcards_core::AppResult;

/// Trait for vector index backends.
#[async_trait::async_trait]
pub trait VectorIndex: Send + Sync {
    /// Append embedded chunks to the index.
    ///
    /// Every chunk must carry an embedding of the index dimension.
    async fn add_chunks(&mut self, chunks: &[DocumentChunk]) -> AppResult<()>;

    /// Search for the top-k most similar chunks to the query embedding.
    ///
    /// Returns chunks ordered by descending cosine similarity.
    async fn search(&self, query_embedding: &[f32], top_k: usize) -> AppResult<Vec<ScoredChunk>>;

    /// Number of chunks stored.
    async fn count(&self) -> AppResult<usize>;
}

/// Calculate cosine similarity between two vectors.
///
/// Returns 0.0 for vectors of different length or zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
