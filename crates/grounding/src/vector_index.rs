//! Vector index abstraction.
//!
//! Relevance scoring belongs to the backend; callers only see passages in
//! the order the index ranked them.

use crate::filter::SourceFilter;
use crate::types::RetrievedDocument;
use async_trait::async_trait;
use codelogic_core::AppResult;

/// Read-only similarity search over an already populated corpus.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Backend name for logs (e.g. "pinecone").
    fn backend_name(&self) -> &str;

    /// Top-`k` passages most similar to `vector` among those `filter` admits,
    /// most relevant first.
    async fn similarity_search_with_filter(
        &self,
        vector: &[f32],
        filter: &SourceFilter,
        k: usize,
    ) -> AppResult<Vec<RetrievedDocument>>;
}

/// Calculate cosine similarity between two vectors.
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }
}
