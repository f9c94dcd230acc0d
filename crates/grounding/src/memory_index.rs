//! In-process vector index.

use crate::embeddings::EmbeddingProvider;
use crate::filter::SourceFilter;
use crate::types::RetrievedDocument;
use crate::vector_index::{cosine_similarity, VectorIndex};
use async_trait::async_trait;
use codelogic_core::{AppError, AppResult};

/// Brute-force cosine search over passages held in memory.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    entries: Vec<(RetrievedDocument, Vec<f32>)>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a passage with a precomputed vector.
    pub fn insert(&mut self, document: RetrievedDocument, vector: Vec<f32>) {
        self.entries.push((document, vector));
    }

    /// Embed and add passages in one batch.
    pub async fn insert_documents(
        &mut self,
        embedder: &dyn EmbeddingProvider,
        documents: Vec<RetrievedDocument>,
    ) -> AppResult<()> {
        let texts: Vec<String> = documents.iter().map(|d| d.page_content.clone()).collect();
        let vectors = embedder.embed_batch(&texts).await?;

        if vectors.len() != documents.len() {
            return Err(AppError::Retrieval(format!(
                "Embedding count mismatch: {} documents, {} vectors",
                documents.len(),
                vectors.len()
            )));
        }

        self.entries.extend(documents.into_iter().zip(vectors));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    fn backend_name(&self) -> &str {
        "memory"
    }

    async fn similarity_search_with_filter(
        &self,
        vector: &[f32],
        filter: &SourceFilter,
        k: usize,
    ) -> AppResult<Vec<RetrievedDocument>> {
        let mut scored: Vec<(&RetrievedDocument, f32)> = self
            .entries
            .iter()
            .filter(|(doc, _)| filter.matches(doc.source()))
            .map(|(doc, v)| (doc, cosine_similarity(vector, v)))
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        tracing::debug!(
            "Memory index: {} candidates passed the filter, returning top {}",
            scored.len(),
            k
        );

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(doc, _)| doc.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::mock::MockProvider;
    use std::collections::BTreeSet;

    fn only(sources: &[&str]) -> SourceFilter {
        SourceFilter::SourceIn(sources.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>())
    }

    #[tokio::test]
    async fn test_search_ranks_by_similarity() {
        let mut index = MemoryIndex::new();
        index.insert(RetrievedDocument::new("east", "docs/a.pdf"), vec![1.0, 0.0]);
        index.insert(RetrievedDocument::new("north", "docs/a.pdf"), vec![0.0, 1.0]);
        index.insert(RetrievedDocument::new("northeast", "docs/a.pdf"), vec![0.7, 0.7]);

        let results = index
            .similarity_search_with_filter(&[0.0, 1.0], &SourceFilter::Unrestricted, 2)
            .await
            .unwrap();

        let texts: Vec<_> = results.iter().map(|d| d.page_content.as_str()).collect();
        assert_eq!(texts, vec!["north", "northeast"]);
    }

    #[tokio::test]
    async fn test_search_applies_filter() {
        let mut index = MemoryIndex::new();
        index.insert(RetrievedDocument::new("fire", "docs/fire.pdf"), vec![1.0, 0.0]);
        index.insert(RetrievedDocument::new("building", "docs/building.pdf"), vec![1.0, 0.0]);

        let results = index
            .similarity_search_with_filter(&[1.0, 0.0], &only(&["docs/building.pdf"]), 9)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].source(), Some("docs/building.pdf"));

        let none = index
            .similarity_search_with_filter(&[1.0, 0.0], &only(&[]), 9)
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_insert_documents_embeds_text() {
        let embedder = MockProvider::new(64);
        let mut index = MemoryIndex::new();
        index
            .insert_documents(
                &embedder,
                vec![
                    RetrievedDocument::new("sprinkler systems in assembly occupancies", "docs/fire.pdf"),
                    RetrievedDocument::new("stairway riser height and tread depth", "docs/building.pdf"),
                ],
            )
            .await
            .unwrap();
        assert_eq!(index.len(), 2);

        let query = embedder.embed("stairway riser height").await.unwrap();
        let results = index
            .similarity_search_with_filter(&query, &SourceFilter::Unrestricted, 1)
            .await
            .unwrap();
        assert_eq!(results[0].source(), Some("docs/building.pdf"));
    }
}
