//! Grounded retriever.
//!
//! A [`GroundedRetriever`] is built per request together with a
//! [`DocumentCapture`]. The retriever is handed to the answer generator; the
//! capture stays with the orchestrator and yields exactly the passages the
//! generator was given, without relying on the generator to report them.

use crate::embeddings::EmbeddingProvider;
use crate::filter::SourceFilter;
use crate::types::RetrievedDocument;
use crate::vector_index::VectorIndex;
use async_trait::async_trait;
use codelogic_core::{AppError, AppResult};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

/// Source of grounding passages for a question.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, query: &str) -> AppResult<Vec<RetrievedDocument>>;
}

/// Filtered similarity search whose result is also delivered to a capture.
pub struct GroundedRetriever {
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    filter: SourceFilter,
    k: usize,
    capture: Mutex<Option<oneshot::Sender<Vec<RetrievedDocument>>>>,
}

/// Receiving side of a retriever's one-shot capture.
#[derive(Debug)]
pub struct DocumentCapture {
    receiver: oneshot::Receiver<Vec<RetrievedDocument>>,
}

impl GroundedRetriever {
    pub fn new(
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
        filter: SourceFilter,
        k: usize,
    ) -> (Self, DocumentCapture) {
        let (sender, receiver) = oneshot::channel();
        let retriever = Self {
            index,
            embedder,
            filter,
            k,
            capture: Mutex::new(Some(sender)),
        };
        (retriever, DocumentCapture { receiver })
    }

    pub fn filter(&self) -> &SourceFilter {
        &self.filter
    }

    async fn search(&self, query: &str) -> AppResult<Vec<RetrievedDocument>> {
        if self.filter.matches_nothing() {
            tracing::info!("Filter admits no sources, skipping index query");
            return Ok(Vec::new());
        }

        let vector = self.embedder.embed(query).await.map_err(as_retrieval)?;

        self.index
            .similarity_search_with_filter(&vector, &self.filter, self.k)
            .await
            .map_err(as_retrieval)
    }
}

#[async_trait]
impl Retriever for GroundedRetriever {
    async fn retrieve(&self, query: &str) -> AppResult<Vec<RetrievedDocument>> {
        let sender = self
            .capture
            .lock()
            .map_err(|_| AppError::Internal("Retriever capture lock poisoned".to_string()))?
            .take()
            .ok_or_else(|| {
                AppError::Retrieval("Retriever already used for this request".to_string())
            })?;

        let documents = self.search(query).await?;

        tracing::info!(
            "Retrieved {} passages from {} (k={})",
            documents.len(),
            self.index.backend_name(),
            self.k
        );

        if sender.send(documents.clone()).is_err() {
            tracing::debug!("Document capture dropped before retrieval completed");
        }

        Ok(documents)
    }
}

impl DocumentCapture {
    /// Wait for the retriever to publish its result.
    pub async fn wait(self) -> AppResult<Vec<RetrievedDocument>> {
        self.receiver.await.map_err(|_| {
            AppError::Retrieval("Document capture was never fulfilled".to_string())
        })
    }
}

fn as_retrieval(error: AppError) -> AppError {
    match error {
        AppError::Retrieval(_) => error,
        other => AppError::Retrieval(other.to_string()),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::embeddings::providers::mock::MockProvider;
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Index returning fixed passages and counting queries.
    pub(crate) struct StubIndex {
        pub documents: Vec<RetrievedDocument>,
        pub calls: AtomicUsize,
        pub fail: bool,
    }

    impl StubIndex {
        pub(crate) fn with_documents(documents: Vec<RetrievedDocument>) -> Self {
            Self {
                documents,
                calls: AtomicUsize::new(0),
                fail: false,
            }
        }

        pub(crate) fn failing() -> Self {
            Self {
                documents: Vec::new(),
                calls: AtomicUsize::new(0),
                fail: true,
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl VectorIndex for StubIndex {
        fn backend_name(&self) -> &str {
            "stub"
        }

        async fn similarity_search_with_filter(
            &self,
            _vector: &[f32],
            _filter: &SourceFilter,
            k: usize,
        ) -> AppResult<Vec<RetrievedDocument>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AppError::Internal("index unavailable".to_string()));
            }
            Ok(self.documents.iter().take(k).cloned().collect())
        }
    }

    fn some_filter() -> SourceFilter {
        SourceFilter::SourceIn(BTreeSet::from(["docs/a.pdf".to_string()]))
    }

    fn docs() -> Vec<RetrievedDocument> {
        vec![
            RetrievedDocument::new("first", "docs/a.pdf"),
            RetrievedDocument::new("second", "docs/a.pdf"),
        ]
    }

    #[tokio::test]
    async fn test_capture_receives_exactly_returned_documents() {
        let index = Arc::new(StubIndex::with_documents(docs()));
        let (retriever, capture) =
            GroundedRetriever::new(index.clone(), Arc::new(MockProvider::new(16)), some_filter(), 9);

        let returned = retriever.retrieve("question").await.unwrap();
        let captured = capture.wait().await.unwrap();

        assert_eq!(returned, captured);
        assert_eq!(captured, docs());
        assert_eq!(index.calls(), 1);
    }

    #[tokio::test]
    async fn test_k_limits_results() {
        let index = Arc::new(StubIndex::with_documents(docs()));
        let (retriever, capture) =
            GroundedRetriever::new(index, Arc::new(MockProvider::new(16)), some_filter(), 1);

        retriever.retrieve("question").await.unwrap();
        assert_eq!(capture.wait().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_second_retrieve_fails() {
        let index = Arc::new(StubIndex::with_documents(docs()));
        let (retriever, _capture) =
            GroundedRetriever::new(index.clone(), Arc::new(MockProvider::new(16)), some_filter(), 9);

        retriever.retrieve("question").await.unwrap();
        let second = retriever.retrieve("question").await;

        assert!(matches!(second, Err(AppError::Retrieval(_))));
        assert_eq!(index.calls(), 1);
    }

    #[tokio::test]
    async fn test_dropped_retriever_leaves_capture_unfulfilled() {
        let index = Arc::new(StubIndex::with_documents(docs()));
        let (retriever, capture) =
            GroundedRetriever::new(index, Arc::new(MockProvider::new(16)), some_filter(), 9);
        drop(retriever);

        let err = capture.wait().await.unwrap_err();
        assert!(matches!(err, AppError::Retrieval(_)));
        assert!(err.to_string().contains("never fulfilled"));
    }

    #[tokio::test]
    async fn test_index_failure_is_retrieval_failure() {
        let index = Arc::new(StubIndex::failing());
        let (retriever, capture) =
            GroundedRetriever::new(index, Arc::new(MockProvider::new(16)), some_filter(), 9);

        let err = retriever.retrieve("question").await.unwrap_err();
        assert!(matches!(err, AppError::Retrieval(_)));
        assert!(err.to_string().contains("index unavailable"));

        drop(retriever);
        assert!(capture.wait().await.is_err());
    }

    #[tokio::test]
    async fn test_empty_filter_skips_index() {
        let index = Arc::new(StubIndex::with_documents(docs()));
        let (retriever, capture) = GroundedRetriever::new(
            index.clone(),
            Arc::new(MockProvider::new(16)),
            SourceFilter::SourceIn(BTreeSet::new()),
            9,
        );

        assert!(retriever.retrieve("question").await.unwrap().is_empty());
        assert!(capture.wait().await.unwrap().is_empty());
        assert_eq!(index.calls(), 0);
    }
}
