//! Answer orchestrator.
//!
//! Validates a chat request, narrows the corpus to the selected categories,
//! runs the answer generator against a per-request grounded retriever and
//! pairs the answer with the passages the retriever captured.

use crate::categories::CategoryMap;
use crate::chain::{AnswerGenerator, ConversationalChain};
use crate::embeddings::{create_provider, EmbeddingProvider};
use crate::filter::SourceFilterBuilder;
use crate::history::HistoryFormatter;
use crate::index::open_index;
use crate::retriever::GroundedRetriever;
use crate::types::{ChatRequest, ChatResponse};
use crate::vector_index::VectorIndex;
use codelogic_core::config::{DEFAULT_TIMEOUT_SECS, DEFAULT_TOP_K};
use codelogic_core::{AppConfig, AppError, AppResult, EmptySelectionPolicy};
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

/// Default corpus root for services built without configuration.
const DEFAULT_CORPUS_ROOT: &str = "docs/";

/// Process-wide answering service, shared read-only across requests.
pub struct AnswerService {
    categories: CategoryMap,
    filter_builder: SourceFilterBuilder,
    history: HistoryFormatter,
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn AnswerGenerator>,
    top_k: usize,
    timeout: Duration,
}

impl AnswerService {
    pub fn new(
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn AnswerGenerator>,
    ) -> Self {
        Self {
            categories: CategoryMap::builtin(),
            filter_builder: SourceFilterBuilder::new(
                DEFAULT_CORPUS_ROOT,
                EmptySelectionPolicy::default(),
            ),
            history: HistoryFormatter::new(),
            index,
            embedder,
            generator,
            top_k: DEFAULT_TOP_K,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_categories(mut self, categories: CategoryMap) -> Self {
        self.categories = categories;
        self
    }

    pub fn with_filter_builder(mut self, filter_builder: SourceFilterBuilder) -> Self {
        self.filter_builder = filter_builder;
        self
    }

    pub fn with_history_formatter(mut self, history: HistoryFormatter) -> Self {
        self.history = history;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Wire the service from configuration: index, embeddings, LLM and prompts.
    pub async fn from_config(config: &AppConfig) -> AppResult<Self> {
        let index = open_index(config).await?;

        let embedding = config.embedding_settings();
        let embedder = create_provider(
            &embedding,
            config.resolve_api_key(&embedding.provider).as_deref(),
        )?;

        let llm = codelogic_llm::client_from_config(config)?;
        let prompts_dir = config.codelogic_dir().join("prompts");
        let generator = ConversationalChain::with_prompts_dir(llm, &config.model, &prompts_dir)?;

        tracing::info!(
            "Answer service ready: index={}, embeddings={}/{}, llm={}/{}",
            index.backend_name(),
            embedder.provider_name(),
            embedder.model_name(),
            config.provider,
            config.model
        );

        Ok(Self::new(index, embedder, Arc::new(generator))
            .with_categories(CategoryMap::from_config(config.corpus.categories.as_ref()))
            .with_filter_builder(SourceFilterBuilder::new(
                config.corpus.root.clone(),
                config.corpus.empty_selection,
            ))
            .with_history_formatter(HistoryFormatter::with_max_turns(
                config.retrieval.history_max_turns,
            ))
            .with_top_k(config.retrieval.top_k)
            .with_timeout(Duration::from_secs(config.retrieval.timeout_secs)))
    }

    pub fn categories(&self) -> &CategoryMap {
        &self.categories
    }

    /// Answer one chat request.
    ///
    /// Only `POST` is accepted. The response carries exactly the passages the
    /// retriever handed to the generator, in retrieval order.
    pub async fn handle(&self, method: &str, request: ChatRequest) -> AppResult<ChatResponse> {
        let request_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("chat", request_id = %request_id);
        self.handle_request(method, request).instrument(span).await
    }

    async fn handle_request(&self, method: &str, request: ChatRequest) -> AppResult<ChatResponse> {
        if method != "POST" {
            tracing::debug!("Rejecting {} request", method);
            return Err(AppError::MethodNotAllowed);
        }

        let question = request
            .question
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| AppError::BadRequest("No question in the request".to_string()))?;

        let sanitized = question.replace('\n', " ");

        tracing::info!(
            "Question with {} history turns, categories {:?}",
            request.history.len(),
            request.selected_docs
        );

        let identifiers = self.categories.resolve(&request.selected_docs);
        let filter = self.filter_builder.build(&identifiers);

        tracing::debug!("Resolved {} documents, filter {:?}", identifiers.len(), filter);

        let (retriever, capture) = GroundedRetriever::new(
            Arc::clone(&self.index),
            Arc::clone(&self.embedder),
            filter,
            self.top_k,
        );

        let chat_history = self.history.format(&request.history);
        let generator = Arc::clone(&self.generator);

        let generation = async move {
            let result = generator
                .generate(&retriever, &sanitized, &chat_history)
                .await;
            // Releases the capture sender if retrieval never ran
            drop(retriever);
            result
        };

        let (answer, documents) =
            tokio::time::timeout(self.timeout, async { tokio::join!(generation, capture.wait()) })
                .await
                .map_err(|_| {
                    tracing::warn!("Request exceeded {:?}", self.timeout);
                    AppError::Timeout(format!(
                        "no answer within {} seconds",
                        self.timeout.as_secs_f64()
                    ))
                })?;

        let text = answer?;
        let source_documents = documents?;

        tracing::info!("Answered with {} source documents", source_documents.len());

        Ok(ChatResponse {
            text,
            source_documents,
        })
    }
}
