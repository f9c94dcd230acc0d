//! Conversational retrieval QA chain.
//!
//! The generator owns the retriever for the duration of one call: it may
//! rephrase the question first, then retrieves once and answers from the
//! retrieved passages.

use crate::retriever::Retriever;
use crate::types::RetrievedDocument;
use async_trait::async_trait;
use codelogic_core::{AppError, AppResult};
use codelogic_llm::{LlmClient, LlmRequest};
use codelogic_prompt::{
    build_prompt, builtin, load_prompt, BuiltPrompt, PromptDefinition, ANSWER_PROMPT_ID,
    CONDENSE_PROMPT_ID,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Maximum tokens for a generated answer.
const MAX_ANSWER_TOKENS: u32 = 1000;

/// Produces an answer for a question, retrieving grounding through `retriever`.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(
        &self,
        retriever: &dyn Retriever,
        question: &str,
        chat_history: &str,
    ) -> AppResult<String>;
}

/// LLM-backed conversational retrieval chain.
pub struct ConversationalChain {
    llm: Arc<dyn LlmClient>,
    model: String,
    condense_prompt: PromptDefinition,
    answer_prompt: PromptDefinition,
}

impl ConversationalChain {
    /// Chain using the built-in prompts.
    pub fn new(llm: Arc<dyn LlmClient>, model: impl Into<String>) -> AppResult<Self> {
        let condense_prompt = builtin(CONDENSE_PROMPT_ID)
            .ok_or_else(|| AppError::Prompt("Missing built-in condense prompt".to_string()))?;
        let answer_prompt = builtin(ANSWER_PROMPT_ID)
            .ok_or_else(|| AppError::Prompt("Missing built-in answer prompt".to_string()))?;

        Ok(Self {
            llm,
            model: model.into(),
            condense_prompt,
            answer_prompt,
        })
    }

    /// Chain using prompts from `prompts_dir`, falling back to the built-ins.
    pub fn with_prompts_dir(
        llm: Arc<dyn LlmClient>,
        model: impl Into<String>,
        prompts_dir: &Path,
    ) -> AppResult<Self> {
        Ok(Self {
            llm,
            model: model.into(),
            condense_prompt: load_prompt(prompts_dir, CONDENSE_PROMPT_ID)?,
            answer_prompt: load_prompt(prompts_dir, ANSWER_PROMPT_ID)?,
        })
    }

    async fn complete(&self, prompt: BuiltPrompt, max_tokens: Option<u32>) -> AppResult<String> {
        let mut request = LlmRequest::new(prompt.user, &self.model);
        if let Some(system) = prompt.system {
            request = request.with_system(system);
        }
        if let Some(temperature) = prompt.temperature {
            request = request.with_temperature(temperature);
        }
        if let Some(max_tokens) = max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        let response = self.llm.complete(&request).await.map_err(|e| match e {
            AppError::Generation(_) => e,
            other => AppError::Generation(other.to_string()),
        })?;

        tracing::debug!(
            "{} completion used {} prompt / {} completion tokens",
            self.llm.provider_name(),
            response.usage.prompt_tokens,
            response.usage.completion_tokens
        );

        Ok(response.content)
    }

    async fn standalone_question(&self, question: &str, chat_history: &str) -> AppResult<String> {
        if chat_history.is_empty() {
            return Ok(question.to_string());
        }

        let vars = HashMap::from([
            ("chat_history".to_string(), chat_history.to_string()),
            ("question".to_string(), question.to_string()),
        ]);
        let prompt = build_prompt(&self.condense_prompt, vars)?;
        let condensed = self.complete(prompt, None).await?;
        let condensed = condensed.trim();

        tracing::debug!("Condensed follow-up into: {}", condensed);

        if condensed.is_empty() {
            Ok(question.to_string())
        } else {
            Ok(condensed.to_string())
        }
    }
}

/// Join passage texts with blank lines.
pub fn build_context(documents: &[RetrievedDocument]) -> String {
    documents
        .iter()
        .map(|d| d.page_content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[async_trait]
impl AnswerGenerator for ConversationalChain {
    async fn generate(
        &self,
        retriever: &dyn Retriever,
        question: &str,
        chat_history: &str,
    ) -> AppResult<String> {
        let standalone = self.standalone_question(question, chat_history).await?;

        let documents = retriever.retrieve(&standalone).await?;

        let vars = HashMap::from([
            ("context".to_string(), build_context(&documents)),
            ("question".to_string(), question.to_string()),
        ]);
        let prompt = build_prompt(&self.answer_prompt, vars)?;

        let answer = self.complete(prompt, Some(MAX_ANSWER_TOKENS)).await?;

        tracing::info!(
            "Generated answer ({} chars) from {} passages",
            answer.len(),
            documents.len()
        );

        Ok(answer)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use codelogic_llm::{LlmResponse, LlmUsage};
    use std::sync::Mutex;

    /// LLM that records prompts and replies from a script.
    pub(crate) struct ScriptedLlm {
        pub replies: Mutex<Vec<AppResult<String>>>,
        pub prompts: Mutex<Vec<LlmRequest>>,
    }

    impl ScriptedLlm {
        pub(crate) fn new(replies: Vec<AppResult<String>>) -> Self {
            Self {
                replies: Mutex::new(replies),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn requests(&self) -> Vec<LlmRequest> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        fn provider_name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
            self.prompts.lock().unwrap().push(request.clone());
            let mut replies = self.replies.lock().unwrap();
            let reply = if replies.is_empty() {
                Ok("default answer".to_string())
            } else {
                replies.remove(0)
            };
            reply.map(|content| LlmResponse {
                content,
                model: request.model.clone(),
                usage: LlmUsage::default(),
            })
        }
    }

    /// Retriever returning fixed passages and recording queries.
    pub(crate) struct RecordingRetriever {
        pub documents: Vec<RetrievedDocument>,
        pub queries: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Retriever for RecordingRetriever {
        async fn retrieve(&self, query: &str) -> AppResult<Vec<RetrievedDocument>> {
            self.queries.lock().unwrap().push(query.to_string());
            Ok(self.documents.clone())
        }
    }

    fn retriever() -> RecordingRetriever {
        RecordingRetriever {
            documents: vec![
                RetrievedDocument::new("Guards shall be 42 inches high.", "docs/ibc.pdf"),
                RetrievedDocument::new("Handrails 34 to 38 inches.", "docs/ibc.pdf"),
            ],
            queries: Mutex::new(Vec::new()),
        }
    }

    #[tokio::test]
    async fn test_no_history_skips_condense() {
        let llm = Arc::new(ScriptedLlm::new(vec![Ok("42 inches".to_string())]));
        let chain = ConversationalChain::new(llm.clone(), "llama3.2").unwrap();
        let retriever = retriever();

        let answer = chain.generate(&retriever, "Guard height?", "").await.unwrap();

        assert_eq!(answer, "42 inches");
        assert_eq!(*retriever.queries.lock().unwrap(), vec!["Guard height?"]);

        let requests = llm.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0]
            .prompt
            .contains("Guards shall be 42 inches high.\n\nHandrails 34 to 38 inches."));
        assert!(requests[0].prompt.contains("Question: Guard height?"));
        assert_eq!(requests[0].max_tokens, Some(MAX_ANSWER_TOKENS));
        assert_eq!(requests[0].model, "llama3.2");
    }

    #[tokio::test]
    async fn test_history_condenses_before_retrieval() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            Ok("What is the required handrail height?".to_string()),
            Ok("34 to 38 inches".to_string()),
        ]));
        let chain = ConversationalChain::new(llm.clone(), "llama3.2").unwrap();
        let retriever = retriever();

        let answer = chain
            .generate(
                &retriever,
                "and handrails?",
                "Human: Guard height?\nAssistant: 42 inches",
            )
            .await
            .unwrap();

        assert_eq!(answer, "34 to 38 inches");
        assert_eq!(
            *retriever.queries.lock().unwrap(),
            vec!["What is the required handrail height?"]
        );

        let requests = llm.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[0]
            .prompt
            .contains("Human: Guard height?\nAssistant: 42 inches"));
        assert!(requests[1].prompt.contains("Question: and handrails?"));
    }

    #[tokio::test]
    async fn test_llm_failure_is_generation_failure() {
        let llm = Arc::new(ScriptedLlm::new(vec![Err(AppError::Llm(
            "connection refused".to_string(),
        ))]));
        let chain = ConversationalChain::new(llm, "llama3.2").unwrap();

        let err = chain.generate(&retriever(), "q", "").await.unwrap_err();
        assert!(matches!(err, AppError::Generation(_)));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_build_context() {
        let docs = vec![
            RetrievedDocument::new("one", "s"),
            RetrievedDocument::new("two", "s"),
        ];
        assert_eq!(build_context(&docs), "one\n\ntwo");
        assert_eq!(build_context(&[]), "");
    }
}
