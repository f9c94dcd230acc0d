//! OpenAI embedding provider (`POST /v1/embeddings`).
//!
//! Retries 429 and 5xx responses and network errors with exponential backoff;
//! other 4xx responses fail immediately.

use crate::embeddings::EmbeddingProvider;
use async_trait::async_trait;
use codelogic_core::{AppError, AppResult};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";
const MAX_RETRIES: u32 = 3;
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    dimensions: usize,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiProvider {
    pub fn new(
        endpoint: Option<&str>,
        api_key: &str,
        model: &str,
        dimensions: usize,
    ) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Llm(format!("Failed to create HTTP client for OpenAI: {}", e)))?;

        Ok(Self {
            client,
            base_url: endpoint
                .unwrap_or(DEFAULT_OPENAI_URL)
                .trim_end_matches('/')
                .to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            dimensions,
        })
    }

    fn url(&self) -> String {
        format!("{}/embeddings", self.base_url)
    }

    async fn request(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let body = json!({
            "model": self.model,
            "input": texts,
        });

        let mut last_error = None;

        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let response = match self
                .client
                .post(self.url())
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!("OpenAI embeddings request failed (attempt {}): {}", attempt + 1, e);
                    last_error = Some(AppError::Llm(format!("OpenAI request failed: {}", e)));
                    continue;
                }
            };

            let status = response.status();

            if status.is_success() {
                let parsed: EmbeddingsResponse = response.json().await.map_err(|e| {
                    AppError::Llm(format!("Failed to parse OpenAI embeddings response: {}", e))
                })?;
                return self.order_and_check(parsed, texts.len());
            }

            let text = response.text().await.unwrap_or_default();
            let error = AppError::Llm(format!("OpenAI embeddings error ({}): {}", status, text));

            if status.as_u16() == 429 || status.is_server_error() {
                tracing::warn!("OpenAI embeddings returned {}, retrying", status);
                last_error = Some(error);
                continue;
            }

            return Err(error);
        }

        Err(last_error
            .unwrap_or_else(|| AppError::Llm("OpenAI embeddings failed".to_string())))
    }

    fn order_and_check(
        &self,
        mut response: EmbeddingsResponse,
        expected: usize,
    ) -> AppResult<Vec<Vec<f32>>> {
        if response.data.len() != expected {
            return Err(AppError::Llm(format!(
                "OpenAI returned {} embeddings for {} inputs",
                response.data.len(),
                expected
            )));
        }

        response.data.sort_by_key(|d| d.index);

        response
            .data
            .into_iter()
            .map(|d| {
                if d.embedding.len() == self.dimensions {
                    Ok(d.embedding)
                } else {
                    Err(AppError::Llm(format!(
                        "Embedding dimension mismatch: expected {}, got {}",
                        self.dimensions,
                        d.embedding.len()
                    )))
                }
            })
            .collect()
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        self.request(texts).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(dimensions: usize) -> OpenAiProvider {
        OpenAiProvider::new(None, "sk-test", "text-embedding-ada-002", dimensions).unwrap()
    }

    #[test]
    fn test_default_url() {
        assert_eq!(provider(2).url(), "https://api.openai.com/v1/embeddings");

        let custom = OpenAiProvider::new(Some("http://proxy/v1/"), "k", "m", 2).unwrap();
        assert_eq!(custom.url(), "http://proxy/v1/embeddings");
    }

    #[test]
    fn test_response_reordered_by_index() {
        let response: EmbeddingsResponse = serde_json::from_value(json!({
            "data": [
                {"index": 1, "embedding": [0.0, 1.0]},
                {"index": 0, "embedding": [1.0, 0.0]}
            ]
        }))
        .unwrap();

        let vectors = provider(2).order_and_check(response, 2).unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_dimension_mismatch() {
        let response: EmbeddingsResponse = serde_json::from_value(json!({
            "data": [{"index": 0, "embedding": [1.0, 0.0, 0.0]}]
        }))
        .unwrap();

        assert!(provider(2).order_and_check(response, 1).is_err());
    }

    #[tokio::test]
    async fn test_empty_batch_short_circuits() {
        assert!(provider(2).embed_batch(&[]).await.unwrap().is_empty());
    }
}
