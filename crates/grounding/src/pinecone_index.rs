//! Pinecone-backed vector index queried over its REST data plane.

use crate::filter::SourceFilter;
use crate::types::RetrievedDocument;
use crate::vector_index::VectorIndex;
use async_trait::async_trait;
use codelogic_core::{AppError, AppResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Read-only Pinecone index.
#[derive(Debug, Clone)]
pub struct PineconeIndex {
    client: Client,
    host: String,
    api_key: String,
    namespace: Option<String>,
    text_key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<Match>,
}

#[derive(Debug, Deserialize)]
struct Match {
    id: String,
    #[serde(default)]
    metadata: Option<Map<String, Value>>,
}

impl PineconeIndex {
    pub fn new(
        host: &str,
        api_key: &str,
        namespace: Option<String>,
        text_key: &str,
    ) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        let host = host.trim_end_matches('/');
        let host = if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{}", host)
        };

        Ok(Self {
            client,
            host,
            api_key: api_key.to_string(),
            namespace,
            text_key: text_key.to_string(),
        })
    }

    fn query_url(&self) -> String {
        format!("{}/query", self.host)
    }

    /// Move the passage text out of metadata into `page_content`.
    fn to_document(&self, m: Match) -> AppResult<RetrievedDocument> {
        let mut metadata = m.metadata.unwrap_or_default();

        let page_content = match metadata.remove(&self.text_key) {
            Some(Value::String(text)) => text,
            _ => {
                return Err(AppError::Retrieval(format!(
                    "Pinecone match '{}' has no '{}' metadata",
                    m.id, self.text_key
                )))
            }
        };

        Ok(RetrievedDocument {
            page_content,
            metadata,
        })
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    fn backend_name(&self) -> &str {
        "pinecone"
    }

    async fn similarity_search_with_filter(
        &self,
        vector: &[f32],
        filter: &SourceFilter,
        k: usize,
    ) -> AppResult<Vec<RetrievedDocument>> {
        let request = QueryRequest {
            vector,
            top_k: k,
            include_metadata: true,
            include_values: false,
            filter: filter.to_pinecone(),
            namespace: self.namespace.as_deref(),
        };

        let response = self
            .client
            .post(self.query_url())
            .header("Api-Key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Retrieval(format!("Pinecone request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Retrieval(format!(
                "Pinecone query error ({}): {}",
                status, body
            )));
        }

        let body: QueryResponse = response
            .json()
            .await
            .map_err(|e| AppError::Retrieval(format!("Failed to parse Pinecone response: {}", e)))?;

        tracing::debug!("Pinecone returned {} matches", body.matches.len());

        body.matches
            .into_iter()
            .map(|m| self.to_document(m))
            .collect()
    }
}
