//! LLM provider factory.
//!
//! Creates LLM clients from provider names and application configuration,
//! resolving endpoints and secrets along the way.

use crate::client::LlmClient;
use crate::providers::{ollama, openai, OllamaClient, OpenAiClient};
use codelogic_core::{AppConfig, AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("openai", "ollama")
/// * `endpoint` - Optional custom endpoint URL
/// * `api_key` - API key, required by "openai"
/// * `timeout` - Per-request HTTP timeout
///
/// # Errors
/// Returns `AppError::Config` if the provider is unknown or a required secret is missing.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
    timeout: Duration,
) -> AppResult<Arc<dyn LlmClient>> {
    match provider.to_lowercase().as_str() {
        "ollama" => {
            let base_url = endpoint.unwrap_or(ollama::DEFAULT_OLLAMA_URL);
            Ok(Arc::new(OllamaClient::with_timeout(base_url, timeout)?))
        }
        "openai" => {
            let api_key = api_key.ok_or_else(|| {
                AppError::Config("OpenAI provider requires API key".to_string())
            })?;
            let base_url = endpoint.unwrap_or(openai::DEFAULT_OPENAI_URL);
            Ok(Arc::new(OpenAiClient::new(base_url, api_key, timeout)?))
        }
        _ => Err(AppError::Config(format!("Unknown provider: {}", provider))),
    }
}

/// Create the client for the configured active provider.
pub fn client_from_config(config: &AppConfig) -> AppResult<Arc<dyn LlmClient>> {
    let endpoint = config
        .get_provider_config(&config.provider)
        .and_then(|pc| pc.endpoint());
    let api_key = config.resolve_api_key(&config.provider);

    tracing::debug!(provider = %config.provider, ?endpoint, "Creating LLM client");

    create_client(
        &config.provider,
        endpoint,
        api_key.as_deref(),
        Duration::from_secs(config.retrieval.timeout_secs),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[test]
    fn test_create_ollama_client() {
        let client = create_client("ollama", None, None, TIMEOUT).unwrap();
        assert_eq!(client.provider_name(), "ollama");
    }

    #[test]
    fn test_create_openai_client() {
        let client = create_client("OpenAI", None, Some("sk-test"), TIMEOUT).unwrap();
        assert_eq!(client.provider_name(), "openai");
    }

    #[test]
    fn test_openai_requires_api_key() {
        match create_client("openai", None, None, TIMEOUT) {
            Err(err) => assert!(err.to_string().contains("requires API key")),
            Ok(_) => panic!("Expected error for OpenAI without API key"),
        }
    }

    #[test]
    fn test_unknown_provider() {
        match create_client("unknown", None, None, TIMEOUT) {
            Err(err) => assert!(err.to_string().contains("Unknown provider")),
            Ok(_) => panic!("Expected error for unknown provider"),
        }
    }

    #[test]
    fn test_client_from_default_config() {
        let client = client_from_config(&AppConfig::default()).unwrap();
        assert_eq!(client.provider_name(), "ollama");
    }
}
