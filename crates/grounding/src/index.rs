//! Vector index selection from configuration.

use crate::lancedb_index::LanceDbIndex;
use crate::pinecone_index::PineconeIndex;
use crate::vector_index::VectorIndex;
use codelogic_core::config::IndexConfig;
use codelogic_core::{AppConfig, AppError, AppResult};
use std::sync::Arc;

/// Open the configured index backend.
pub async fn open_index(config: &AppConfig) -> AppResult<Arc<dyn VectorIndex>> {
    match &config.index {
        IndexConfig::Pinecone {
            host,
            api_key_env,
            namespace,
            text_key,
        } => {
            let api_key = std::env::var(api_key_env).map_err(|_| {
                AppError::Config(format!(
                    "Pinecone API key not found in environment variable {}",
                    api_key_env
                ))
            })?;

            tracing::info!("Using Pinecone index at {}", host);
            Ok(Arc::new(PineconeIndex::new(
                host,
                &api_key,
                namespace.clone(),
                text_key,
            )?))
        }

        IndexConfig::LanceDb { path, table } => {
            let path = config.resolve_path(path);
            tracing::info!("Using LanceDB index at {:?} (table '{}')", path, table);
            Ok(Arc::new(LanceDbIndex::open(&path, table).await?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_pinecone_requires_key_env() {
        let config = AppConfig {
            index: IndexConfig::Pinecone {
                host: "codes.svc.pinecone.io".to_string(),
                api_key_env: "CODELOGIC_TEST_UNSET_PINECONE_KEY".to_string(),
                namespace: None,
                text_key: "text".to_string(),
            },
            ..Default::default()
        };

        let err = open_index(&config).await.err().unwrap();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[tokio::test]
    async fn test_lancedb_missing_table_is_config_error() {
        let temp = TempDir::new().unwrap();
        let config = AppConfig {
            workspace: temp.path().to_path_buf(),
            index: IndexConfig::LanceDb {
                path: PathBuf::from("index"),
                table: "chunks".to_string(),
            },
            ..Default::default()
        };

        let err = open_index(&config).await.err().unwrap();
        assert!(matches!(err, AppError::Config(_)));
    }
}
