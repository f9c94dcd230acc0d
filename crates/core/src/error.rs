//! Error types for the CodeLogic service.
//!
//! This module defines a unified error enum covering request validation,
//! retrieval, answer generation and the ambient failures (configuration,
//! I/O, serialization) of the service.

use thiserror::Error;

/// Unified error type for the CodeLogic service.
///
/// All library functions return `Result<T, AppError>`. The HTTP boundary
/// classifies each variant with [`AppError::status_code`] and renders the
/// message as `{ "error": ... }`.
#[derive(Error, Debug)]
pub enum AppError {
    /// The request is missing required input (e.g. a blank question)
    #[error("{0}")]
    BadRequest(String),

    /// The request used an HTTP method other than POST
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// The vector index or embedding call failed, or the capture was never fulfilled
    #[error("Retrieval failed: {0}")]
    Retrieval(String),

    /// The answer generator failed
    #[error("Generation failed: {0}")]
    Generation(String),

    /// Retrieval and generation did not finish within the configured bound
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Uncategorized failures inside the orchestrator
    #[error("{0}")]
    Internal(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// LLM provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AppError {
    /// HTTP status code appropriate for this failure class.
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::BadRequest(_) => 400,
            AppError::MethodNotAllowed => 405,
            AppError::Timeout(_) => 504,
            _ => 500,
        }
    }

    /// Short machine-readable name of the failure class, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "bad_request",
            AppError::MethodNotAllowed => "method_not_allowed",
            AppError::Retrieval(_) => "retrieval_failure",
            AppError::Generation(_) => "generation_failure",
            AppError::Timeout(_) => "timeout_failure",
            _ => "internal_failure",
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
