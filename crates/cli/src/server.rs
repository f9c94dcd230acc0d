//! HTTP API.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | any    | `/api/chat` | Answer a question; only `POST` succeeds |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! Failures are returned as `{ "error": "<message>" }` with the status the
//! error maps to (400, 405, 504 or 500).

use axum::{
    body::Bytes,
    extract::State,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use codelogic_core::{AppConfig, AppError};
use codelogic_grounding::{AnswerService, ChatRequest, ChatResponse};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
struct AppState {
    service: Arc<AnswerService>,
}

/// Build the service from configuration and serve until the process stops.
pub async fn run_server(config: &AppConfig) -> anyhow::Result<()> {
    let service = AnswerService::from_config(config).await?;
    let app = router(Arc::new(service));

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Router with CORS and request tracing.
pub fn router(service: Arc<AnswerService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/chat", any(handle_chat))
        .route("/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(AppState { service })
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

struct ApiError(AppError);

impl From<AppError> for ApiError {
    fn from(error: AppError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(kind = self.0.kind(), "Chat request failed: {}", self.0);
        } else {
            tracing::debug!(kind = self.0.kind(), "Chat request rejected: {}", self.0);
        }

        let body = ErrorBody {
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ /api/chat ============

async fn handle_chat(
    State(state): State<AppState>,
    method: Method,
    body: Bytes,
) -> Result<Json<ChatResponse>, ApiError> {
    // Only POST bodies are parsed; other methods are rejected by the service
    let request = if method == Method::POST {
        serde_json::from_slice::<ChatRequest>(&body)
            .map_err(|e| AppError::BadRequest(format!("Invalid request body: {}", e)))?
    } else {
        ChatRequest::default()
    };

    let response = state.service.handle(method.as_str(), request).await?;
    Ok(Json(response))
}
