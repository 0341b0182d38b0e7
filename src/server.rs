//! HTTP boundary — REST endpoints for the chat pipeline.
//!
//! The boundary is deliberately thin: it converts payloads, maps status
//! codes, and delegates every decision to the pipeline. Auth and session
//! handling live elsewhere.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tracing::error;

use crate::pipeline::types::DEFAULT_MOOD;
use crate::pipeline::{ChatMessage, ResponsePipeline};
use crate::store::HistorySink;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ResponsePipeline>,
    pub history: Arc<dyn HistorySink>,
}

/// Build the Axum router with the chat REST routes.
pub fn chat_routes(pipeline: Arc<ResponsePipeline>, history: Arc<dyn HistorySink>) -> Router {
    let state = AppState { pipeline, history };

    Router::new()
        .route("/health", get(health))
        .route("/chat", post(chat))
        .route("/api/chat/history", get(chat_history))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ── Request bodies ──────────────────────────────────────────────────

/// Inbound chat payload. Missing fields degrade rather than reject:
/// a missing message behaves as the empty string, a missing mood defaults
/// to Neutral.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default = "default_mood")]
    pub mood: String,
}

fn default_mood() -> String {
    DEFAULT_MOOD.to_string()
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    #[serde(default = "default_history_limit")]
    pub limit: usize,
}

fn default_history_limit() -> usize {
    50
}

// ── Handlers ────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "wellbot"
    }))
}

/// `POST /chat` — run a message through the pipeline.
///
/// Any pipeline reply (scripted, generated, or degraded) is a 200; only an
/// internal failure such as a history write error maps to 500.
async fn chat(State(state): State<AppState>, Json(request): Json<ChatRequest>) -> impl IntoResponse {
    let message = ChatMessage::new(request.message, request.mood);

    match state.pipeline.process(&message).await {
        Ok(result) => (
            StatusCode::OK,
            Json(serde_json::json!({ "reply": result.reply })),
        ),
        Err(e) => {
            error!(error = %e, "Chat request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "reply": "Server error. Try again later." })),
            )
        }
    }
}

/// `GET /api/chat/history` — most recent exchanges, newest first.
async fn chat_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> impl IntoResponse {
    match state.history.recent(params.limit).await {
        Ok(records) => (
            StatusCode::OK,
            Json(serde_json::json!({ "history": records })),
        ),
        Err(e) => {
            error!(error = %e, "History fetch failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "history unavailable" })),
            )
        }
    }
}
