//! Public HTTP surface.
//!
//! Handlers are intentionally thin: validate, delegate to [`crate::translate`],
//! wrap the result in JSON. Each endpoint performs at most one upstream call;
//! `/health`, `/` and `/api/v1/models` never contact upstream at all.

use std::sync::Arc;

use axum::{
    extract::State,
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use crate::{
    error::ApiError,
    models::{
        model_catalog, ChatRequest, ChatResponse, EmbeddingRequest, EmbeddingResponse,
        GenerateRequest, GenerateResponse, ModelInfo,
    },
    state::AppState,
    translate,
};

/// Build the service router. The three POST endpoints sit behind the bearer
/// presence guard; everything else is public.
pub fn router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/api/v1/chat/completions", post(chat_completions))
        .route("/api/v1/generate", post(generate_text))
        .route("/api/v1/embeddings", post(create_embeddings))
        .route_layer(middleware::from_fn(crate::api::auth::require_bearer));

    Router::new()
        .route("/", get(root))
        .route("/health", get(crate::api::health::health))
        .route("/api/v1/models", get(list_models))
        .merge(protected)
        .with_state(state)
}

/// `GET /` — service banner.
async fn root() -> impl IntoResponse {
    Json(json!({
        "message": "foundry-relay is running",
        "health": "/health",
    }))
}

/// `GET /api/v1/models` — the fixed in-memory catalog, independent of
/// upstream state.
async fn list_models() -> Json<Vec<ModelInfo>> {
    Json(model_catalog())
}

/// `POST /api/v1/chat/completions` — forward a conversation upstream and
/// reshape the answer.
async fn chat_completions(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    req.params.validate()?;
    Ok(Json(translate::chat(&state, req).await?))
}

/// `POST /api/v1/generate` — single-turn text generation.
async fn generate_text(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    req.params.validate()?;
    Ok(Json(translate::generate(&state, req).await?))
}

/// `POST /api/v1/embeddings` — embedding generation.
async fn create_embeddings(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EmbeddingRequest>,
) -> Result<Json<EmbeddingResponse>, ApiError> {
    Ok(Json(translate::embed(&state, req).await?))
}
