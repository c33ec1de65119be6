//! Liveness probe endpoint.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

/// `GET /health` — always returns 200 with status, timestamp, and version.
///
/// Has no dependencies and never contacts upstream, making it safe as a
/// container liveness probe even when the upstream configuration is broken.
pub async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "timestamp": chrono::Utc::now(),
            "version": env!("CARGO_PKG_VERSION"),
        })),
    )
}
