//! Bearer-token presence guard.
//!
//! Protected routes require an `Authorization: Bearer <token>` header with a
//! non-empty token. The token is injected as a [`BearerToken`] extension so
//! handlers can read it without re-parsing the header.
//!
//! # Security note
//! This is a presence check only — the token's value is never verified
//! against anything. It is **not production-grade authentication**; a real
//! deployment must substitute a verifiable credential scheme (signed tokens
//! or an API-key lookup) before exposure beyond local testing.

use axum::{
    extract::Request,
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::ApiError;

/// Request extension carrying the presented bearer token.
#[derive(Clone, Debug)]
pub struct BearerToken(pub String);

/// Axum middleware: rejects requests without a non-empty bearer token with a
/// 401 before any handler (and therefore any upstream call) runs.
pub async fn require_bearer(mut req: Request, next: Next) -> Response {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    match token {
        Some(token) => {
            req.extensions_mut().insert(BearerToken(token));
            next.run(req).await
        }
        None => ApiError::Authentication.into_response(),
    }
}
