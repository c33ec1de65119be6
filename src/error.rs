//! Unified HTTP error type for axum request handlers.
//!
//! [`ApiError`] is the single failure currency of the service: every handler
//! returns `Result<T, ApiError>` and propagates with `?`, and the
//! [`IntoResponse`] impl turns each variant into the right status code and a
//! JSON body at the route boundary. Nothing panics the process — unexpected
//! failures land in [`ApiError::Internal`] and come back as a plain 500 with
//! the original message.
//!
//! Status mapping:
//!
//! | variant               | status | meaning                                  |
//! |-----------------------|--------|------------------------------------------|
//! | `Configuration`       | 500    | endpoint/credential missing at build time |
//! | `Authentication`      | 401    | no bearer token presented                 |
//! | `Upstream`            | 500    | upstream answered with a non-2xx status   |
//! | `UpstreamTimeout`     | 504    | upstream call exceeded the timeout        |
//! | `UpstreamUnavailable` | 500    | transport failure before any status       |
//! | `Validation`          | 422    | request body violates field constraints   |
//! | `Internal`            | 500    | anything else                             |

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Service-level error taxonomy.
///
/// The three upstream-originated variants ([`ApiError::Upstream`],
/// [`ApiError::UpstreamTimeout`], [`ApiError::UpstreamUnavailable`]) are the
/// ones that trigger client-cache invalidation — see
/// [`ApiError::is_upstream`].
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Upstream configuration is missing; fatal at client-construction time.
    #[error("upstream configuration is missing: {0}")]
    Configuration(String),

    /// The request carried no (or an empty) bearer token.
    #[error("invalid authentication credentials")]
    Authentication,

    /// The upstream model API answered with a non-success HTTP status.
    /// The rendered message always contains the literal upstream status code.
    #[error("upstream model API error: HTTP {status}: {body}")]
    Upstream { status: u16, body: String },

    /// The upstream call exceeded the configured timeout. Surfaced as 504
    /// exactly once per request — no retry is attempted.
    #[error("upstream request timed out")]
    UpstreamTimeout,

    /// The upstream call failed before any HTTP status was received
    /// (connection refused, DNS failure, TLS error).
    #[error("upstream request failed: {0}")]
    UpstreamUnavailable(String),

    /// The request body failed a declared field constraint.
    #[error("{0}")]
    Validation(String),

    /// Catch-all for unexpected failures during translation.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// True for errors that originated at (or on the way to) the upstream
    /// API. Callers must invalidate the cached client when this holds, so a
    /// stale or broken client is never reused.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::Upstream { .. } | Self::UpstreamTimeout | Self::UpstreamUnavailable(_)
        )
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::Authentication => StatusCode::UNAUTHORIZED,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            Self::Configuration(_)
            | Self::Upstream { .. }
            | Self::UpstreamUnavailable(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        tracing::warn!(error = %self, status = status.as_u16(), "handler error");
        (
            status,
            Json(json!({
                "error": self.to_string(),
                "status_code": status.as_u16(),
            })),
        )
            .into_response()
    }
}
