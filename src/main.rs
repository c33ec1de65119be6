use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::http::{header, HeaderValue, Method};
use tokio::signal;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

mod api;
mod config;
mod error;
mod models;
mod state;
mod translate;
mod upstream;

pub use config::Config;
pub use error::ApiError;
pub use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // When invoked as a Docker HEALTHCHECK, hit /health and exit immediately.
    // This avoids needing any external tool (curl/wget) in the container image.
    if std::env::args().nth(1).as_deref() == Some("--healthcheck") {
        return healthcheck().await;
    }

    // Load the one and only settings snapshot.
    let config = Config::from_env();

    // Initialise tracing; RUST_LOG wins over the LOG_LEVEL config value.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(format!(
                    "foundry_relay={},tower_http=warn",
                    config.log_level
                ))
            }),
        )
        .init();

    // Missing upstream settings are not fatal here: /health and /api/v1/models
    // must serve regardless. The hole becomes a per-request 500 when the
    // upstream client is first needed.
    let missing = config.validate();
    if !missing.is_empty() {
        warn!(
            missing = missing.join(", "),
            "upstream configuration incomplete — model endpoints will fail until set"
        );
    }

    info!(
        host = %config.host,
        port = config.port,
        deployment = %config.deployment,
        "foundry-relay starting"
    );

    let cors = cors_layer(&config)?;
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("parsing bind address")?;

    let state = Arc::new(AppState::new(Arc::new(config)));

    let trace_layer = tower_http::trace::TraceLayer::new_for_http()
        .make_span_with(tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO))
        .on_response(tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO));

    let app = api::routes::router(Arc::clone(&state))
        .layer(axum::middleware::from_fn(api::request_id::request_id_middleware))
        .layer(trace_layer)
        .layer(cors);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "listening");

    tokio::select! {
        result = axum::serve(listener, app) => {
            result.context("server error")?;
        }
        _ = shutdown_signal() => {
            info!("shutdown signal received");
        }
    }

    Ok(())
}

/// Build the CORS layer from the configured origin list. `*` anywhere in the
/// list means any origin.
fn cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let origin = if config.allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let parsed: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .map(|o| {
                o.parse::<HeaderValue>()
                    .with_context(|| format!("invalid CORS origin `{o}`"))
            })
            .collect::<anyhow::Result<_>>()?;
        AllowOrigin::list(parsed)
    };

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Lightweight healthcheck: GET /health and exit 0 on 200, 1 otherwise.
/// Invoked via `foundry-relay --healthcheck` from Docker HEALTHCHECK.
async fn healthcheck() -> anyhow::Result<()> {
    let port = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse::<u16>().ok())
        .unwrap_or(8000);

    let url = format!("http://127.0.0.1:{port}/health");
    let resp = reqwest::get(&url).await?;

    if resp.status().is_success() {
        std::process::exit(0);
    } else {
        std::process::exit(1);
    }
}
