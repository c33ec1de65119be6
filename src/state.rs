//! Shared application state injected into every handler via
//! [`axum::extract::State`].
//!
//! The only mutable piece is the cached upstream client. It is read-mostly
//! and replaced atomically: the lock is held just long enough to clone or
//! swap an `Arc`, never across an `.await`. After an upstream failure the
//! cache is cleared so the next request rebuilds the client; two requests
//! racing to rebuild is harmless — both builds succeed and the last write
//! wins.

use std::sync::{Arc, RwLock};

use crate::{config::Config, error::ApiError, upstream::FoundryClient};

pub struct AppState {
    /// Settings snapshot, loaded once at process start.
    pub config: Arc<Config>,
    /// At most one live client per settings snapshot, built lazily.
    client: RwLock<Option<Arc<FoundryClient>>>,
    /// Process start time, reported by the health endpoint.
    pub started_at: std::time::Instant,
}

impl AppState {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            client: RwLock::new(None),
            started_at: std::time::Instant::now(),
        }
    }

    /// The cached upstream client, building it on first use.
    ///
    /// # Errors
    /// [`ApiError::Configuration`] when the endpoint or credential is
    /// missing — surfaced before any network call.
    pub fn client(&self) -> Result<Arc<FoundryClient>, ApiError> {
        if let Some(client) = self.client.read().expect("client lock poisoned").as_ref() {
            return Ok(Arc::clone(client));
        }

        let built = Arc::new(FoundryClient::new(&self.config)?);
        *self.client.write().expect("client lock poisoned") = Some(Arc::clone(&built));
        tracing::debug!("upstream client built");
        Ok(built)
    }

    /// Drop the cached client so the next call rebuilds it.
    ///
    /// Invoked whenever a call against the current client fails, so a stale
    /// or broken client is never reused.
    pub fn invalidate_client(&self) {
        *self.client.write().expect("client lock poisoned") = None;
        tracing::debug!("upstream client cache invalidated");
    }

    #[cfg(test)]
    pub(crate) fn has_cached_client(&self) -> bool {
        self.client.read().expect("client lock poisoned").is_some()
    }
}
