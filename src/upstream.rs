//! HTTP client for the upstream Azure-hosted model deployment.
//!
//! A [`FoundryClient`] is built once from the settings snapshot and cached in
//! [`crate::state::AppState`]; it is rebuilt only after an upstream failure
//! invalidates the cache. Because [`reqwest::Client`] holds an `Arc`
//! internally, cloning the cached handle per request is free.

use std::time::Duration;

use reqwest::{header, Client};
use serde_json::Value;

use crate::{config::Config, error::ApiError};

/// Client bound to one deployment of the upstream model API.
///
/// Requests go to
/// `{endpoint}/openai/deployments/{deployment}/{path}?api-version={version}`
/// with the credential in the `api-key` header.
#[derive(Debug)]
pub struct FoundryClient {
    http: Client,
    endpoint: String,
    deployment: String,
    api_version: String,
}

impl FoundryClient {
    /// Construct a client from the settings snapshot.
    ///
    /// Fails fast with [`ApiError::Configuration`] when the endpoint or
    /// credential is empty — no network call is ever attempted with a
    /// half-configured client.
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let missing = config.validate();
        if !missing.is_empty() {
            return Err(ApiError::Configuration(format!(
                "please check {}",
                missing.join(", ")
            )));
        }

        let mut headers = header::HeaderMap::new();
        let mut key = header::HeaderValue::from_str(&config.api_key).map_err(|_| {
            ApiError::Configuration(
                "AZURE_FOUNDRY_API_KEY contains invalid header characters".to_string(),
            )
        })?;
        key.set_sensitive(true);
        headers.insert("api-key", key);

        let http = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ApiError::Configuration(format!("building HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            deployment: config.deployment.clone(),
            api_version: config.api_version.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/openai/deployments/{}/{}?api-version={}",
            self.endpoint, self.deployment, path, self.api_version
        )
    }

    /// Forward a chat completions payload to the deployment.
    ///
    /// # Errors
    /// [`ApiError::Upstream`] on a non-2xx status (carrying the literal
    /// status code and body), [`ApiError::UpstreamTimeout`] when the call
    /// exceeds the configured timeout, [`ApiError::UpstreamUnavailable`] on
    /// any other transport failure. No retries.
    pub async fn chat_completions(&self, body: &Value) -> Result<Value, ApiError> {
        self.post("chat/completions", body).await
    }

    /// Forward an embeddings payload to the deployment.
    pub async fn embeddings(&self, body: &Value) -> Result<Value, ApiError> {
        self.post("embeddings", body).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        let url = self.url(path);
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        let text = response.text().await.map_err(classify_transport_error)?;

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), %url, "upstream returned an error");
            return Err(ApiError::Upstream { status: status.as_u16(), body: text });
        }

        serde_json::from_str(&text).map_err(|e| {
            ApiError::UpstreamUnavailable(format!("invalid JSON in upstream response: {e}"))
        })
    }
}

/// Map a transport-level reqwest error to the taxonomy: timeouts get their
/// own kind so callers can answer 504 instead of a generic failure.
fn classify_transport_error(e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::UpstreamTimeout
    } else {
        ApiError::UpstreamUnavailable(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn config_for(server: &MockServer) -> Config {
        let uri = server.uri();
        Config::from_lookup(|key| match key {
            "AZURE_FOUNDRY_ENDPOINT" => Some(uri.clone()),
            "AZURE_FOUNDRY_API_KEY" => Some("test-key".to_string()),
            "AZURE_FOUNDRY_DEPLOYMENT_NAME" => Some("gpt-4.1".to_string()),
            "REQUEST_TIMEOUT" => Some("2".to_string()),
            _ => None,
        })
    }

    fn completion_body() -> Value {
        json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1_700_000_000,
            "model": "gpt-4.1",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "hello"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 5, "completion_tokens": 2, "total_tokens": 7}
        })
    }

    // -----------------------------------------------------------------------
    // FoundryClient::new
    // -----------------------------------------------------------------------

    #[test]
    fn new_fails_fast_when_endpoint_and_key_are_missing() {
        let config = Config::from_lookup(|_| None);
        let err = FoundryClient::new(&config).unwrap_err();
        assert!(matches!(err, ApiError::Configuration(_)));
        assert!(err.to_string().contains("AZURE_FOUNDRY_ENDPOINT"));
        assert!(err.to_string().contains("AZURE_FOUNDRY_API_KEY"));
    }

    #[test]
    fn new_succeeds_with_required_fields_present() {
        let config = Config::from_lookup(|key| match key {
            "AZURE_FOUNDRY_ENDPOINT" => Some("https://x.openai.azure.com".to_string()),
            "AZURE_FOUNDRY_API_KEY" => Some("key".to_string()),
            _ => None,
        });
        assert!(FoundryClient::new(&config).is_ok());
    }

    // -----------------------------------------------------------------------
    // chat_completions
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn chat_completions_hits_deployment_path_with_api_key_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/openai/deployments/gpt-4.1/chat/completions"))
            .and(query_param("api-version", "2025-01-01-preview"))
            .and(header("api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body()))
            .expect(1)
            .mount(&server)
            .await;

        let client = FoundryClient::new(&config_for(&server)).unwrap();
        let result = client
            .chat_completions(&json!({"messages": [], "stream": false}))
            .await;
        assert!(result.is_ok(), "expected Ok, got: {result:?}");
    }

    #[tokio::test]
    async fn chat_completions_surfaces_upstream_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/openai/deployments/gpt-4.1/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("backend exploded"))
            .mount(&server)
            .await;

        let client = FoundryClient::new(&config_for(&server)).unwrap();
        let err = client.chat_completions(&json!({})).await.unwrap_err();

        match err {
            ApiError::Upstream { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "backend exploded");
            }
            other => panic!("expected Upstream, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn chat_completions_classifies_timeout_distinctly() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/openai/deployments/gpt-4.1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion_body())
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let uri = server.uri();
        let config = Config::from_lookup(|key| match key {
            "AZURE_FOUNDRY_ENDPOINT" => Some(uri.clone()),
            "AZURE_FOUNDRY_API_KEY" => Some("test-key".to_string()),
            "REQUEST_TIMEOUT" => Some("1".to_string()),
            _ => None,
        });

        let client = FoundryClient::new(&config).unwrap();
        let err = client.chat_completions(&json!({})).await.unwrap_err();
        assert!(matches!(err, ApiError::UpstreamTimeout), "got: {err:?}");
    }

    #[tokio::test]
    async fn connection_refusal_is_upstream_unavailable_not_timeout() {
        // Port 1 is reserved and never responds — guaranteed connection refusal.
        let config = Config::from_lookup(|key| match key {
            "AZURE_FOUNDRY_ENDPOINT" => Some("http://127.0.0.1:1".to_string()),
            "AZURE_FOUNDRY_API_KEY" => Some("test-key".to_string()),
            _ => None,
        });
        let client = FoundryClient::new(&config).unwrap();
        let err = client.chat_completions(&json!({})).await.unwrap_err();
        assert!(matches!(err, ApiError::UpstreamUnavailable(_)), "got: {err:?}");
    }

    #[tokio::test]
    async fn invalid_json_response_body_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/openai/deployments/gpt-4.1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not valid json {{{{"))
            .mount(&server)
            .await;

        let client = FoundryClient::new(&config_for(&server)).unwrap();
        let err = client.chat_completions(&json!({})).await.unwrap_err();
        assert!(err.to_string().to_lowercase().contains("json"), "got: {err}");
    }

    // -----------------------------------------------------------------------
    // embeddings
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn embeddings_hits_embeddings_path() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/openai/deployments/gpt-4.1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"index": 0, "embedding": [0.1, 0.2]}],
                "model": "text-embedding-ada-002",
                "usage": {"prompt_tokens": 3, "total_tokens": 3}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = FoundryClient::new(&config_for(&server)).unwrap();
        let result = client.embeddings(&json!({"input": "hello"})).await;
        assert!(result.is_ok(), "expected Ok, got: {result:?}");
    }
}
