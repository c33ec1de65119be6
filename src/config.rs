//! Configuration for foundry-relay.
//!
//! The whole configuration is an immutable snapshot of process environment
//! variables, read exactly once at startup by [`Config::from_env`] and passed
//! down by reference. No other module touches the environment — handlers and
//! the upstream client only ever see the snapshot they were given.
//!
//! Missing required values are *not* fatal at load time: [`Config::validate`]
//! reports them and `main` logs a warning, but the server still starts so
//! `/health` and `/api/v1/models` keep working. The hole surfaces as a
//! configuration error the first time a request actually needs the upstream
//! client.

/// Immutable settings snapshot.
///
/// Required for upstream calls: `endpoint`, `api_key`, `deployment`.
/// Everything else has a documented default.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the Azure-hosted deployment, e.g.
    /// `https://my-resource.openai.azure.com` (`AZURE_FOUNDRY_ENDPOINT`).
    pub endpoint: String,

    /// API credential sent as the `api-key` header (`AZURE_FOUNDRY_API_KEY`).
    pub api_key: String,

    /// Deployment/model name selecting the hosted model instance
    /// (`AZURE_FOUNDRY_DEPLOYMENT_NAME`, default `gpt-4.1`).
    pub deployment: String,

    /// Upstream API version query parameter
    /// (`AZURE_FOUNDRY_API_VERSION`, default `2025-01-01-preview`).
    pub api_version: String,

    /// Bind host (`HOST`, default `0.0.0.0`).
    pub host: String,

    /// Bind port (`PORT`, default 8000).
    pub port: u16,

    /// Upstream request timeout in seconds (`REQUEST_TIMEOUT`, default 30).
    pub request_timeout_secs: u64,

    /// Default `max_tokens` when the caller omits it
    /// (`DEFAULT_MAX_TOKENS`, default 1000).
    pub default_max_tokens: u32,

    /// Default sampling temperature (`DEFAULT_TEMPERATURE`, default 0.7).
    pub default_temperature: f64,

    /// Default nucleus sampling parameter (`DEFAULT_TOP_P`, default 0.95).
    pub default_top_p: f64,

    /// Allowed CORS origins, comma-separated (`ALLOWED_ORIGINS`).
    /// `*` (the default) allows any origin.
    pub allowed_origins: Vec<String>,

    /// Log level fallback when `RUST_LOG` is unset (`LOG_LEVEL`, default `info`).
    pub log_level: String,

    /// Optional system message prepended to every chat conversation
    /// (`SYSTEM_PREAMBLE`). Unset means caller messages are forwarded
    /// verbatim with no synthetic preamble.
    pub system_preamble: Option<String>,
}

impl Config {
    /// Read the configuration snapshot from process environment variables.
    ///
    /// This is the only place in the binary that reads the environment
    /// (besides `RUST_LOG`, which `tracing-subscriber` owns).
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    ///
    /// Exists so tests can exercise parsing and defaults without mutating
    /// process environment (which races under the parallel test runner).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        Self {
            endpoint: get("AZURE_FOUNDRY_ENDPOINT")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_default(),
            api_key: get("AZURE_FOUNDRY_API_KEY").unwrap_or_default(),
            deployment: get("AZURE_FOUNDRY_DEPLOYMENT_NAME")
                .unwrap_or_else(|| defaults::DEPLOYMENT.to_string()),
            api_version: get("AZURE_FOUNDRY_API_VERSION")
                .unwrap_or_else(|| defaults::API_VERSION.to_string()),
            host: get("HOST").unwrap_or_else(|| defaults::HOST.to_string()),
            port: parse_or(get("PORT"), defaults::PORT),
            request_timeout_secs: parse_or(get("REQUEST_TIMEOUT"), defaults::REQUEST_TIMEOUT_SECS),
            default_max_tokens: parse_or(get("DEFAULT_MAX_TOKENS"), defaults::MAX_TOKENS),
            default_temperature: parse_or(get("DEFAULT_TEMPERATURE"), defaults::TEMPERATURE),
            default_top_p: parse_or(get("DEFAULT_TOP_P"), defaults::TOP_P),
            allowed_origins: get("ALLOWED_ORIGINS")
                .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_else(|| vec!["*".to_string()]),
            log_level: get("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            system_preamble: get("SYSTEM_PREAMBLE"),
        }
    }

    /// Names of required environment variables that are missing or empty.
    ///
    /// Deliberately returns a list instead of erroring — the caller decides
    /// whether absence is fatal. An empty vec means the upstream client can
    /// be constructed.
    pub fn validate(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.endpoint.is_empty() {
            missing.push("AZURE_FOUNDRY_ENDPOINT");
        }
        if self.api_key.is_empty() {
            missing.push("AZURE_FOUNDRY_API_KEY");
        }
        if self.deployment.is_empty() {
            missing.push("AZURE_FOUNDRY_DEPLOYMENT_NAME");
        }
        missing
    }
}

/// Parse an optional string value, falling back to `default` on absence
/// or parse failure. A malformed override is worth a log line, not a crash.
fn parse_or<T: std::str::FromStr + Copy>(value: Option<String>, default: T) -> T {
    match value {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(%raw, "unparseable config value — using default");
            default
        }),
        None => default,
    }
}

mod defaults {
    pub const DEPLOYMENT: &str = "gpt-4.1";
    pub const API_VERSION: &str = "2025-01-01-preview";
    pub const HOST: &str = "0.0.0.0";
    pub const PORT: u16 = 8000;
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;
    pub const MAX_TOKENS: u32 = 1000;
    pub const TEMPERATURE: f64 = 0.7;
    pub const TOP_P: f64 = 0.95;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    fn full_config() -> Config {
        config_from(&[
            ("AZURE_FOUNDRY_ENDPOINT", "https://example.openai.azure.com"),
            ("AZURE_FOUNDRY_API_KEY", "test-key"),
            ("AZURE_FOUNDRY_DEPLOYMENT_NAME", "gpt-4.1"),
        ])
    }

    // -----------------------------------------------------------------------
    // Defaults
    // -----------------------------------------------------------------------

    #[test]
    fn defaults_applied_when_environment_is_empty() {
        let config = config_from(&[]);
        assert_eq!(config.deployment, "gpt-4.1");
        assert_eq!(config.api_version, "2025-01-01-preview");
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8000);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.default_max_tokens, 1000);
        assert_eq!(config.default_temperature, 0.7);
        assert_eq!(config.default_top_p, 0.95);
        assert_eq!(config.allowed_origins, vec!["*".to_string()]);
        assert!(config.system_preamble.is_none());
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config = config_from(&[
            ("PORT", "9090"),
            ("REQUEST_TIMEOUT", "5"),
            ("DEFAULT_MAX_TOKENS", "256"),
            ("DEFAULT_TEMPERATURE", "0.2"),
            ("SYSTEM_PREAMBLE", "You are a helpful AI assistant."),
        ]);
        assert_eq!(config.port, 9090);
        assert_eq!(config.request_timeout_secs, 5);
        assert_eq!(config.default_max_tokens, 256);
        assert_eq!(config.default_temperature, 0.2);
        assert_eq!(
            config.system_preamble.as_deref(),
            Some("You are a helpful AI assistant.")
        );
    }

    #[test]
    fn unparseable_numeric_value_falls_back_to_default() {
        let config = config_from(&[("PORT", "not-a-port")]);
        assert_eq!(config.port, 8000);
    }

    #[test]
    fn endpoint_trailing_slash_is_trimmed() {
        let config = config_from(&[("AZURE_FOUNDRY_ENDPOINT", "https://x.azure.com/")]);
        assert_eq!(config.endpoint, "https://x.azure.com");
    }

    #[test]
    fn allowed_origins_splits_and_trims_commas() {
        let config = config_from(&[(
            "ALLOWED_ORIGINS",
            "http://localhost:3000, https://app.example.com",
        )]);
        assert_eq!(
            config.allowed_origins,
            vec![
                "http://localhost:3000".to_string(),
                "https://app.example.com".to_string()
            ]
        );
    }

    // -----------------------------------------------------------------------
    // validate()
    // -----------------------------------------------------------------------

    #[test]
    fn validate_passes_when_required_fields_are_present() {
        assert!(full_config().validate().is_empty());
    }

    #[test]
    fn validate_lists_every_missing_required_field() {
        let missing = config_from(&[]).validate();
        assert!(missing.contains(&"AZURE_FOUNDRY_ENDPOINT"));
        assert!(missing.contains(&"AZURE_FOUNDRY_API_KEY"));
        // deployment has a default, so it is never reported missing here
        assert!(!missing.contains(&"AZURE_FOUNDRY_DEPLOYMENT_NAME"));
    }

    #[test]
    fn validate_treats_empty_string_as_missing() {
        let missing = config_from(&[
            ("AZURE_FOUNDRY_ENDPOINT", ""),
            ("AZURE_FOUNDRY_API_KEY", "key"),
        ])
        .validate();
        assert_eq!(missing, vec!["AZURE_FOUNDRY_ENDPOINT"]);
    }
}
