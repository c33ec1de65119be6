//! Request and response wire types.
//!
//! Inbound shapes are validated twice: serde enforces structure (unknown
//! roles, wrong types) at deserialization, and [`GenerationParams::validate`]
//! enforces the numeric ranges afterwards — both before any upstream call is
//! attempted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Role of a chat message. Anything outside this set is rejected at
/// deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// A single message in a conversation. Messages never mutate after creation;
/// the ordered sequence *is* the conversation.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }
}

/// Generation parameters shared by the chat and generate paths.
///
/// Every field is optional; defaults from [`crate::config::Config`] are
/// applied only when a field is absent, never overriding an explicit value.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GenerationParams {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub frequency_penalty: Option<f64>,
    pub presence_penalty: Option<f64>,
    pub stop: Option<Vec<String>>,
}

impl GenerationParams {
    /// Enforce the declared field constraints:
    /// max_tokens ∈ [1, 4000], temperature ∈ [0, 2], top_p ∈ [0, 1],
    /// penalties ∈ [-2, 2].
    pub fn validate(&self) -> Result<(), ApiError> {
        if let Some(max_tokens) = self.max_tokens {
            if !(1..=4000).contains(&max_tokens) {
                return Err(ApiError::Validation(format!(
                    "max_tokens must be between 1 and 4000, got {max_tokens}"
                )));
            }
        }
        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(ApiError::Validation(format!(
                    "temperature must be between 0.0 and 2.0, got {temperature}"
                )));
            }
        }
        if let Some(top_p) = self.top_p {
            if !(0.0..=1.0).contains(&top_p) {
                return Err(ApiError::Validation(format!(
                    "top_p must be between 0.0 and 1.0, got {top_p}"
                )));
            }
        }
        if let Some(penalty) = self.frequency_penalty {
            if !(-2.0..=2.0).contains(&penalty) {
                return Err(ApiError::Validation(format!(
                    "frequency_penalty must be between -2.0 and 2.0, got {penalty}"
                )));
            }
        }
        if let Some(penalty) = self.presence_penalty {
            if !(-2.0..=2.0).contains(&penalty) {
                return Err(ApiError::Validation(format!(
                    "presence_penalty must be between -2.0 and 2.0, got {penalty}"
                )));
            }
        }
        Ok(())
    }
}

/// `POST /api/v1/chat/completions` request body.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatRequest {
    /// Ordered conversation; forwarded verbatim (plus the optional configured
    /// preamble) to the upstream API.
    pub messages: Vec<ChatMessage>,
    /// Optional model name override for the response envelope.
    pub model: Option<String>,
    #[serde(flatten)]
    pub params: GenerationParams,
}

/// One completion choice, index and order preserved from upstream.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Choice {
    pub index: u32,
    pub message: ChatMessage,
    pub finish_reason: Option<String>,
}

/// Token accounting. Defaults to all-zero when upstream omits usage.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

/// `POST /api/v1/chat/completions` response envelope.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatResponse {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<Choice>,
    pub usage: Usage,
}

/// `POST /api/v1/generate` request body — a single prompt, no history.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerateRequest {
    pub prompt: String,
    pub model: Option<String>,
    #[serde(flatten)]
    pub params: GenerationParams,
}

/// `POST /api/v1/generate` response envelope.
///
/// Deliberately simpler than [`ChatResponse`]: single-turn callers get the
/// text directly instead of a choices array.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerateResponse {
    pub generated_text: String,
    pub model: String,
    pub timestamp: DateTime<Utc>,
    pub tokens_used: Option<u32>,
    pub generation_type: String,
}

/// `POST /api/v1/embeddings` request body.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingRequest {
    pub input: String,
    pub model: Option<String>,
}

/// `POST /api/v1/embeddings` response envelope.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingResponse {
    pub embedding: Vec<f64>,
    pub model: String,
    pub timestamp: DateTime<Utc>,
    pub tokens_used: Option<u32>,
}

/// Static catalog entry returned by `GET /api/v1/models`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelInfo {
    pub id: String,
    pub object: String,
    pub owned_by: String,
}

/// The fixed in-memory model catalog. Never derived from a live upstream
/// query — `GET /api/v1/models` must work with upstream down.
pub fn model_catalog() -> Vec<ModelInfo> {
    vec![
        ModelInfo {
            id: "gpt-4.1".to_string(),
            object: "model".to_string(),
            owned_by: "azure-foundry".to_string(),
        },
        ModelInfo {
            id: "gpt-35-turbo".to_string(),
            object: "model".to_string(),
            owned_by: "azure-foundry".to_string(),
        },
    ]
}
