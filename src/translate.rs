//! Request/response translation — the observable contract of the service.
//!
//! Each operation builds the upstream payload from the validated request,
//! makes exactly one upstream call, and reshapes the result into this
//! service's envelope:
//!
//! - **Chat**: the caller's messages are forwarded verbatim and in order
//!   (behind the optional configured preamble); `stream` is forced to false.
//!   Upstream choices come back with order and indices unchanged.
//! - **Generate**: a two-message conversation is synthesized (generation
//!   system instruction + the prompt) and pushed through the same chat
//!   mechanism; the envelope is the flatter `generated_text` shape.
//! - **Embed**: `{input, model}` forwarded, vector extracted.
//!
//! Any upstream-originated failure invalidates the cached client before
//! propagating, so a broken client is never reused.

use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    config::Config,
    error::ApiError,
    models::{
        ChatMessage, ChatRequest, ChatResponse, Choice, EmbeddingRequest, EmbeddingResponse,
        GenerateRequest, GenerateResponse, GenerationParams, Usage,
    },
    state::AppState,
};

/// System instruction synthesized for the generate path. Single-turn callers
/// never supply their own system message.
const GENERATE_SYSTEM_INSTRUCTION: &str =
    "You are a helpful AI assistant focused on generating high-quality text content.";

const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";

/// Upstream chat-completions response, parsed leniently: every field the
/// reshaping can substitute is optional so a sparse upstream answer degrades
/// instead of failing.
#[derive(Debug, Deserialize)]
struct UpstreamCompletion {
    id: Option<String>,
    object: Option<String>,
    created: Option<i64>,
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct UpstreamEmbeddings {
    #[serde(default)]
    data: Vec<UpstreamEmbeddingItem>,
    model: Option<String>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct UpstreamEmbeddingItem {
    embedding: Vec<f64>,
}

/// Chat completion: forward the conversation, reshape the answer.
#[tracing::instrument(skip(state, req), fields(messages = req.messages.len()))]
pub async fn chat(state: &AppState, req: ChatRequest) -> Result<ChatResponse, ApiError> {
    let client = state.client()?;
    let messages = compose_messages(&state.config, &req.messages);
    let payload = build_chat_payload(&state.config, &messages, &req.params);

    let raw = guard_upstream(state, client.chat_completions(&payload).await)?;

    let fallback_model = req
        .model
        .unwrap_or_else(|| state.config.deployment.clone());
    reshape_chat(raw, &fallback_model)
}

/// Single-turn text generation through the chat mechanism.
#[tracing::instrument(skip(state, req))]
pub async fn generate(state: &AppState, req: GenerateRequest) -> Result<GenerateResponse, ApiError> {
    let client = state.client()?;
    let messages = vec![
        ChatMessage::system(GENERATE_SYSTEM_INSTRUCTION),
        ChatMessage::user(req.prompt.as_str()),
    ];
    let payload = build_chat_payload(&state.config, &messages, &req.params);

    let raw = guard_upstream(state, client.chat_completions(&payload).await)?;

    let completion: UpstreamCompletion = parse_upstream(raw)?;
    let generated_text = completion
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("upstream returned no choices")))?;

    Ok(GenerateResponse {
        generated_text,
        model: req.model.unwrap_or_else(|| state.config.deployment.clone()),
        timestamp: Utc::now(),
        tokens_used: completion.usage.map(|u| u.total_tokens),
        generation_type: "text_completion".to_string(),
    })
}

/// Embedding generation.
#[tracing::instrument(skip(state, req))]
pub async fn embed(state: &AppState, req: EmbeddingRequest) -> Result<EmbeddingResponse, ApiError> {
    let client = state.client()?;
    let model = req
        .model
        .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string());
    let payload = json!({ "input": req.input, "model": model });

    let raw = guard_upstream(state, client.embeddings(&payload).await)?;

    let parsed: UpstreamEmbeddings = parse_upstream(raw)?;
    let embedding = parsed
        .data
        .into_iter()
        .next()
        .map(|item| item.embedding)
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("upstream returned no embedding data")))?;

    Ok(EmbeddingResponse {
        embedding,
        model: parsed.model.unwrap_or(model),
        timestamp: Utc::now(),
        tokens_used: parsed.usage.map(|u| u.total_tokens),
    })
}

/// Prepend the configured system preamble (if any); caller messages always
/// follow verbatim and in order.
fn compose_messages(config: &Config, caller: &[ChatMessage]) -> Vec<ChatMessage> {
    match &config.system_preamble {
        Some(preamble) => {
            let mut messages = Vec::with_capacity(caller.len() + 1);
            messages.push(ChatMessage::system(preamble.as_str()));
            messages.extend_from_slice(caller);
            messages
        }
        None => caller.to_vec(),
    }
}

/// Build the upstream chat-completions payload.
///
/// Configured defaults fill only absent fields; an explicit caller value is
/// never overridden. `stream` is always false — streaming is not supported
/// regardless of what the caller asked for.
fn build_chat_payload(config: &Config, messages: &[ChatMessage], params: &GenerationParams) -> Value {
    let mut payload = json!({
        "messages": messages,
        "max_tokens": params.max_tokens.unwrap_or(config.default_max_tokens),
        "temperature": params.temperature.unwrap_or(config.default_temperature),
        "top_p": params.top_p.unwrap_or(config.default_top_p),
        "frequency_penalty": params.frequency_penalty.unwrap_or(0.0),
        "presence_penalty": params.presence_penalty.unwrap_or(0.0),
        "stream": false,
    });
    if let Some(stop) = &params.stop {
        payload["stop"] = json!(stop);
    }
    payload
}

/// Map upstream choices and usage into the service envelope, preserving
/// choice order and indices unchanged. Absent usage becomes zero counts.
fn reshape_chat(raw: Value, fallback_model: &str) -> Result<ChatResponse, ApiError> {
    let completion: UpstreamCompletion = parse_upstream(raw)?;
    Ok(ChatResponse {
        id: completion
            .id
            .unwrap_or_else(|| format!("chatcmpl-{}", Uuid::new_v4())),
        object: completion
            .object
            .unwrap_or_else(|| "chat.completion".to_string()),
        created: completion.created.unwrap_or_else(|| Utc::now().timestamp()),
        model: completion
            .model
            .unwrap_or_else(|| fallback_model.to_string()),
        choices: completion.choices,
        usage: completion.usage.unwrap_or_default(),
    })
}

fn parse_upstream<T: serde::de::DeserializeOwned>(raw: Value) -> Result<T, ApiError> {
    serde_json::from_value(raw)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("unexpected upstream response shape: {e}")))
}

/// Pass an upstream result through, invalidating the cached client on any
/// upstream-originated error so the next request rebuilds it.
fn guard_upstream(state: &AppState, result: Result<Value, ApiError>) -> Result<Value, ApiError> {
    result.inspect_err(|e| {
        if e.is_upstream() {
            state.invalidate_client();
        }
    })
}
