//! Chat relay: model resolution, prompt formatting, backend call, response parsing

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::backend::{Backend, GenerateOptions, GenerateRequest};
use crate::registry::ModelRegistry;
use crate::Result;

/// Token ceiling applied in low memory mode
pub const LOW_MEMORY_MAX_TOKENS: i64 = 512;

/// Token cap used when a `/chat` request doesn't set one
pub const DEFAULT_MAX_TOKENS: i64 = 1000;

const fn default_max_tokens() -> Option<i64> {
    Some(DEFAULT_MAX_TOKENS)
}

const fn default_optimized_max_tokens() -> Option<i64> {
    Some(LOW_MEMORY_MAX_TOKENS)
}

const fn default_true() -> bool {
    true
}

/// Body of `POST /chat`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,

    /// Registry key overriding the active model
    #[serde(default)]
    pub model: Option<String>,

    #[serde(default)]
    pub temperature: Option<f64>,

    /// Forwarded as `num_predict` without range checks
    #[serde(default = "default_max_tokens")]
    pub max_tokens: Option<i64>,

    /// Ask the model for JSON and try to parse its answer
    #[serde(default = "default_true")]
    pub json_mode: bool,

    /// Clamp `max_tokens` to [`LOW_MEMORY_MAX_TOKENS`]
    #[serde(default)]
    pub low_memory: bool,
}

impl ChatRequest {
    /// Plain-text request with default settings
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            model: None,
            temperature: None,
            max_tokens: default_max_tokens(),
            json_mode: true,
            low_memory: false,
        }
    }
}

/// Body of `POST /chat/optimized`
///
/// Same fields as [`ChatRequest`] with a smaller default token cap and an
/// extra low memory switch that is on by default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizedChatRequest {
    pub message: String,

    #[serde(default)]
    pub model: Option<String>,

    #[serde(default)]
    pub temperature: Option<f64>,

    #[serde(default = "default_optimized_max_tokens")]
    pub max_tokens: Option<i64>,

    #[serde(default = "default_true")]
    pub json_mode: bool,

    #[serde(default)]
    pub low_memory: bool,

    #[serde(default = "default_true")]
    pub low_memory_mode: bool,
}

impl From<OptimizedChatRequest> for ChatRequest {
    fn from(req: OptimizedChatRequest) -> Self {
        Self {
            message: req.message,
            model: req.model,
            temperature: req.temperature,
            max_tokens: effective_max_tokens(req.max_tokens, req.low_memory_mode),
            json_mode: req.json_mode,
            low_memory: req.low_memory,
        }
    }
}

/// Body returned by the chat endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Parsed JSON object, or `{"response": <raw text>}`
    pub response: Value,

    /// Registry key of the model that answered
    pub model_used: String,

    pub tokens_used: Option<u64>,
}

/// Token cap sent to the backend
///
/// Low memory mode always sends a cap, even when none was requested.
#[must_use]
pub fn effective_max_tokens(requested: Option<i64>, low_memory: bool) -> Option<i64> {
    if low_memory {
        Some(requested.map_or(LOW_MEMORY_MAX_TOKENS, |tokens| tokens.min(LOW_MEMORY_MAX_TOKENS)))
    } else {
        requested
    }
}

/// Build the backend prompt for a message
#[must_use]
pub fn build_prompt(message: &str, json_mode: bool) -> String {
    if !json_mode {
        return message.to_string();
    }

    format!(
        "Please provide a JSON-structured response for the following request.\n\
         The response should be valid JSON and include relevant information.\n\
         \n\
         Request: {message}\n\
         \n\
         Respond with JSON only:"
    )
}

/// Return the trimmed body of the first ```` ```json ```` block, if any
///
/// An unterminated block runs to the end of the text.
#[must_use]
pub fn extract_fenced_json(text: &str) -> Option<&str> {
    let (_, rest) = text.split_once("```json")?;
    let body = rest.split_once("```").map_or(rest, |(body, _)| body);
    Some(body.trim())
}

/// Turn backend text into the response payload
///
/// In JSON mode a fenced block wins over the whole text. Anything that
/// doesn't parse to a JSON object degrades to `{"response": text}`.
#[must_use]
pub fn parse_payload(text: &str, json_mode: bool) -> Value {
    if json_mode {
        let candidate = extract_fenced_json(text).unwrap_or(text);
        match serde_json::from_str::<Value>(candidate) {
            Ok(value @ Value::Object(_)) => return value,
            Ok(_) => tracing::debug!("backend returned non-object JSON, wrapping raw text"),
            Err(e) => tracing::debug!(error = %e, "backend text is not JSON, wrapping raw text"),
        }
    }

    wrap_text(text)
}

fn wrap_text(text: &str) -> Value {
    let mut map = Map::new();
    map.insert("response".to_string(), Value::String(text.to_string()));
    Value::Object(map)
}

/// Forwards chat requests to the backend using the model registry
#[derive(Clone)]
pub struct ChatRelay {
    registry: Arc<ModelRegistry>,
    backend: Arc<dyn Backend>,
}

impl ChatRelay {
    #[must_use]
    pub fn new(registry: Arc<ModelRegistry>, backend: Arc<dyn Backend>) -> Self {
        Self { registry, backend }
    }

    #[must_use]
    pub const fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    #[must_use]
    pub const fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /// Run one chat turn
    ///
    /// # Errors
    ///
    /// Returns `ModelNotFound` for an unknown model override (or active key),
    /// `Backend` if the generation call fails, or a registry load error
    pub async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let max_tokens = effective_max_tokens(request.max_tokens, request.low_memory);

        let override_key = request.model.as_deref().filter(|key| !key.is_empty());
        let (model_key, entry) = self.registry.resolve(override_key).await?;

        // A zero temperature counts as unset
        let temperature = request
            .temperature
            .filter(|t| t.abs() > f64::EPSILON)
            .unwrap_or_else(|| entry.temperature());

        tracing::info!(
            model = %model_key,
            backend_model = %entry.name,
            json_mode = request.json_mode,
            low_memory = request.low_memory,
            ?max_tokens,
            "relaying chat request"
        );

        let generate = GenerateRequest {
            model: entry.name,
            prompt: build_prompt(&request.message, request.json_mode),
            stream: false,
            options: GenerateOptions {
                temperature,
                num_predict: max_tokens,
            },
        };

        let result = self.backend.generate(&generate).await.inspect_err(|e| {
            tracing::error!(error = %e, "error calling backend");
        })?;

        Ok(ChatResponse {
            response: parse_payload(&result.response, request.json_mode),
            model_used: model_key,
            tokens_used: result.eval_count,
        })
    }
}
