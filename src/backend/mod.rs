//! Text-generation backends
//!
//! The relay talks to the backend through the [`Backend`] trait so handlers
//! can be exercised without a model runtime.

mod ollama;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use ollama::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT, OllamaBackend};

use crate::Result;

/// Sampling options forwarded to the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateOptions {
    pub temperature: f64,

    /// Maximum number of tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<i64>,
}

/// Non-streaming generation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
    pub options: GenerateOptions,
}

/// Generation result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerateResponse {
    /// Generated text
    #[serde(default)]
    pub response: String,

    /// Number of tokens evaluated for the response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_count: Option<u64>,
}

/// A model installed in the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendModel {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// Local text-generation service
#[async_trait]
pub trait Backend: Send + Sync {
    /// Generate a completion for a single prompt
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse>;

    /// List models installed in the backend
    async fn list_models(&self) -> Result<Vec<BackendModel>>;
}
