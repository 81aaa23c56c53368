//! Ollama HTTP backend

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{Backend, BackendModel, GenerateRequest, GenerateResponse};
use crate::{Error, Result};

/// Default Ollama address
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Timeout applied to generation calls
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Client for an Ollama-compatible runtime
///
/// See: <https://github.com/ollama/ollama/blob/main/docs/api.md>
#[derive(Debug, Clone)]
pub struct OllamaBackend {
    base_url: String,
    timeout: Duration,
    client: Client,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<BackendModel>,
}

impl OllamaBackend {
    /// Create a backend for `base_url` with the given generation timeout
    #[must_use]
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            timeout,
            client: Client::new(),
        }
    }

    /// Base URL of the runtime
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Default for OllamaBackend {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, DEFAULT_TIMEOUT)
    }
}

#[async_trait]
impl Backend for OllamaBackend {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
        let url = format!("{}/api/generate", self.base_url);

        tracing::debug!(model = %request.model, prompt_len = request.prompt.len(), "calling backend");

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| Error::Backend(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Backend(format!("backend returned {status}: {body}")));
        }

        response
            .json::<GenerateResponse>()
            .await
            .map_err(|e| Error::Backend(format!("invalid generate response: {e}")))
    }

    async fn list_models(&self) -> Result<Vec<BackendModel>> {
        let url = format!("{}/api/tags", self.base_url);

        let tags: TagsResponse = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Backend(format!("request to {url} failed: {e}")))?
            .json()
            .await
            .map_err(|e| Error::Backend(format!("invalid tags response: {e}")))?;

        Ok(tags.models)
    }
}
