//! HTTP client for the chat relay

use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use super::RobotConfig;
use crate::{Error, Result};

/// Body sent to `POST /chat`
#[derive(Debug, Serialize)]
struct RelayRequest<'a> {
    message: &'a str,
    json_mode: bool,
    low_memory: bool,
}

/// Talks to the relay server on behalf of the robot
#[derive(Debug, Clone)]
pub struct RelayClient {
    api_url: String,
    auth_token: String,
    client: Client,
}

impl RelayClient {
    /// Build a client from the robot config
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client can't be constructed
    pub fn new(config: &RobotConfig) -> Result<Self> {
        let client = Client::builder()
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;

        Ok(Self {
            api_url: config.api_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
            client,
        })
    }

    /// Ask the relay and return its text reply
    ///
    /// Never fails: problems come back as an "Error communicating with AI"
    /// sentence so the robot can say it out loud.
    pub async fn send_message(&self, message: &str) -> String {
        match self.try_send(message).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(error = %e, "relay call failed");
                format!("Error communicating with AI: {e}")
            }
        }
    }

    async fn try_send(&self, message: &str) -> Result<String> {
        let body: Value = self
            .client
            .post(format!("{}/chat", self.api_url))
            .bearer_auth(&self.auth_token)
            .json(&RelayRequest {
                message,
                json_mode: false,
                low_memory: true,
            })
            .send()
            .await?
            .json()
            .await?;

        reply_text(&body).ok_or_else(|| {
            Error::Backend(format!("relay reply has no response.response field: {body}"))
        })
    }

    /// Fetch the relay's `/status` body
    ///
    /// # Errors
    ///
    /// Returns error if the relay is unreachable or the body isn't JSON
    pub async fn status(&self) -> Result<Value> {
        Ok(self
            .client
            .get(format!("{}/status", self.api_url))
            .send()
            .await?
            .json()
            .await?)
    }
}

/// Pull `response.response` out of a chat reply
fn reply_text(body: &Value) -> Option<String> {
    match body.pointer("/response/response")? {
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}
