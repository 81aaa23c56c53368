//! Configuration management for the relay server
//!
//! Values resolve as env > TOML file > default.

pub mod file;

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::backend;

/// Default bind address
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default API server port
pub const DEFAULT_PORT: u16 = 8000;

/// Default model registry path, relative to the working directory
pub const DEFAULT_MODELS_FILE: &str = "config/models.json";

/// Bearer token used when none is configured
pub const DEFAULT_AUTH_TOKEN: &str = "free-tier-token";

/// Relay server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Path to the model registry JSON file
    pub models_file: PathBuf,

    /// Generation backend settings
    pub backend: BackendConfig,

    /// Expected bearer token for mutating and chat endpoints
    /// (from `AI_ASSISTANT_TOKEN`)
    pub auth_token: String,
}

/// Generation backend configuration
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Ollama base URL
    pub base_url: String,

    /// Timeout for generation calls
    pub timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            models_file: PathBuf::from(DEFAULT_MODELS_FILE),
            backend: BackendConfig {
                base_url: backend::DEFAULT_BASE_URL.to_string(),
                timeout: backend::DEFAULT_TIMEOUT,
            },
            auth_token: DEFAULT_AUTH_TOKEN.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the environment and the TOML file
    ///
    /// `config_path` overrides the standard `~/.config/cruddy/config.toml`.
    #[must_use]
    pub fn load(config_path: Option<&Path>) -> Self {
        let fc = file::load_config_file(config_path);
        Self::resolve(fc, |key| std::env::var(key).ok())
    }

    /// Merge a parsed config file with an environment lookup
    #[must_use]
    pub fn resolve(fc: file::CruddyConfigFile, env: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let host = env("CRUDDY_HOST")
            .or(fc.server.host)
            .unwrap_or(defaults.host);

        let port = env("CRUDDY_PORT")
            .and_then(|s| s.parse().ok())
            .or(fc.server.port)
            .unwrap_or(defaults.port);

        let models_file = env("CRUDDY_MODELS_FILE")
            .or(fc.server.models_file)
            .map_or(defaults.models_file, PathBuf::from);

        let base_url = env("OLLAMA_BASE_URL")
            .or(fc.backend.base_url)
            .unwrap_or(defaults.backend.base_url);

        let timeout = env("CRUDDY_BACKEND_TIMEOUT_SECS")
            .and_then(|s| s.parse().ok())
            .or(fc.backend.timeout_secs)
            .map_or(defaults.backend.timeout, Duration::from_secs);

        let auth_token = env("AI_ASSISTANT_TOKEN")
            .or(fc.auth.token)
            .unwrap_or(defaults.auth_token);

        Self {
            host,
            port,
            models_file,
            backend: BackendConfig { base_url, timeout },
            auth_token,
        }
    }

    /// Socket address string to bind
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
