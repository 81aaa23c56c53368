//! TOML configuration file loading
//!
//! Supports `~/.config/cruddy/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::Result;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct CruddyConfigFile {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerFileConfig,

    /// Generation backend configuration
    #[serde(default)]
    pub backend: BackendFileConfig,

    /// Bearer token configuration
    #[serde(default)]
    pub auth: AuthFileConfig,
}

/// Server/runtime configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    /// Bind address
    pub host: Option<String>,

    /// API server port
    pub port: Option<u16>,

    /// Path to the model registry JSON file
    pub models_file: Option<String>,
}

/// Backend configuration
#[derive(Debug, Default, Deserialize)]
pub struct BackendFileConfig {
    /// Ollama base URL (e.g. "http://localhost:11434")
    pub base_url: Option<String>,

    /// Generation timeout in seconds
    pub timeout_secs: Option<u64>,
}

/// Authentication configuration
#[derive(Debug, Default, Deserialize)]
pub struct AuthFileConfig {
    /// Expected bearer token
    pub token: Option<String>,
}

/// Load the TOML config file from `path`, or the standard path if `None`
///
/// Returns `CruddyConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file(path: Option<&Path>) -> CruddyConfigFile {
    let Some(path) = path.map(Path::to_path_buf).or_else(config_file_path) else {
        return CruddyConfigFile::default();
    };

    if !path.exists() {
        return CruddyConfigFile::default();
    }

    match read_config_file(&path) {
        Ok(config) => {
            tracing::info!(path = %path.display(), "loaded config file");
            config
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to load config file, using defaults"
            );
            CruddyConfigFile::default()
        }
    }
}

/// Read and parse one TOML config file
///
/// # Errors
///
/// Returns `Io` if the file can't be read or `Toml` if it doesn't parse
pub fn read_config_file(path: &Path) -> Result<CruddyConfigFile> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Return the config file path: `~/.config/cruddy/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("cruddy").join("config.toml"))
}
