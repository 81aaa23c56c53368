//! Error types for cruddy

use thiserror::Error;

/// Result type alias for cruddy operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the relay server or the robot client
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Requested model key is not in the registry
    #[error("model {0} not available")]
    ModelNotFound(String),

    /// Generation backend failure (transport, timeout, bad status)
    #[error("backend error: {0}")]
    Backend(String),

    /// Audio error
    #[error("audio error: {0}")]
    Audio(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Hardware metrics error
    #[error("hardware error: {0}")]
    Hardware(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
