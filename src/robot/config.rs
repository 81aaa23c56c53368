//! Robot client configuration (`config.json`)

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::Result;

/// Default path of the robot config file
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

const fn default_true() -> bool {
    true
}

const fn default_record_seconds() -> u64 {
    5
}

fn default_recording_path() -> PathBuf {
    PathBuf::from("recording.wav")
}

fn default_tts_lang() -> String {
    "en".to_string()
}

/// Robot client settings
#[derive(Debug, Clone, Deserialize)]
pub struct RobotConfig {
    /// Relay base URL, e.g. `https://relay.local:8000`
    pub api_url: String,

    /// Bearer token for the relay
    pub auth_token: String,

    /// Accept self-signed relay certificates
    #[serde(default = "default_true")]
    pub accept_invalid_certs: bool,

    /// Length of each microphone recording
    #[serde(default = "default_record_seconds")]
    pub record_seconds: u64,

    /// Where the last recording is saved
    #[serde(default = "default_recording_path")]
    pub recording_path: PathBuf,

    /// Language for speech synthesis
    #[serde(default = "default_tts_lang")]
    pub tts_lang: String,
}

impl RobotConfig {
    /// Read the config from a JSON file
    ///
    /// # Errors
    ///
    /// Returns error if the file can't be read or parsed
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        tracing::debug!(path = %path.display(), api_url = %config.api_url, "loaded robot config");
        Ok(config)
    }

    /// Recording duration
    #[must_use]
    pub const fn record_duration(&self) -> Duration {
        Duration::from_secs(self.record_seconds)
    }
}
