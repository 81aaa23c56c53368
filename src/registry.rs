//! Model registry backed by a JSON file
//!
//! The file has the shape:
//!
//! ```json
//! {
//!   "active_model": "codellama",
//!   "available_models": {
//!     "codellama": {
//!       "name": "codellama:7b",
//!       "description": "Code assistant",
//!       "tags": ["code"],
//!       "default_temperature": 0.2
//!     }
//!   }
//! }
//! ```
//!
//! Reads always go to disk so edits made by hand are picked up without a
//! restart. Writes (switching the active model) are serialized and replace
//! the file atomically.

use std::io::Write;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use crate::{Error, Result};

/// Key used when the file has no `active_model`
pub const FALLBACK_ACTIVE_MODEL: &str = "codellama";

/// Sampling temperature used when neither the request nor the entry sets one
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// A single model in the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEntry {
    /// Backend model name (e.g. "codellama:7b")
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Free-form tags
    #[serde(default)]
    pub tags: Vec<String>,

    /// Temperature applied when the request doesn't set one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_temperature: Option<f64>,

    /// Fields we don't interpret, kept so write-back doesn't drop them
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ModelEntry {
    /// Default temperature for this model
    #[must_use]
    pub fn temperature(&self) -> f64 {
        self.default_temperature.unwrap_or(DEFAULT_TEMPERATURE)
    }
}

/// On-disk registry document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsFile {
    /// Currently selected model key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_model: Option<String>,

    /// Known models keyed by registry key, in file order
    pub available_models: IndexMap<String, ModelEntry>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ModelsFile {
    /// Resolve the active model, falling back to [`FALLBACK_ACTIVE_MODEL`]
    ///
    /// # Errors
    ///
    /// Returns `ModelNotFound` if the active key is not registered
    pub fn active(&self) -> Result<(String, ModelEntry)> {
        let key = self
            .active_model
            .as_deref()
            .unwrap_or(FALLBACK_ACTIVE_MODEL);
        self.get(key)
    }

    /// Resolve an explicit key, or the active model when `key` is `None`
    ///
    /// # Errors
    ///
    /// Returns `ModelNotFound` if the key is not registered
    pub fn resolve(&self, key: Option<&str>) -> Result<(String, ModelEntry)> {
        match key {
            Some(key) => self.get(key),
            None => self.active(),
        }
    }

    fn get(&self, key: &str) -> Result<(String, ModelEntry)> {
        self.available_models
            .get(key)
            .map(|entry| (key.to_string(), entry.clone()))
            .ok_or_else(|| Error::ModelNotFound(key.to_string()))
    }

    /// Build the public listing of models
    #[must_use]
    pub fn listing(&self) -> ModelListing {
        let active = self.active_model.as_deref();
        let models = self
            .available_models
            .iter()
            .map(|(key, entry)| {
                (
                    key.clone(),
                    ModelSummary {
                        name: entry.name.clone(),
                        description: entry.description.clone(),
                        tags: entry.tags.clone(),
                        is_active: Some(key.as_str()) == active,
                    },
                )
            })
            .collect();

        ModelListing {
            models,
            active_model: self.active_model.clone(),
        }
    }
}

/// Response body for `GET /models`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelListing {
    pub models: IndexMap<String, ModelSummary>,
    pub active_model: Option<String>,
}

/// One model in the listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSummary {
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub is_active: bool,
}

/// Handle to the registry file
#[derive(Debug)]
pub struct ModelRegistry {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl ModelRegistry {
    /// Create a registry handle for `path` (no I/O happens here)
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the registry file
    ///
    /// # Errors
    ///
    /// Returns error if the file can't be read or isn't a valid registry
    pub async fn load(&self) -> Result<ModelsFile> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Resolve a model key (or the active model) to its entry
    ///
    /// # Errors
    ///
    /// Returns `ModelNotFound` for unknown keys, or a load error
    pub async fn resolve(&self, key: Option<&str>) -> Result<(String, ModelEntry)> {
        self.load().await?.resolve(key)
    }

    /// Resolve the active model
    ///
    /// # Errors
    ///
    /// Returns `ModelNotFound` if the active key is unknown, or a load error
    pub async fn active(&self) -> Result<(String, ModelEntry)> {
        self.load().await?.active()
    }

    /// List all models with their active flag
    ///
    /// # Errors
    ///
    /// Returns error if the file can't be loaded
    pub async fn listing(&self) -> Result<ModelListing> {
        Ok(self.load().await?.listing())
    }

    /// Make `key` the active model and persist the change
    ///
    /// # Errors
    ///
    /// Returns `ModelNotFound` for unknown keys, or an I/O error on write
    pub async fn switch(&self, key: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut file = self.load().await?;
        if !file.available_models.contains_key(key) {
            return Err(Error::ModelNotFound(key.to_string()));
        }
        file.active_model = Some(key.to_string());

        let contents = serde_json::to_string_pretty(&file)?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&path, &contents))
            .await
            .map_err(|e| Error::Io(std::io::Error::other(e)))??;

        tracing::info!(model = key, "switched active model");
        Ok(())
    }
}

/// Replace `path` with `contents` via a temp file in the same directory
fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.write_all(b"\n")?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}
