//! Shared test utilities

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use cruddy::backend::{BackendModel, GenerateRequest, GenerateResponse};
use cruddy::hardware::{GpuProbe, GpuStats};
use cruddy::{ApiServer, ApiServerBuilder, Backend, Error, HardwareMonitor, ModelRegistry, Result};

pub const TEST_TOKEN: &str = "test-token";

pub const MODELS_JSON: &str = r#"{
  "active_model": "codellama",
  "available_models": {
    "codellama": {
      "name": "codellama:7b",
      "description": "Code assistant",
      "tags": ["code"],
      "default_temperature": 0.2
    },
    "tinyllama": {
      "name": "tinyllama",
      "description": "Small and fast",
      "tags": ["small"],
      "default_temperature": 0.7
    }
  }
}"#;

/// Backend double that records requests and returns a canned reply
pub struct MockBackend {
    pub reply: String,
    pub fail: bool,
    pub installed: Vec<&'static str>,
    pub calls: AtomicUsize,
    pub requests: Mutex<Vec<GenerateRequest>>,
}

impl MockBackend {
    pub fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            fail: false,
            installed: vec!["codellama:7b", "tinyllama:latest", "mistral:7b"],
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: String::new(),
            fail: true,
            installed: Vec::new(),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> GenerateRequest {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("backend was never called")
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        if self.fail {
            return Err(Error::Backend("connection refused".to_string()));
        }

        Ok(GenerateResponse {
            response: self.reply.clone(),
            eval_count: Some(17),
        })
    }

    async fn list_models(&self) -> Result<Vec<BackendModel>> {
        if self.fail {
            return Err(Error::Backend("connection refused".to_string()));
        }

        Ok(self
            .installed
            .iter()
            .map(|name| BackendModel {
                name: (*name).to_string(),
                size: None,
            })
            .collect())
    }
}

/// GPU probe returning fixed stats (or none)
pub struct StaticGpu(pub Option<GpuStats>);

#[async_trait]
impl GpuProbe for StaticGpu {
    async fn first_gpu(&self) -> Result<Option<GpuStats>> {
        Ok(self.0.clone())
    }
}

/// GPU probe whose driver query always fails
pub struct BrokenGpu;

#[async_trait]
impl GpuProbe for BrokenGpu {
    async fn first_gpu(&self) -> Result<Option<GpuStats>> {
        Err(Error::Hardware("nvidia-smi exited with 9".to_string()))
    }
}

/// GPU stats with the given free VRAM
pub fn gpu_with_free_mb(free: f64) -> GpuStats {
    GpuStats {
        name: "NVIDIA GeForce GTX 1050".to_string(),
        memory_total_mb: 2048.0,
        memory_used_mb: 2048.0 - free,
        memory_free_mb: free,
        load_percent: 12.0,
    }
}

/// Write the sample registry into a temp dir
pub fn setup_models_file() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = dir.path().join("models.json");
    std::fs::write(&path, MODELS_JSON).expect("failed to write models file");
    (dir, path)
}

/// Build a server over the sample registry
pub fn build_test_server(
    models_file: &PathBuf,
    backend: Arc<MockBackend>,
    gpu: Option<GpuStats>,
) -> ApiServer {
    build_server_with_probe(models_file, backend, Box::new(StaticGpu(gpu)))
}

/// Build a server over the sample registry with a custom GPU probe
pub fn build_server_with_probe(
    models_file: &PathBuf,
    backend: Arc<MockBackend>,
    probe: Box<dyn GpuProbe>,
) -> ApiServer {
    let hardware = HardwareMonitor::with_gpu_probe(probe);

    ApiServerBuilder::new(Arc::new(ModelRegistry::open(models_file)), backend)
        .auth_token(TEST_TOKEN)
        .hardware(Arc::new(hardware))
        .bind_addr("127.0.0.1:0")
        .build()
}
