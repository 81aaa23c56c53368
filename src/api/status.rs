//! Liveness and status endpoints

use std::sync::Arc;

use axum::{Json, extract::State};
use serde::Serialize;

use super::ApiState;
use crate::hardware::GpuStats;

/// Root banner
#[derive(Serialize)]
pub struct RootResponse {
    pub message: &'static str,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Backend reachability and active model
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub ollama_available: bool,
    pub active_model: Option<String>,
    pub available_models: usize,
}

impl StatusResponse {
    const fn unavailable() -> Self {
        Self {
            status: "error",
            ollama_available: false,
            active_model: None,
            available_models: 0,
        }
    }
}

/// GPU section of the system status
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum GpuReport {
    Stats(GpuStats),
    Unavailable(&'static str),
}

/// Status plus host hardware usage
#[derive(Debug, Serialize)]
pub struct SystemStatusResponse {
    #[serde(flatten)]
    pub status: StatusResponse,
    pub cpu_percent: f32,
    pub memory_percent: f64,

    /// Left out when the host has no GPU
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpu: Option<GpuReport>,
}

/// Root endpoint
pub(super) async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "AI Assistant API is running",
    })
}

/// Liveness probe - is the service running?
pub(super) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Ping the backend and report the active model
///
/// Any failure degrades to a fixed "unavailable" body.
pub(super) async fn status(State(state): State<Arc<ApiState>>) -> Json<StatusResponse> {
    Json(check_status(&state).await)
}

/// Status plus CPU, memory, and GPU usage
///
/// `gpu` is "Not available" when the probe fails and absent when there is no GPU.
pub(super) async fn system_status(State(state): State<Arc<ApiState>>) -> Json<SystemStatusResponse> {
    let status = check_status(&state).await;
    let gpu = match state.hardware.probe_gpu().await {
        Ok(stats) => stats.map(GpuReport::Stats),
        Err(e) => {
            tracing::debug!(error = %e, "GPU stats unavailable");
            Some(GpuReport::Unavailable("Not available"))
        }
    };

    Json(SystemStatusResponse {
        status,
        cpu_percent: state.hardware.cpu_percent(),
        memory_percent: state.hardware.memory_percent(),
        gpu,
    })
}

async fn check_status(state: &ApiState) -> StatusResponse {
    let probe = async {
        let models = state.relay.backend().list_models().await?;
        let (active, _) = state.relay.registry().active().await?;
        crate::Result::Ok(StatusResponse {
            status: "running",
            ollama_available: true,
            active_model: Some(active),
            available_models: models.len(),
        })
    };

    match probe.await {
        Ok(status) => status,
        Err(e) => {
            tracing::warn!(error = %e, "status check failed");
            StatusResponse::unavailable()
        }
    }
}
