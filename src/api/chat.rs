//! Chat endpoints

use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use super::{ApiError, ApiState};
use crate::hardware::LOW_VRAM_THRESHOLD_MB;
use crate::relay::{ChatRequest, ChatResponse, OptimizedChatRequest};

/// Relay a chat request to the backend
pub(super) async fn chat(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    Ok(Json(state.relay.chat(request).await?))
}

/// Returned instead of a chat response when the GPU is nearly full
#[derive(Debug, Serialize)]
pub struct LowVramWarning {
    pub warning: &'static str,
    pub suggestion: &'static str,
    pub vram_free_mb: f64,
}

/// Chat for low-VRAM hosts
///
/// Refuses with a warning body (still 200) when the first GPU has less than
/// [`LOW_VRAM_THRESHOLD_MB`] free. Hosts without GPU stats go straight through.
pub(super) async fn chat_optimized(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<OptimizedChatRequest>,
) -> Result<Response, ApiError> {
    if let Some(gpu) = state.hardware.gpu().await
        && gpu.memory_free_mb < LOW_VRAM_THRESHOLD_MB
    {
        tracing::warn!(
            gpu = %gpu.name,
            vram_free_mb = gpu.memory_free_mb,
            "low VRAM, skipping generation"
        );
        return Ok(Json(LowVramWarning {
            warning: "Low VRAM available, response may be slow",
            suggestion: "Try using tinyllama model",
            vram_free_mb: gpu.memory_free_mb,
        })
        .into_response());
    }

    let response = state.relay.chat(request.into()).await?;
    Ok(Json(response).into_response())
}
