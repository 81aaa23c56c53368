//! Model listing and switching endpoints

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};

use super::{ApiError, ApiState};
use crate::registry::ModelListing;

/// List all registered models
pub(super) async fn list_models(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<ModelListing>, ApiError> {
    let listing = state.relay.registry().listing().await?;
    Ok(Json(listing))
}

/// Query parameters for `POST /models/switch`
#[derive(Debug, Deserialize)]
pub struct SwitchParams {
    pub model_key: String,
}

/// Switch response
#[derive(Debug, Serialize)]
pub struct SwitchResponse {
    pub status: &'static str,
    pub active_model: String,
}

/// Make a registered model the active one
pub(super) async fn switch_model(
    State(state): State<Arc<ApiState>>,
    Query(params): Query<SwitchParams>,
) -> Result<Json<SwitchResponse>, ApiError> {
    state.relay.registry().switch(&params.model_key).await?;

    Ok(Json(SwitchResponse {
        status: "success",
        active_model: params.model_key,
    }))
}
