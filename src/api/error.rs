//! API error responses

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::Error;

/// Detail message returned when the backend call fails
pub const UPSTREAM_DETAIL: &str = "Error communicating with AI model";

/// Errors returned by API handlers
///
/// Every variant renders as `{"detail": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    Unauthorized(&'static str),
    BadRequest(String),
    Upstream,
    Internal,
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::ModelNotFound(key) => Self::BadRequest(format!("Model {key} not available")),
            Error::Backend(_) => Self::Upstream,
            other => {
                tracing::error!(error = %other, "request failed");
                Self::Internal
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            detail: String,
        }

        let (status, detail) = match self {
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.to_string()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Upstream => (StatusCode::INTERNAL_SERVER_ERROR, UPSTREAM_DETAIL.to_string()),
            Self::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        (status, Json(ErrorResponse { detail })).into_response()
    }
}
