//! Bearer token authentication middleware

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use super::{ApiError, ApiState};

/// Extract the bearer token from the Authorization header
fn extract_bearer(req: &Request) -> Result<&str, ApiError> {
    req.headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized("Invalid authorization header"))
}

/// Middleware to verify the bearer token
///
/// The token is compared as a plain string against the configured value.
pub async fn require_token(
    State(state): State<Arc<ApiState>>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer(&req).inspect_err(|_| {
        tracing::debug!("missing or malformed authorization header");
    })?;

    if token != state.auth_token {
        tracing::warn!(path = %req.uri().path(), "invalid token provided");
        return Err(ApiError::Unauthorized("Invalid token"));
    }

    Ok(next.run(req).await)
}
