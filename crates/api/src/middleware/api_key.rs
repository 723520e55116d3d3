//! Shared-secret API key middleware.
//!
//! Checks the `X-API-KEY` header against the configured key using a
//! constant-time comparison. When no key is configured the check is
//! disabled (a warning is logged at startup).

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;

use crate::error::ApiError;
use crate::state::AppState;

/// Middleware requiring a valid `X-API-KEY` header.
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(expected) = state.config().api_key.as_deref() else {
        return next.run(request).await;
    };

    let provided = request
        .headers()
        .get("X-API-KEY")
        .and_then(|v| v.to_str().ok());

    let Some(provided) = provided else {
        return ApiError::Forbidden("missing API key".to_string()).into_response();
    };

    if bool::from(provided.as_bytes().ct_eq(expected.as_bytes())) {
        next.run(request).await
    } else {
        ApiError::Forbidden("bad API key credentials".to_string()).into_response()
    }
}
