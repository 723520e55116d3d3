//! Application error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Application errors.
///
/// Client-input errors carry enough context to name the offending parameter
/// and, where applicable, the accepted set of values.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid sort field: {field}. Must be one of {valid:?}")]
    InvalidSortField {
        field: String,
        valid: Vec<&'static str>,
    },

    #[error("invalid filter operator: {operator}. Must be one of {allowed:?}")]
    InvalidFilterOperator {
        operator: String,
        allowed: &'static [&'static str],
    },

    #[error("conflicting bin specification: {0}")]
    ConflictingBinSpec(String),

    #[error("malformed search_fields: {0}")]
    MalformedSearchFields(String),

    #[error("invalid value for parameter {name}: {message}")]
    InvalidParameter { name: String, message: String },

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("database error")]
    Database(#[from] sqlx::Error),

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// Shorthand for a 400 naming a single query parameter.
    pub fn invalid_parameter(name: &str, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.to_string(),
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::InvalidSortField { .. }
            | ApiError::InvalidFilterOperator { .. }
            | ApiError::ConflictingBinSpec(_)
            | ApiError::MalformedSearchFields(_)
            | ApiError::InvalidParameter { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Internal errors get logged with full detail but reported vaguely.
        let detail = match &self {
            ApiError::Database(e) => {
                tracing::error!(error = %e, "database error");
                "internal server error".to_string()
            }
            ApiError::Internal(e) => {
                tracing::error!(error = %e, "internal server error");
                "internal server error".to_string()
            }
            _ => self.to_string(),
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

/// Result type alias using ApiError.
pub type ApiResult<T> = Result<T, ApiError>;
