//! Health and status endpoints.

use std::collections::BTreeMap;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::ApiResult;
use crate::models::file_status;
use crate::state::AppState;

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    staging: bool,
    /// Latest successful ingestion per file category.
    latest_successful_db_update: BTreeMap<String, DateTime<Utc>>,
}

#[derive(sqlx::FromRow)]
struct LatestUpdateRow {
    category: String,
    recorded_at: DateTime<Utc>,
}

/// Health check handler: verifies the database is reachable and reports
/// data freshness per ingested category.
async fn health_check(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<HealthResponse>), StatusCode> {
    if !state.postgres_healthy().await {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    let rows = sqlx::query_as::<_, LatestUpdateRow>(
        "SELECT category, MAX(recorded_at) AS recorded_at \
         FROM file \
         WHERE status = $1 AND category = ANY($2) \
         GROUP BY category",
    )
    .bind(file_status::SUCCESS)
    .bind(crate::models::TRACKED_CATEGORIES)
    .fetch_all(state.db())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "health query failed");
        StatusCode::SERVICE_UNAVAILABLE
    })?;

    let latest_successful_db_update = rows
        .into_iter()
        .map(|r| (r.category, r.recorded_at))
        .collect();

    Ok((
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok",
            staging: state.config().staging,
            latest_successful_db_update,
        }),
    ))
}

/// Confirms the caller passed the API key check (the middleware rejects
/// the request before this handler otherwise).
async fn authorized_user() -> ApiResult<Json<serde_json::Value>> {
    Ok(Json(serde_json::json!({ "authorized_user": true })))
}

/// Create the health router (no API key required).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

/// Create the authorized-user probe router (API key required).
pub fn authorized_router() -> Router<AppState> {
    Router::new().route("/health/authorized_user", get(authorized_user))
}
