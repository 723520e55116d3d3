//! HTTP route handlers.

pub mod charts;
pub mod clips;
pub mod credits;
pub mod files;
pub mod filters;
pub mod health;
pub mod metrics;
pub mod projects;

use std::time::Instant;

use axum::Json;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::error::ApiResult;
use crate::query::{ListQuery, PageParams, Pagination, QueryParams};
use crate::state::AppState;

/// Serve from the response cache, or compute, cache, and serve.
///
/// Cache failures only ever degrade to an uncached response.
pub(crate) async fn respond_cached<T, F, Fut>(
    state: &AppState,
    key: String,
    compute: F,
) -> ApiResult<Response>
where
    T: Serialize,
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = ApiResult<T>>,
{
    if let Some(hit) = state.response_cache().get(&key).await {
        state.metrics().record_cache_hit();
        return Ok(([(header::CONTENT_TYPE, "application/json")], hit).into_response());
    }
    state.metrics().record_cache_miss();

    let value = compute().await?;

    match crate::cache::store_json(state.response_cache().as_ref(), &key, &value, state.cache_ttl())
        .await
    {
        Some(body) => Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response()),
        None => Ok(Json(value).into_response()),
    }
}

/// Fetch all rows for a rendered SQL statement, recording query duration.
pub(crate) async fn fetch_all<T>(state: &AppState, sql: &str) -> ApiResult<Vec<T>>
where
    T: for<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin,
{
    let start = Instant::now();
    let rows = sqlx::query_as::<_, T>(sql).fetch_all(state.db()).await?;
    state
        .metrics()
        .record_db_query(start.elapsed().as_secs_f64());
    Ok(rows)
}

/// Fetch a single scalar count.
pub(crate) async fn fetch_count(state: &AppState, sql: &str) -> ApiResult<u64> {
    let start = Instant::now();
    let count: i64 = sqlx::query_scalar(sql).fetch_one(state.db()).await?;
    state
        .metrics()
        .record_db_query(start.elapsed().as_secs_f64());
    Ok(u64::try_from(count).unwrap_or(0))
}

/// Run the count + page queries for a listing and assemble the envelope.
pub(crate) async fn paginate_listing<T>(
    state: &AppState,
    query: &ListQuery,
    columns: &[(&'static crate::query::EntityDef, &'static str)],
    page: PageParams,
    params: &QueryParams,
    path: &str,
) -> ApiResult<(Pagination, Vec<T>)>
where
    T: for<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin,
{
    let total_entries = fetch_count(state, &query.build_count()).await?;
    let rows = fetch_all(state, &query.build_page(columns, page)).await?;

    let pagination = Pagination::new(
        total_entries,
        page,
        &state.config().site_url,
        path,
        params,
    );
    Ok((pagination, rows))
}
