//! Ingestion file endpoints.

use axum::{
    Router,
    extract::{Path, RawQuery, State},
    response::Response,
    routing::get,
};

use crate::error::{ApiError, ApiResult};
use crate::models::File;
use crate::query::{FILE, ListQuery, OrderingPlan, PageParams, Paginated, QueryParams};
use crate::routes::filters::FileFilterParams;
use crate::routes::{paginate_listing, respond_cached};
use crate::state::AppState;

/// Create the files router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/files", get(list_files))
        .route("/files/{file_id}", get(get_file))
}

async fn list_files(State(state): State<AppState>, RawQuery(raw): RawQuery) -> ApiResult<Response> {
    let params = QueryParams::parse(raw.as_deref());
    let key = params.cache_key("GET", "/files");

    respond_cached(&state, key, || async {
        let page = PageParams::from_query(&params)?;
        let filters = FileFilterParams::from_query(&params)?;

        let mut sort = params.strings("sort");
        if sort.is_empty() {
            sort.push("recorded_at".to_string());
        }
        let ordering = OrderingPlan::parse(&sort, &FILE)?;

        let query = ListQuery::new(&FILE)
            .filters(&filters.descriptors())?
            .order_by(ordering);

        let (pagination, data): (_, Vec<File>) =
            paginate_listing(&state, &query, &[], page, &params, "/files").await?;

        Ok(Paginated { pagination, data })
    })
    .await
}

async fn get_file(State(state): State<AppState>, Path(file_id): Path<i64>) -> ApiResult<Response> {
    let key = QueryParams::parse(None).cache_key("GET", &format!("/files/{file_id}"));

    respond_cached(&state, key, || async {
        sqlx::query_as::<_, File>("SELECT * FROM file WHERE id = $1")
            .bind(file_id)
            .fetch_optional(state.db())
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("file {file_id}")))
    })
    .await
}
