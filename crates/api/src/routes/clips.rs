//! Clip listing endpoint.

use axum::{
    Router,
    extract::{RawQuery, State},
    response::Response,
    routing::get,
};
use sea_query::{Cond, Expr, ExprTrait, PostgresQueryBuilder, Query};
use serde::Serialize;

use crate::error::ApiResult;
use crate::models::Clip;
use crate::query::{
    CLIP, CLIP_PROJECT, ListQuery, OrderingPlan, PROJECT, PageParams, Paginated, QueryParams,
    WeightedField, search_condition,
};
use crate::routes::filters::{ClipFilterParams, SearchParams};
use crate::routes::{fetch_all, paginate_listing, respond_cached};
use crate::state::AppState;

/// Create the clips router.
pub fn router() -> Router<AppState> {
    Router::new().route("/clips", get(list_clips))
}

/// Project reference carried by each listed clip.
#[derive(sqlx::FromRow)]
struct ClipProjectRef {
    clip_id: i64,
    project_id: String,
    category: Option<Vec<String>>,
}

/// A clip with its associated projects.
#[derive(Debug, Serialize)]
struct ClipWithProjects {
    #[serde(flatten)]
    clip: Clip,
    projects: Vec<serde_json::Value>,
}

async fn list_clips(State(state): State<AppState>, RawQuery(raw): RawQuery) -> ApiResult<Response> {
    let params = QueryParams::parse(raw.as_deref());
    let key = params.cache_key("GET", "/clips");

    respond_cached(&state, key, || async {
        let page = PageParams::from_query(&params)?;
        let filters = ClipFilterParams::from_query(&params)?;
        let search = SearchParams::clip_search(&params)?;

        let mut sort = params.strings("sort");
        if sort.is_empty() {
            sort.push("date".to_string());
        }
        let ordering = OrderingPlan::parse(&sort, &CLIP)?;

        // Project associations are resolved through membership subqueries
        // so joined rows never multiply the listing.
        let mut query = ListQuery::new(&CLIP)
            .filters(&filters.descriptors())?
            .order_by(ordering);

        if !filters.project_id.is_empty() {
            query = query.and_where(clip_membership(
                Expr::col(CLIP_PROJECT.col("project_id")).is_in(filters.project_id.clone()),
            ));
        }

        // Search matches the clip title, or the id of any related project.
        if let Some(spec) = &search.spec {
            let mut cond = Cond::any();
            if let Some(title) = search.condition(&CLIP, &state)? {
                cond = cond.add(title);
            }
            if let Some(by_project) = search_condition(
                &CLIP_PROJECT,
                spec,
                &[WeightedField::unit("project_id")],
                search.threshold,
                state.aliases().as_ref(),
            )? {
                cond = cond.add(clip_membership(by_project));
            }
            query = query.and_where(cond.into());
        }

        let (pagination, clips): (_, Vec<Clip>) =
            paginate_listing(&state, &query, &[], page, &params, "/clips").await?;

        let data = attach_projects(&state, clips).await?;

        Ok(Paginated { pagination, data })
    })
    .await
}

/// `clip.id IN (SELECT clip_id FROM clip_project WHERE <cond>)`.
fn clip_membership(cond: sea_query::SimpleExpr) -> sea_query::SimpleExpr {
    let sub = Query::select()
        .column(CLIP_PROJECT.col("clip_id"))
        .from(CLIP_PROJECT.table_alias())
        .and_where(cond)
        .to_owned();
    Expr::col(CLIP.col("id")).in_subquery(sub)
}

/// Load `{project_id, category}` references for each listed clip.
async fn attach_projects(state: &AppState, clips: Vec<Clip>) -> ApiResult<Vec<ClipWithProjects>> {
    let ids: Vec<i64> = clips.iter().map(|c| c.id).collect();

    let refs: Vec<ClipProjectRef> = if ids.is_empty() {
        Vec::new()
    } else {
        let sql = Query::select()
            .column(CLIP_PROJECT.col("clip_id"))
            .column(PROJECT.col("project_id"))
            .column(PROJECT.col("category"))
            .from(CLIP_PROJECT.table_alias())
            .inner_join(
                PROJECT.table_alias(),
                Expr::col(CLIP_PROJECT.col("project_id")).equals(PROJECT.col("project_id")),
            )
            .and_where(Expr::col(CLIP_PROJECT.col("clip_id")).is_in(ids))
            .to_string(PostgresQueryBuilder);
        fetch_all(state, &sql).await?
    };

    let mut by_clip: std::collections::HashMap<i64, Vec<serde_json::Value>> =
        std::collections::HashMap::new();
    for r in refs {
        by_clip.entry(r.clip_id).or_default().push(serde_json::json!({
            "project_id": r.project_id,
            "category": r.category,
        }));
    }

    Ok(clips
        .into_iter()
        .map(|clip| {
            let projects = by_clip.remove(&clip.id).unwrap_or_default();
            ClipWithProjects { clip, projects }
        })
        .collect())
}
