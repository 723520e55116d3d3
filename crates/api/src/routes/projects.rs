//! Project listing and detail endpoints.

use axum::{
    Router,
    extract::{Path, RawQuery, State},
    response::Response,
    routing::get,
};
use sea_query::{Expr, ExprTrait, Query};
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::models::{Clip, Project};
use crate::query::{
    CLIP, CLIP_PROJECT, CREDIT, ListQuery, OrderingPlan, PROJECT, PageParams, Paginated,
    QueryParams,
};
use crate::routes::filters::{ProjectFilterParams, SearchParams};
use crate::routes::{fetch_all, paginate_listing, respond_cached};
use crate::state::AppState;

/// Create the projects router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/projects", get(list_projects))
        .route("/projects/{project_id}", get(get_project))
}

/// A project with its associated news clips.
#[derive(Debug, Serialize)]
struct ProjectWithClips {
    #[serde(flatten)]
    project: Project,
    clips: Vec<Clip>,
}

/// Clip row joined with the owning project id.
#[derive(sqlx::FromRow)]
struct ProjectClipRow {
    project_id: String,
    #[sqlx(flatten)]
    clip: Clip,
}

async fn list_projects(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> ApiResult<Response> {
    let params = QueryParams::parse(raw.as_deref());
    let key = params.cache_key("GET", "/projects");

    respond_cached(&state, key, || async {
        let page = PageParams::from_query(&params)?;
        let filters = ProjectFilterParams::from_query(&params)?;
        let search = SearchParams::project_search(&params)?;
        let beneficiary = SearchParams::beneficiary_search(&params)?;

        let mut sort = params.strings("sort");
        if sort.is_empty() {
            sort.push("project_id".to_string());
        }
        let ordering = OrderingPlan::parse(&sort, &PROJECT)?;

        let mut query = ListQuery::new(&PROJECT)
            .filters(&filters.descriptors())?
            .and_where_option(search.condition(&PROJECT, &state)?)
            .order_by(ordering);

        // Beneficiary search matches against credit retirement fields, so
        // membership is resolved through a subquery instead of a join that
        // would multiply project rows.
        if let Some(cond) = beneficiary.condition(&CREDIT, &state)? {
            let matching = Query::select()
                .column(PROJECT.col("project_id"))
                .from(PROJECT.table_alias())
                .left_join(
                    CREDIT.table_alias(),
                    Expr::col(PROJECT.col("project_id")).equals(CREDIT.col("project_id")),
                )
                .and_where(cond)
                .to_owned();
            query = query.and_where(Expr::col(PROJECT.col("project_id")).in_subquery(matching));
        }

        let (pagination, projects): (_, Vec<Project>) =
            paginate_listing(&state, &query, &[], page, &params, "/projects").await?;

        let data = attach_clips(&state, projects).await?;

        Ok(Paginated { pagination, data })
    })
    .await
}

async fn get_project(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> ApiResult<Response> {
    let key = QueryParams::parse(None).cache_key("GET", &format!("/projects/{project_id}"));

    respond_cached(&state, key, || async {
        let project = sqlx::query_as::<_, Project>("SELECT * FROM project WHERE project_id = $1")
            .bind(&project_id)
            .fetch_optional(state.db())
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("project {project_id}")))?;

        let mut with_clips = attach_clips(&state, vec![project]).await?;
        with_clips
            .pop()
            .ok_or_else(|| ApiError::NotFound(format!("project {project_id}")))
    })
    .await
}

/// Load and group the clips referencing each listed project.
async fn attach_clips(
    state: &AppState,
    projects: Vec<Project>,
) -> ApiResult<Vec<ProjectWithClips>> {
    let ids: Vec<String> = projects.iter().map(|p| p.project_id.clone()).collect();

    let rows: Vec<ProjectClipRow> = if ids.is_empty() {
        Vec::new()
    } else {
        let sql = Query::select()
            .column(CLIP_PROJECT.col("project_id"))
            .column((CLIP.table_alias(), sea_query::Asterisk))
            .from(CLIP_PROJECT.table_alias())
            .inner_join(
                CLIP.table_alias(),
                Expr::col(CLIP.col("id")).equals(CLIP_PROJECT.col("clip_id")),
            )
            .and_where(Expr::col(CLIP_PROJECT.col("project_id")).is_in(ids))
            .to_string(sea_query::PostgresQueryBuilder);
        fetch_all(state, &sql).await?
    };

    let mut by_project: std::collections::HashMap<String, Vec<Clip>> =
        std::collections::HashMap::new();
    for row in rows {
        by_project.entry(row.project_id).or_default().push(row.clip);
    }

    Ok(projects
        .into_iter()
        .map(|project| {
            let clips = by_project.remove(&project.project_id).unwrap_or_default();
            ProjectWithClips { project, clips }
        })
        .collect())
}
