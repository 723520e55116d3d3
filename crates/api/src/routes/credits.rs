//! Credit listing endpoint.

use axum::{
    Router,
    extract::{RawQuery, State},
    response::Response,
    routing::get,
};
use serde::Serialize;

use crate::error::ApiResult;
use crate::models::Credit;
use crate::query::{
    CREDIT, FilterDescriptor, FilterOp, ListQuery, OrderingPlan, PROJECT, PageParams, Paginated,
    QueryParams,
};
use crate::routes::filters::{CreditFilterParams, ProjectFilterParams, SearchParams};
use crate::routes::{paginate_listing, respond_cached};
use crate::state::AppState;

/// Create the credits router.
pub fn router() -> Router<AppState> {
    Router::new().route("/credits", get(list_credits))
}

/// Reference to the project a credit belongs to.
#[derive(Debug, Serialize)]
struct ProjectRef {
    project_id: Option<String>,
    category: Option<Vec<String>>,
}

/// A credit with its project's categories attached.
#[derive(Debug, Serialize)]
struct CreditWithProject {
    #[serde(flatten)]
    credit: Credit,
    projects: Vec<ProjectRef>,
}

/// Credit row joined with the project's category labels.
#[derive(sqlx::FromRow)]
struct CreditRow {
    #[sqlx(flatten)]
    credit: Credit,
    category: Option<Vec<String>>,
}

async fn list_credits(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> ApiResult<Response> {
    let params = QueryParams::parse(raw.as_deref());
    let key = params.cache_key("GET", "/credits");

    respond_cached(&state, key, || async {
        let page = PageParams::from_query(&params)?;
        let project_filters = ProjectFilterParams::from_query(&params)?;
        let credit_filters = CreditFilterParams::from_query(&params)?;
        let beneficiary = SearchParams::beneficiary_search(&params)?;

        let mut descriptors = vec![FilterDescriptor::list(
            &PROJECT,
            "project_id",
            FilterOp::Equals,
            params.strings("project_id"),
        )];
        descriptors.extend(project_filters.descriptors());
        descriptors.extend(credit_filters.descriptors());

        let mut sort = params.strings("sort");
        if sort.is_empty() {
            sort.push("project_id".to_string());
        }
        let ordering = OrderingPlan::parse(&sort, &CREDIT)?;

        // Outer join keeps credits whose project is unknown.
        let query = ListQuery::new(&CREDIT)
            .left_join(&PROJECT, "project_id", "project_id")
            .filters(&descriptors)?
            .and_where_option(beneficiary.condition(&CREDIT, &state)?)
            .order_by(ordering);

        let mut columns: Vec<(&'static crate::query::EntityDef, &'static str)> = CREDIT
            .columns
            .iter()
            .map(|c| (&CREDIT, c.name))
            .collect();
        columns.push((&PROJECT, "category"));

        let (pagination, rows): (_, Vec<CreditRow>) =
            paginate_listing(&state, &query, &columns, page, &params, "/credits").await?;

        let data: Vec<CreditWithProject> = rows
            .into_iter()
            .map(|row| {
                let project_id = row.credit.project_id.clone();
                CreditWithProject {
                    credit: row.credit,
                    projects: vec![ProjectRef {
                        project_id,
                        category: row.category,
                    }],
                }
            })
            .collect();

        Ok(Paginated { pagination, data })
    })
    .await
}
