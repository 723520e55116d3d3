//! Chart endpoints: binned, aggregated views of projects and credits.
//!
//! Each endpoint filters the dataset with the same descriptors as the
//! listings, fetches only the columns needed for binning, then buckets and
//! reduces in memory. Empty filtered sets produce empty data arrays, never
//! errors.

use std::collections::BTreeMap;

use axum::{
    Router,
    extract::{Path, RawQuery, State},
    response::Response,
    routing::get,
};
use chrono::{Datelike, NaiveDate, Utc};
use sea_query::{Expr, ExprTrait};
use serde::Serialize;

use crate::binning::{BinLabel, DateBins, Freq, Metric, aggregate, aggregate_by_bin, date_bins, numeric_bins};
use crate::error::{ApiError, ApiResult};
use crate::query::{
    CREDIT, ListQuery, PROJECT, PageParams, Paginated, Pagination, QueryParams,
};
use crate::routes::filters::{CreditFilterParams, ProjectFilterParams, SearchParams};
use crate::routes::{fetch_all, respond_cached};
use crate::state::AppState;

/// Create the charts router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/charts/projects_by_listing_date", get(projects_by_listing_date))
        .route("/charts/credits_by_transaction_date", get(credits_by_transaction_date))
        .route(
            "/charts/credits_by_transaction_date/{project_id}",
            get(credits_by_project),
        )
        .route("/charts/projects_by_credit_totals", get(projects_by_credit_totals))
        .route("/charts/projects_by_category", get(projects_by_category))
        .route("/charts/credits_by_category", get(credits_by_category))
}

// -------------------------------------------------------------------------
// Response records
// -------------------------------------------------------------------------

/// One date-binned, category-grouped aggregate.
#[derive(Debug, Serialize)]
struct DateBinRecord {
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    category: Option<String>,
    value: i64,
}

/// One numeric-binned, category-grouped aggregate.
#[derive(Debug, Serialize)]
struct NumericBinRecord {
    start: Option<i64>,
    end: Option<i64>,
    category: Option<String>,
    value: i64,
}

/// Per-bin totals for a single project.
#[derive(Debug, Serialize)]
struct BinTotalRecord {
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    value: i64,
}

/// Per-category project count.
#[derive(Debug, Serialize)]
struct CategoryCountRecord {
    category: Option<String>,
    value: i64,
}

/// Per-category issued/retired totals.
#[derive(Debug, Serialize)]
struct CreditCategoryRecord {
    category: Option<String>,
    issued: i64,
    retired: i64,
}

// -------------------------------------------------------------------------
// Shared helpers
// -------------------------------------------------------------------------

fn empty_chart<T>(page: PageParams) -> Paginated<T> {
    Paginated {
        pagination: Pagination::single(0, page.current_page),
        data: Vec::new(),
    }
}

fn chart_envelope<T>(data: Vec<T>, page: PageParams) -> Paginated<T> {
    Paginated {
        pagination: Pagination::single(data.len() as u64, page.current_page),
        data,
    }
}

/// Parse the `freq` xor `num_bins` bin specification.
///
/// Yearly frequency is the default when neither is supplied; supplying
/// both is rejected downstream by the binner.
fn parse_bin_spec(params: &QueryParams) -> ApiResult<(Option<Freq>, Option<u32>)> {
    let freq = match params.first("freq") {
        Some(raw) => Some(
            raw.parse::<Freq>()
                .map_err(|e| ApiError::invalid_parameter("freq", e))?,
        ),
        None => None,
    };
    let num_bins = params.parse_first::<u32>("num_bins")?;

    if num_bins.is_none() {
        Ok((freq.or(Some(Freq::Year)), None))
    } else {
        Ok((freq, num_bins))
    }
}

fn explode_categories(category: &Option<Vec<String>>) -> Vec<String> {
    category.clone().unwrap_or_default()
}

/// Serialize date-binned totals, dropping bins that start after the
/// current year (registry exports occasionally carry far-future dates).
fn format_date_bins(
    totals: BTreeMap<(BinLabel<NaiveDate>, Option<String>), i64>,
    bins: &DateBins,
) -> Vec<DateBinRecord> {
    let current_year = Utc::now().year();
    totals
        .into_iter()
        .filter_map(|((label, category), value)| {
            let (start, end) = match label {
                BinLabel::Bin(start) => {
                    if start.year() > current_year {
                        return None;
                    }
                    (Some(start), bins.period_end(start))
                }
                BinLabel::Other | BinLabel::Null => (None, None),
            };
            Some(DateBinRecord {
                start,
                end,
                category,
                value,
            })
        })
        .collect()
}

// -------------------------------------------------------------------------
// Handlers
// -------------------------------------------------------------------------

#[derive(sqlx::FromRow)]
struct ListingDateRow {
    listed_at: Option<NaiveDate>,
    category: Option<Vec<String>>,
}

/// Project counts binned by listing date and grouped by category.
async fn projects_by_listing_date(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> ApiResult<Response> {
    let params = QueryParams::parse(raw.as_deref());
    let key = params.cache_key("GET", "/charts/projects_by_listing_date");

    respond_cached(&state, key, || async {
        let page = PageParams::from_query(&params)?;
        let (freq, num_bins) = parse_bin_spec(&params)?;
        let filters = ProjectFilterParams::from_query(&params)?;
        let search = SearchParams::project_search(&params)?;

        let query = ListQuery::new(&PROJECT)
            .filters(&filters.descriptors())?
            .and_where_option(search.condition(&PROJECT, &state)?);

        let rows: Vec<ListingDateRow> = fetch_all(
            &state,
            &query.build_values(&[(&PROJECT, "listed_at"), (&PROJECT, "category")]),
        )
        .await?;

        let dates = rows.iter().filter_map(|r| r.listed_at);
        let (Some(min), Some(max)) = (dates.clone().min(), dates.max()) else {
            return Ok(empty_chart(page));
        };

        let bins = date_bins(min, max, freq, num_bins)?;
        let totals = aggregate(
            &rows,
            |r| bins.assign(r.listed_at),
            |r| explode_categories(&r.category),
            |_| None,
            Metric::Count,
        );

        Ok(chart_envelope(format_date_bins(totals, &bins), page))
    })
    .await
}

#[derive(sqlx::FromRow)]
struct TransactionRow {
    transaction_date: Option<NaiveDate>,
    quantity: i64,
    category: Option<Vec<String>>,
}

/// Credit quantities binned by transaction date and grouped by the owning
/// project's categories.
async fn credits_by_transaction_date(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> ApiResult<Response> {
    let params = QueryParams::parse(raw.as_deref());
    let key = params.cache_key("GET", "/charts/credits_by_transaction_date");

    respond_cached(&state, key, || async {
        let page = PageParams::from_query(&params)?;
        let (freq, num_bins) = parse_bin_spec(&params)?;
        let project_filters = ProjectFilterParams::from_query(&params)?;
        let credit_filters = CreditFilterParams::from_query(&params)?;
        let search = SearchParams::project_search(&params)?;

        let mut descriptors = project_filters.descriptors();
        descriptors.extend(credit_filters.descriptors());

        let query = ListQuery::new(&CREDIT)
            .inner_join(&PROJECT, "project_id", "project_id")
            .filters(&descriptors)?
            .and_where_option(search.condition(&PROJECT, &state)?);

        let rows: Vec<TransactionRow> = fetch_all(
            &state,
            &query.build_values(&[
                (&CREDIT, "transaction_date"),
                (&CREDIT, "quantity"),
                (&PROJECT, "category"),
            ]),
        )
        .await?;

        let dates = rows.iter().filter_map(|r| r.transaction_date);
        let (Some(min), Some(max)) = (dates.clone().min(), dates.max()) else {
            return Ok(empty_chart(page));
        };

        let bins = date_bins(min, max, freq, num_bins)?;
        let totals = aggregate(
            &rows,
            |r| bins.assign(r.transaction_date),
            |r| explode_categories(&r.category),
            |r| Some(r.quantity),
            Metric::Sum,
        );

        Ok(chart_envelope(format_date_bins(totals, &bins), page))
    })
    .await
}

#[derive(sqlx::FromRow)]
struct ProjectTransactionRow {
    transaction_date: Option<NaiveDate>,
    quantity: i64,
}

/// Credit totals for one project, binned by transaction date.
async fn credits_by_project(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    RawQuery(raw): RawQuery,
) -> ApiResult<Response> {
    let params = QueryParams::parse(raw.as_deref());
    let key = params.cache_key(
        "GET",
        &format!("/charts/credits_by_transaction_date/{project_id}"),
    );

    respond_cached(&state, key, || async {
        let page = PageParams::from_query(&params)?;
        let (freq, num_bins) = parse_bin_spec(&params)?;
        let credit_filters = CreditFilterParams::from_query(&params)?;
        let beneficiary = SearchParams::beneficiary_search(&params)?;

        let query = ListQuery::new(&CREDIT)
            .inner_join(&PROJECT, "project_id", "project_id")
            .filters(&credit_filters.descriptors())?
            .and_where(Expr::col(PROJECT.col("project_id")).eq(project_id.clone()))
            .and_where_option(beneficiary.condition(&CREDIT, &state)?);

        let rows: Vec<ProjectTransactionRow> = fetch_all(
            &state,
            &query.build_values(&[(&CREDIT, "transaction_date"), (&CREDIT, "quantity")]),
        )
        .await?;

        let dates = rows.iter().filter_map(|r| r.transaction_date);
        let (Some(min), Some(max)) = (dates.clone().min(), dates.max()) else {
            return Ok(empty_chart(page));
        };

        let bins = date_bins(min, max, freq, num_bins)?;
        let totals = aggregate_by_bin(
            &rows,
            |r| bins.assign(r.transaction_date),
            |r| Some(r.quantity),
            Metric::Sum,
        );

        let data: Vec<BinTotalRecord> = totals
            .into_iter()
            .map(|(label, value)| {
                let (start, end) = match label {
                    BinLabel::Bin(start) => (Some(start), bins.period_end(start)),
                    BinLabel::Other | BinLabel::Null => (None, None),
                };
                BinTotalRecord { start, end, value }
            })
            .collect();

        Ok(chart_envelope(data, page))
    })
    .await
}

#[derive(sqlx::FromRow)]
struct CreditTotalsRow {
    issued: Option<i64>,
    retired: Option<i64>,
    category: Option<Vec<String>>,
}

/// Project counts binned by total issued (or retired) credits.
async fn projects_by_credit_totals(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> ApiResult<Response> {
    let params = QueryParams::parse(raw.as_deref());
    let key = params.cache_key("GET", "/charts/projects_by_credit_totals");

    respond_cached(&state, key, || async {
        let page = PageParams::from_query(&params)?;
        let credit_type = params.first("credit_type").unwrap_or("issued");
        if credit_type != "issued" && credit_type != "retired" {
            return Err(ApiError::invalid_parameter(
                "credit_type",
                "must be 'issued' or 'retired'",
            ));
        }
        let bin_width = params.parse_first::<i64>("bin_width")?;
        let filters = ProjectFilterParams::from_query(&params)?;
        let search = SearchParams::project_search(&params)?;

        let query = ListQuery::new(&PROJECT)
            .filters(&filters.descriptors())?
            .and_where_option(search.condition(&PROJECT, &state)?);

        let rows: Vec<CreditTotalsRow> = fetch_all(
            &state,
            &query.build_values(&[
                (&PROJECT, "issued"),
                (&PROJECT, "retired"),
                (&PROJECT, "category"),
            ]),
        )
        .await?;

        let total_of = |r: &CreditTotalsRow| -> Option<i64> {
            if credit_type == "issued" { r.issued } else { r.retired }
        };

        let values = rows.iter().filter_map(&total_of);
        let (Some(min), Some(max)) = (values.clone().min(), values.max()) else {
            return Ok(empty_chart(page));
        };

        let bins = numeric_bins(min, max, bin_width)?;
        let totals = aggregate(
            &rows,
            |r| bins.assign(total_of(r)),
            |r| explode_categories(&r.category),
            |_| None,
            Metric::Count,
        );

        let data: Vec<NumericBinRecord> = totals
            .into_iter()
            .map(|((label, category), value)| {
                let (start, end) = match label {
                    BinLabel::Bin(start) => (Some(start), bins.end_of(start)),
                    BinLabel::Other | BinLabel::Null => (None, None),
                };
                NumericBinRecord {
                    start,
                    end,
                    category,
                    value,
                }
            })
            .collect();

        Ok(chart_envelope(data, page))
    })
    .await
}

#[derive(sqlx::FromRow)]
struct ProjectCategoryRow {
    category: Option<Vec<String>>,
}

/// Project counts per category (fan-out across multi-category projects).
async fn projects_by_category(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> ApiResult<Response> {
    let params = QueryParams::parse(raw.as_deref());
    let key = params.cache_key("GET", "/charts/projects_by_category");

    respond_cached(&state, key, || async {
        let page = PageParams::from_query(&params)?;
        let filters = ProjectFilterParams::from_query(&params)?;
        let search = SearchParams::project_search(&params)?;

        let query = ListQuery::new(&PROJECT)
            .filters(&filters.descriptors())?
            .and_where_option(search.condition(&PROJECT, &state)?);

        let rows: Vec<ProjectCategoryRow> =
            fetch_all(&state, &query.build_values(&[(&PROJECT, "category")])).await?;

        let totals = aggregate(
            &rows,
            |_| (),
            |r| explode_categories(&r.category),
            |_| None,
            Metric::Count,
        );

        let data: Vec<CategoryCountRecord> = totals
            .into_iter()
            .map(|(((), category), value)| CategoryCountRecord { category, value })
            .collect();

        Ok(chart_envelope(data, page))
    })
    .await
}

#[derive(sqlx::FromRow)]
struct BeneficiaryCreditRow {
    category: Option<Vec<String>>,
    quantity: i64,
    transaction_type: Option<String>,
}

/// Issued/retired totals per category.
///
/// With a beneficiary search, retirement totals are recomputed from the
/// matching transactions and issued totals are reported as zero, since
/// per-project issued counts cannot be attributed to one beneficiary.
async fn credits_by_category(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> ApiResult<Response> {
    let params = QueryParams::parse(raw.as_deref());
    let key = params.cache_key("GET", "/charts/credits_by_category");

    respond_cached(&state, key, || async {
        let page = PageParams::from_query(&params)?;
        let filters = ProjectFilterParams::from_query(&params)?;
        let search = SearchParams::project_search(&params)?;
        let beneficiary = SearchParams::beneficiary_search(&params)?;

        let mut per_category: BTreeMap<Option<String>, (i64, i64)> = BTreeMap::new();

        if let Some(beneficiary_cond) = beneficiary.condition(&CREDIT, &state)? {
            let query = ListQuery::new(&PROJECT)
                .inner_join(&CREDIT, "project_id", "project_id")
                .filters(&filters.descriptors())?
                .and_where_option(search.condition(&PROJECT, &state)?)
                .and_where(beneficiary_cond);

            let rows: Vec<BeneficiaryCreditRow> = fetch_all(
                &state,
                &query.build_values(&[
                    (&PROJECT, "category"),
                    (&CREDIT, "quantity"),
                    (&CREDIT, "transaction_type"),
                ]),
            )
            .await?;

            for row in &rows {
                let is_retirement = row
                    .transaction_type
                    .as_deref()
                    .is_some_and(|t| t.to_lowercase().contains("retirement"));
                if !is_retirement {
                    continue;
                }
                for category in categories_or_none(&row.category) {
                    let entry = per_category.entry(category).or_insert((0, 0));
                    entry.1 += row.quantity;
                }
            }
        } else {
            let query = ListQuery::new(&PROJECT)
                .filters(&filters.descriptors())?
                .and_where_option(search.condition(&PROJECT, &state)?);

            let rows: Vec<CreditTotalsRow> = fetch_all(
                &state,
                &query.build_values(&[
                    (&PROJECT, "issued"),
                    (&PROJECT, "retired"),
                    (&PROJECT, "category"),
                ]),
            )
            .await?;

            for row in &rows {
                for category in categories_or_none(&row.category) {
                    let entry = per_category.entry(category).or_insert((0, 0));
                    if let Some(issued) = row.issued {
                        entry.0 += issued;
                    }
                    if let Some(retired) = row.retired {
                        entry.1 += retired;
                    }
                }
            }
        }

        let data: Vec<CreditCategoryRecord> = per_category
            .into_iter()
            .map(|(category, (issued, retired))| CreditCategoryRecord {
                category,
                issued,
                retired,
            })
            .collect();

        Ok(chart_envelope(data, page))
    })
    .await
}

/// Explode a category array, mapping empty/absent to the None category.
fn categories_or_none(category: &Option<Vec<String>>) -> Vec<Option<String>> {
    match category {
        Some(cats) if !cats.is_empty() => cats.iter().cloned().map(Some).collect(),
        _ => vec![None],
    }
}
