//! Typed query-parameter filters for each resource.
//!
//! Each params struct pulls its values out of the raw query string
//! (repeated keys preserved) and lowers them into filter descriptors.
//! Absent parameters mean "no filter", never "filter on empty".

use chrono::{DateTime, NaiveDate, Utc};
use sea_query::SimpleExpr;

use crate::error::ApiResult;
use crate::query::{
    CLIP, CREDIT, DEFAULT_SIMILARITY_THRESHOLD, FilterDescriptor, FilterOp, PROJECT, QueryParams,
    SearchSpec, WeightedField, parse_search_fields, search_condition, validate_threshold,
};
use crate::state::AppState;

/// Project listing filters.
#[derive(Debug, Clone, Default)]
pub struct ProjectFilterParams {
    pub registry: Vec<String>,
    pub country: Vec<String>,
    pub protocol: Vec<String>,
    pub category: Vec<String>,
    pub is_compliance: Option<bool>,
    pub listed_at_from: Option<NaiveDate>,
    pub listed_at_to: Option<NaiveDate>,
    pub issued_min: Option<i64>,
    pub issued_max: Option<i64>,
    pub retired_min: Option<i64>,
    pub retired_max: Option<i64>,
}

impl ProjectFilterParams {
    pub fn from_query(params: &QueryParams) -> ApiResult<Self> {
        Ok(Self {
            registry: params.strings("registry"),
            country: params.strings("country"),
            protocol: params.strings("protocol"),
            category: params.strings("category"),
            is_compliance: params.parse_first("is_compliance")?,
            listed_at_from: params.parse_first("listed_at_from")?,
            listed_at_to: params.parse_first("listed_at_to")?,
            issued_min: params.parse_first("issued_min")?,
            issued_max: params.parse_first("issued_max")?,
            retired_min: params.parse_first("retired_min")?,
            retired_max: params.parse_first("retired_max")?,
        })
    }

    pub fn descriptors(&self) -> Vec<FilterDescriptor> {
        vec![
            FilterDescriptor::list(&PROJECT, "registry", FilterOp::ILike, self.registry.clone()),
            FilterDescriptor::list(&PROJECT, "country", FilterOp::ILike, self.country.clone()),
            FilterDescriptor::list(
                &PROJECT,
                "protocol",
                FilterOp::ContainsAny,
                self.protocol.clone(),
            ),
            FilterDescriptor::list(
                &PROJECT,
                "category",
                FilterOp::ContainsAny,
                self.category.clone(),
            ),
            FilterDescriptor::scalar(
                &PROJECT,
                "is_compliance",
                FilterOp::Equals,
                self.is_compliance,
            ),
            FilterDescriptor::scalar(&PROJECT, "listed_at", FilterOp::Gte, self.listed_at_from),
            FilterDescriptor::scalar(&PROJECT, "listed_at", FilterOp::Lte, self.listed_at_to),
            FilterDescriptor::scalar(&PROJECT, "issued", FilterOp::Gte, self.issued_min),
            FilterDescriptor::scalar(&PROJECT, "issued", FilterOp::Lte, self.issued_max),
            FilterDescriptor::scalar(&PROJECT, "retired", FilterOp::Gte, self.retired_min),
            FilterDescriptor::scalar(&PROJECT, "retired", FilterOp::Lte, self.retired_max),
        ]
    }
}

/// Credit listing filters.
#[derive(Debug, Clone, Default)]
pub struct CreditFilterParams {
    pub transaction_type: Vec<String>,
    pub vintage: Vec<i64>,
    pub transaction_date_from: Option<NaiveDate>,
    pub transaction_date_to: Option<NaiveDate>,
}

impl CreditFilterParams {
    pub fn from_query(params: &QueryParams) -> ApiResult<Self> {
        Ok(Self {
            transaction_type: params.strings("transaction_type"),
            vintage: params.parse_all("vintage")?,
            transaction_date_from: params.parse_first("transaction_date_from")?,
            transaction_date_to: params.parse_first("transaction_date_to")?,
        })
    }

    pub fn descriptors(&self) -> Vec<FilterDescriptor> {
        vec![
            FilterDescriptor::list(
                &CREDIT,
                "transaction_type",
                FilterOp::ILike,
                self.transaction_type.clone(),
            ),
            FilterDescriptor::list(&CREDIT, "vintage", FilterOp::Equals, self.vintage.clone()),
            FilterDescriptor::scalar(
                &CREDIT,
                "transaction_date",
                FilterOp::Gte,
                self.transaction_date_from,
            ),
            FilterDescriptor::scalar(
                &CREDIT,
                "transaction_date",
                FilterOp::Lte,
                self.transaction_date_to,
            ),
        ]
    }
}

/// Clip listing filters.
#[derive(Debug, Clone, Default)]
pub struct ClipFilterParams {
    pub clip_type: Vec<String>,
    pub source: Vec<String>,
    pub tags: Vec<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub project_id: Vec<String>,
}

impl ClipFilterParams {
    pub fn from_query(params: &QueryParams) -> ApiResult<Self> {
        Ok(Self {
            clip_type: params.strings("type"),
            source: params.strings("source"),
            tags: params.strings("tags"),
            date_from: parse_datetime(params, "date_from")?,
            date_to: parse_datetime(params, "date_to")?,
            project_id: params.strings("project_id"),
        })
    }

    /// Clip-table descriptors. The `project_id` filter is resolved by the
    /// route through a membership subquery, since it lives on the join
    /// table.
    pub fn descriptors(&self) -> Vec<FilterDescriptor> {
        vec![
            FilterDescriptor::list(&CLIP, "type", FilterOp::ILike, self.clip_type.clone()),
            FilterDescriptor::list(&CLIP, "source", FilterOp::ILike, self.source.clone()),
            FilterDescriptor::list(&CLIP, "tags", FilterOp::ContainsAny, self.tags.clone()),
            FilterDescriptor::scalar(&CLIP, "date", FilterOp::Gte, self.date_from),
            FilterDescriptor::scalar(&CLIP, "date", FilterOp::Lte, self.date_to),
        ]
    }
}

/// File listing filters.
#[derive(Debug, Clone, Default)]
pub struct FileFilterParams {
    pub category: Vec<String>,
    pub status: Vec<String>,
    pub recorded_at_from: Option<DateTime<Utc>>,
    pub recorded_at_to: Option<DateTime<Utc>>,
}

impl FileFilterParams {
    pub fn from_query(params: &QueryParams) -> ApiResult<Self> {
        Ok(Self {
            category: params.strings("category"),
            status: params.strings("status"),
            recorded_at_from: parse_datetime(params, "recorded_at_from")?,
            recorded_at_to: parse_datetime(params, "recorded_at_to")?,
        })
    }

    pub fn descriptors(&self) -> Vec<FilterDescriptor> {
        use crate::query::FILE;
        vec![
            FilterDescriptor::list(&FILE, "category", FilterOp::Equals, self.category.clone()),
            FilterDescriptor::list(&FILE, "status", FilterOp::Equals, self.status.clone()),
            FilterDescriptor::scalar(&FILE, "recorded_at", FilterOp::Gte, self.recorded_at_from),
            FilterDescriptor::scalar(&FILE, "recorded_at", FilterOp::Lte, self.recorded_at_to),
        ]
    }
}

/// A timestamp parameter accepting either a date or an RFC 3339 datetime.
fn parse_datetime(params: &QueryParams, key: &str) -> ApiResult<Option<DateTime<Utc>>> {
    let Some(raw) = params.first(key) else {
        return Ok(None);
    };

    if let Ok(date) = raw.parse::<NaiveDate>() {
        let at_midnight = date.and_hms_opt(0, 0, 0).unwrap_or_default();
        return Ok(Some(DateTime::from_naive_utc_and_offset(at_midnight, Utc)));
    }

    raw.parse::<DateTime<Utc>>().map(Some).map_err(|_| {
        crate::error::ApiError::invalid_parameter(
            key,
            format!("cannot parse '{raw}' as a date or datetime"),
        )
    })
}

/// Parsed free-text search parameters.
#[derive(Debug, Clone)]
pub struct SearchParams {
    pub spec: Option<SearchSpec>,
    pub fields: Vec<WeightedField>,
    pub threshold: f64,
}

impl SearchParams {
    /// Project search: `search` over the identifier/name pair by default.
    pub fn project_search(params: &QueryParams) -> ApiResult<Self> {
        Self::from_query(
            params,
            "search",
            vec![WeightedField::unit("project_id"), WeightedField::unit("name")],
        )
    }

    /// Clip search: `search` over the clip title and related project ids.
    pub fn clip_search(params: &QueryParams) -> ApiResult<Self> {
        Self::from_query(params, "search", vec![WeightedField::unit("title")])
    }

    /// Beneficiary search over credit retirement fields.
    pub fn beneficiary_search(params: &QueryParams) -> ApiResult<Self> {
        Self::from_query(
            params,
            "beneficiary_search",
            vec![WeightedField::unit("retirement_beneficiary_harmonized")],
        )
    }

    fn from_query(
        params: &QueryParams,
        term_key: &str,
        default_fields: Vec<WeightedField>,
    ) -> ApiResult<Self> {
        let spec = params
            .first(term_key)
            .filter(|s| !s.is_empty())
            .map(SearchSpec::parse);

        let fields = match params.first("search_fields") {
            Some(raw) => parse_search_fields(raw)?,
            None => default_fields,
        };

        let threshold = match params.parse_first::<f64>("similarity_threshold")? {
            Some(t) => validate_threshold(t)?,
            None => DEFAULT_SIMILARITY_THRESHOLD,
        };

        Ok(Self {
            spec,
            fields,
            threshold,
        })
    }

    /// Build the search predicate for an entity, or None when no term was
    /// supplied.
    pub fn condition(
        &self,
        entity: &'static crate::query::EntityDef,
        state: &AppState,
    ) -> ApiResult<Option<SimpleExpr>> {
        let Some(spec) = &self.spec else {
            return Ok(None);
        };
        search_condition(
            entity,
            spec,
            &self.fields,
            self.threshold,
            state.aliases().as_ref(),
        )
    }
}

#[cfg(test)]
// Tests are allowed to use unwrap/expect freely.
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn absent_params_produce_no_descriptors_with_values() {
        let params = QueryParams::parse(None);
        let filters = ProjectFilterParams::from_query(&params).unwrap();
        for d in filters.descriptors() {
            assert!(d.condition().unwrap().is_none());
        }
    }

    #[test]
    fn repeated_keys_become_value_lists() {
        let params = QueryParams::parse(Some("country=US&country=PE"));
        let filters = ProjectFilterParams::from_query(&params).unwrap();
        assert_eq!(filters.country, vec!["US", "PE"]);
    }

    #[test]
    fn bad_typed_param_names_the_parameter() {
        let params = QueryParams::parse(Some("issued_min=lots"));
        let err = ProjectFilterParams::from_query(&params).unwrap_err();
        assert!(err.to_string().contains("issued_min"));
    }

    #[test]
    fn datetime_params_accept_plain_dates() {
        let params = QueryParams::parse(Some("date_from=2023-05-01"));
        let filters = ClipFilterParams::from_query(&params).unwrap();
        assert_eq!(
            filters.date_from.unwrap().date_naive(),
            NaiveDate::from_ymd_opt(2023, 5, 1).unwrap()
        );
    }

    #[test]
    fn search_defaults_to_identifier_and_name() {
        let params = QueryParams::parse(Some("search=forest"));
        let search = SearchParams::project_search(&params).unwrap();
        assert_eq!(search.fields.len(), 2);
        assert!(search.spec.is_some());
    }

    #[test]
    fn search_fields_override_defaults() {
        let params = QueryParams::parse(Some(
            "beneficiary_search=delta&search_fields=%5B%7B%22field%22%3A%22retirement_beneficiary%22%2C%22weight%22%3A0.5%7D%5D",
        ));
        let search = SearchParams::beneficiary_search(&params).unwrap();
        assert_eq!(search.fields.len(), 1);
        assert_eq!(search.fields[0].field, "retirement_beneficiary");
    }

    #[test]
    fn out_of_range_threshold_rejected() {
        let params = QueryParams::parse(Some("search=x&similarity_threshold=2"));
        assert!(SearchParams::project_search(&params).is_err());
    }
}
