//! Offset/limit pagination and the response envelope.

use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::query::params::{QueryParams, next_page_url};

pub const DEFAULT_PER_PAGE: u32 = 100;
pub const MAX_PER_PAGE: u32 = 200;

/// Pagination metadata included with every listing response.
#[derive(Debug, Clone, Serialize)]
pub struct Pagination {
    pub total_entries: u64,
    pub current_page: u32,
    pub total_pages: u32,
    pub next_page: Option<String>,
}

/// Envelope for listing and chart responses.
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    pub pagination: Pagination,
    pub data: Vec<T>,
}

/// Validated pagination parameters.
#[derive(Debug, Clone, Copy)]
pub struct PageParams {
    pub current_page: u32,
    pub per_page: u32,
}

impl PageParams {
    /// Extract and validate `current_page`/`per_page`.
    ///
    /// Fails before any query executes when `current_page < 1` or
    /// `per_page` falls outside [1, 200].
    pub fn from_query(params: &QueryParams) -> ApiResult<Self> {
        let current_page = params.parse_first::<u32>("current_page")?.unwrap_or(1);
        let per_page = params
            .parse_first::<u32>("per_page")?
            .unwrap_or(DEFAULT_PER_PAGE);

        if current_page < 1 {
            return Err(ApiError::invalid_parameter(
                "current_page",
                "must be at least 1",
            ));
        }
        if !(1..=MAX_PER_PAGE).contains(&per_page) {
            return Err(ApiError::invalid_parameter(
                "per_page",
                format!("must be between 1 and {MAX_PER_PAGE}"),
            ));
        }

        Ok(Self {
            current_page,
            per_page,
        })
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.current_page - 1) * u64::from(self.per_page)
    }

    pub fn limit(&self) -> u64 {
        u64::from(self.per_page)
    }
}

/// `ceil(total_entries / per_page)`; zero when there are no entries.
pub fn total_pages(total_entries: u64, per_page: u32) -> u32 {
    let per_page = u64::from(per_page);
    let pages = total_entries.div_ceil(per_page);
    u32::try_from(pages).unwrap_or(u32::MAX)
}

impl Pagination {
    /// Build full pagination metadata, synthesizing a `next_page` link when
    /// pages remain after the current one.
    pub fn new(
        total_entries: u64,
        page: PageParams,
        site_url: &str,
        path: &str,
        params: &QueryParams,
    ) -> Self {
        let total_pages = total_pages(total_entries, page.per_page);
        let next_page = (page.current_page < total_pages).then(|| {
            next_page_url(site_url, path, params, page.current_page, page.per_page)
        });

        Self {
            total_entries,
            current_page: page.current_page,
            total_pages,
            next_page,
        }
    }

    /// Single-page metadata used by chart endpoints, whose full result set
    /// is always returned at once.
    pub fn single(total_entries: u64, current_page: u32) -> Self {
        Self {
            total_entries,
            current_page,
            total_pages: 1,
            next_page: None,
        }
    }
}

#[cfg(test)]
// Tests are allowed to use unwrap/expect freely.
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn page(current_page: u32, per_page: u32) -> PageParams {
        PageParams {
            current_page,
            per_page,
        }
    }

    #[test]
    fn total_pages_is_ceiling_division() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(1, 10), 1);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(total_pages(25, 10), 3);
    }

    #[test]
    fn defaults_applied_when_absent() {
        let params = QueryParams::parse(None);
        let page = PageParams::from_query(&params).unwrap();
        assert_eq!(page.current_page, 1);
        assert_eq!(page.per_page, DEFAULT_PER_PAGE);
    }

    #[test]
    fn per_page_bounds_enforced() {
        for query in ["per_page=0", "per_page=201"] {
            let params = QueryParams::parse(Some(query));
            assert!(PageParams::from_query(&params).is_err(), "{query}");
        }
        let params = QueryParams::parse(Some("per_page=200"));
        assert!(PageParams::from_query(&params).is_ok());
    }

    #[test]
    fn current_page_must_be_positive() {
        let params = QueryParams::parse(Some("current_page=0"));
        assert!(PageParams::from_query(&params).is_err());
    }

    #[test]
    fn offset_from_page_number() {
        assert_eq!(page(1, 100).offset(), 0);
        assert_eq!(page(3, 25).offset(), 50);
    }

    #[test]
    fn next_page_present_iff_pages_remain() {
        let params = QueryParams::parse(Some("registry=verra"));

        let mid = Pagination::new(25, page(2, 10), "http://t", "/projects", &params);
        assert_eq!(mid.total_pages, 3);
        let next = mid.next_page.unwrap();
        assert!(next.contains("current_page=3"), "{next}");
        assert!(next.contains("registry=verra"), "{next}");

        let last = Pagination::new(25, page(3, 10), "http://t", "/projects", &params);
        assert!(last.next_page.is_none());
    }

    #[test]
    fn empty_result_set_has_zero_pages() {
        let params = QueryParams::parse(None);
        let p = Pagination::new(0, page(1, 10), "http://t", "/projects", &params);
        assert_eq!(p.total_pages, 0);
        assert!(p.next_page.is_none());
    }
}
