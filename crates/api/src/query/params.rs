//! Raw query string handling.
//!
//! Listing endpoints accept multi-valued parameters as repeated keys
//! (`country=US&country=PE`), which also need to survive round-trips into
//! `next_page` links and response-cache keys. Axum's typed extractors
//! flatten repeated keys, so the raw query string is parsed once here and
//! all typed parameter access goes through [`QueryParams`].

use std::fmt::Write as _;
use std::str::FromStr;

use crate::error::{ApiError, ApiResult};

/// Parsed query parameters, preserving order and repeated keys.
#[derive(Debug, Clone, Default)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    /// Parse a raw query string (without the leading `?`).
    pub fn parse(raw: Option<&str>) -> Self {
        let pairs = match raw {
            Some(raw) => url::form_urlencoded::parse(raw.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect(),
            None => Vec::new(),
        };
        Self { pairs }
    }

    /// Build from already-decoded pairs.
    pub fn from_pairs<K: Into<String>, V: Into<String>>(pairs: Vec<(K, V)>) -> Self {
        Self {
            pairs: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// All values for a key, in request order.
    pub fn all(&self, key: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// First value for a key.
    pub fn first(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All values for a key as owned strings.
    pub fn strings(&self, key: &str) -> Vec<String> {
        self.all(key).into_iter().map(str::to_string).collect()
    }

    /// Parse the first value for a key, failing with a 400 that names the
    /// parameter when the value does not parse.
    pub fn parse_first<T: FromStr>(&self, key: &str) -> ApiResult<Option<T>> {
        match self.first(key) {
            None => Ok(None),
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|_| ApiError::invalid_parameter(key, format!("cannot parse '{raw}'"))),
        }
    }

    /// Parse every value for a key.
    pub fn parse_all<T: FromStr>(&self, key: &str) -> ApiResult<Vec<T>> {
        self.all(key)
            .into_iter()
            .map(|raw| {
                raw.parse().map_err(|_| {
                    ApiError::invalid_parameter(key, format!("cannot parse '{raw}'"))
                })
            })
            .collect()
    }

    /// Canonical cache key for this request.
    ///
    /// Parameter order and repeated-value order are normalized by sorting,
    /// so `?a=1&b=2` and `?b=2&a=1` memoize to the same entry.
    pub fn cache_key(&self, method: &str, path: &str) -> String {
        let mut sorted: Vec<&(String, String)> = self.pairs.iter().collect();
        sorted.sort();

        let mut key = format!("offsets-db:{}:{}", method.to_lowercase(), path);
        for (i, (k, v)) in sorted.iter().enumerate() {
            key.push(if i == 0 { '?' } else { '&' });
            let _ = write!(key, "{k}={v}");
        }
        key
    }

    /// Re-encode the query string for the next page.
    ///
    /// Every original parameter is preserved (repeated keys re-emitted as
    /// repeated keys), with `current_page` advanced and `per_page` pinned.
    pub fn next_page_query(&self, next_page: u32, per_page: u32) -> String {
        let mut encoded: Vec<String> = self
            .pairs
            .iter()
            .filter(|(k, _)| k != "current_page" && k != "per_page")
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect();

        encoded.push(format!("current_page={next_page}"));
        encoded.push(format!("per_page={per_page}"));
        encoded.join("&")
    }
}

/// Absolute URL of the next page for the current request.
pub fn next_page_url(
    site_url: &str,
    path: &str,
    params: &QueryParams,
    current_page: u32,
    per_page: u32,
) -> String {
    let base = site_url.trim_end_matches('/');
    let query = params.next_page_query(current_page + 1, per_page);
    format!("{base}{path}?{query}")
}
