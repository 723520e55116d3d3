//! Prometheus metrics collection.

use prometheus_client::encoding::{EncodeLabelSet, text::encode};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;

/// HTTP request labels.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct HttpLabels {
    pub method: String,
    pub path: String,
    pub status: u16,
}

/// Application metrics.
pub struct Metrics {
    registry: Registry,

    /// HTTP request counter by method/path/status.
    pub http_requests: Family<HttpLabels, Counter>,

    /// HTTP request duration histogram.
    pub http_duration_seconds: Family<HttpLabels, Histogram>,

    /// Database query duration.
    pub db_query_duration_seconds: Histogram,

    /// Response cache hit counter.
    pub cache_hits: Counter,

    /// Response cache miss counter.
    pub cache_misses: Counter,
}

impl Metrics {
    /// Create a new metrics registry.
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let http_requests = Family::<HttpLabels, Counter>::default();
        registry.register(
            "http_requests_total",
            "Total HTTP requests",
            http_requests.clone(),
        );

        let http_duration_seconds = Family::<HttpLabels, Histogram>::new_with_constructor(|| {
            Histogram::new(exponential_buckets(0.001, 2.0, 12))
        });
        registry.register(
            "http_request_duration_seconds",
            "HTTP request duration in seconds",
            http_duration_seconds.clone(),
        );

        let db_query_duration_seconds = Histogram::new(exponential_buckets(0.0001, 2.0, 14));
        registry.register(
            "db_query_duration_seconds",
            "Database query duration in seconds",
            db_query_duration_seconds.clone(),
        );

        let cache_hits = Counter::default();
        registry.register("cache_hits_total", "Cache hit count", cache_hits.clone());

        let cache_misses = Counter::default();
        registry.register(
            "cache_misses_total",
            "Cache miss count",
            cache_misses.clone(),
        );

        Self {
            registry,
            http_requests,
            http_duration_seconds,
            db_query_duration_seconds,
            cache_hits,
            cache_misses,
        }
    }

    /// Record an HTTP request.
    pub fn record_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let labels = HttpLabels {
            method: method.to_string(),
            path: normalize_path(path),
            status,
        };

        self.http_requests.get_or_create(&labels).inc();
        self.http_duration_seconds
            .get_or_create(&labels)
            .observe(duration_secs);
    }

    /// Record a database query.
    pub fn record_db_query(&self, duration_secs: f64) {
        self.db_query_duration_seconds.observe(duration_secs);
    }

    /// Record a response cache hit.
    pub fn record_cache_hit(&self) {
        self.cache_hits.inc();
    }

    /// Record a response cache miss.
    pub fn record_cache_miss(&self) {
        self.cache_misses.inc();
    }

    /// Encode metrics in Prometheus text format.
    pub fn encode(&self) -> String {
        let mut buffer = String::new();
        // Prometheus encoding to a String buffer is infallible
        #[allow(clippy::expect_used)]
        encode(&mut buffer, &self.registry).expect("encoding metrics");
        buffer
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish()
    }
}

/// Normalize a path for metrics labels.
///
/// Dynamic segments (numeric ids, registry project ids like `VCS1234`)
/// collapse to a placeholder to limit label cardinality.
fn normalize_path(path: &str) -> String {
    let normalized: Vec<String> = path
        .split('/')
        .map(|s| {
            let has_digit = s.chars().any(|c| c.is_ascii_digit());
            if !s.is_empty() && has_digit {
                "{id}".to_string()
            } else {
                s.to_string()
            }
        })
        .collect();
    normalized.join("/")
}
