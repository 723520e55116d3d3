//! Response memoization layer.
//!
//! Full JSON responses are memoized under canonical request keys (see
//! `query::params::QueryParams::cache_key`). The cache is strictly
//! best-effort: a backend failure is logged and the request proceeds
//! uncached, never failing the request itself.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;
use tracing::{debug, warn};

/// Maximum number of memoized responses.
const MAX_CAPACITY: u64 = 10_000;

/// Key-value store for serialized responses.
///
/// Injected into the application state so the query layer stays testable
/// without a cache backend; swap the implementation to move memoization
/// out of process.
#[async_trait]
pub trait ResponseCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;
    async fn set(&self, key: &str, value: String, ttl: Duration);
    async fn clear(&self);
}

#[derive(Clone)]
struct Entry {
    body: String,
    ttl: Duration,
}

/// Per-entry TTL policy: each response expires `entry.ttl` after insert.
struct EntryTtl;

impl Expiry<String, Entry> for EntryTtl {
    fn expire_after_create(&self, _key: &String, entry: &Entry, _now: Instant) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// In-process response cache.
#[derive(Clone)]
pub struct MemoryCache {
    inner: Cache<String, Entry>,
}

impl MemoryCache {
    pub fn new() -> Self {
        let inner = Cache::builder()
            .max_capacity(MAX_CAPACITY)
            .expire_after(EntryTtl)
            .build();
        Self { inner }
    }

    /// Number of live entries (for monitoring).
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResponseCache for MemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        let hit = self.inner.get(key).await;
        if hit.is_some() {
            debug!(key = %key, "response cache hit");
        }
        hit.map(|e| e.body)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) {
        self.inner
            .insert(key.to_string(), Entry { body: value, ttl })
            .await;
    }

    async fn clear(&self) {
        self.inner.invalidate_all();
    }
}

/// Serialize and store a response body, logging (never propagating)
/// failures.
pub async fn store_json<T: serde::Serialize>(
    cache: &dyn ResponseCache,
    key: &str,
    value: &T,
    ttl: Duration,
) -> Option<String> {
    match serde_json::to_string(value) {
        Ok(body) => {
            cache.set(key, body.clone(), ttl).await;
            Some(body)
        }
        Err(e) => {
            warn!(error = %e, key = %key, "failed to serialize response for caching");
            None
        }
    }
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache").finish()
    }
}
