//! Application state shared across all handlers.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::PgPool;
use tracing::{info, warn};

use crate::cache::{MemoryCache, ResponseCache};
use crate::config::Config;
use crate::db;
use crate::metrics::Metrics;
use crate::query::{AliasLookup, StaticAliasTable};

/// Shared application state.
///
/// Wrapped in Arc internally so Clone is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// PostgreSQL connection pool.
    db: PgPool,

    /// Response memoization cache.
    cache: Arc<dyn ResponseCache>,

    /// Alias/acronym lookup for weighted fuzzy search.
    aliases: Arc<dyn AliasLookup>,

    /// Prometheus metrics.
    metrics: Arc<Metrics>,

    /// Loaded configuration.
    config: Config,
}

impl AppState {
    /// Create new application state with database connections.
    pub async fn new(config: &Config) -> Result<Self> {
        let db = db::create_pool(config)
            .await
            .context("failed to create database pool")?;

        db::run_migrations(&db)
            .await
            .context("failed to run migrations")?;

        if config.api_key.is_none() {
            warn!("API_KEY is not set; request authentication is disabled");
        }

        let cache = Arc::new(MemoryCache::new());
        info!(ttl_secs = config.cache_ttl_secs, "response cache ready");

        Ok(Self {
            inner: Arc::new(AppStateInner {
                db,
                cache,
                aliases: Arc::new(StaticAliasTable::with_defaults()),
                metrics: Arc::new(Metrics::new()),
                config: config.clone(),
            }),
        })
    }

    /// Build state from preconstructed parts (used by tests).
    pub fn from_parts(db: PgPool, config: Config) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                db,
                cache: Arc::new(MemoryCache::new()),
                aliases: Arc::new(StaticAliasTable::with_defaults()),
                metrics: Arc::new(Metrics::new()),
                config,
            }),
        }
    }

    /// Get the database pool.
    pub fn db(&self) -> &PgPool {
        &self.inner.db
    }

    /// Get the response cache.
    pub fn response_cache(&self) -> &Arc<dyn ResponseCache> {
        &self.inner.cache
    }

    /// Configured response cache TTL.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.inner.config.cache_ttl_secs)
    }

    /// Get the alias lookup used by weighted fuzzy search.
    pub fn aliases(&self) -> &Arc<dyn AliasLookup> {
        &self.inner.aliases
    }

    /// Get the metrics registry.
    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.inner.metrics
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Check if PostgreSQL is healthy.
    pub async fn postgres_healthy(&self) -> bool {
        db::check_health(&self.inner.db).await
    }
}
