//! Configuration loaded from environment variables.

use std::env;

use anyhow::{Context, Result};

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port (default: 3000).
    pub port: u16,

    /// PostgreSQL connection URL.
    pub database_url: String,

    /// Maximum database connections in pool (default: 10).
    pub database_max_connections: u32,

    /// Shared-secret API key checked against the `X-API-KEY` header.
    /// When None, authentication is disabled.
    pub api_key: Option<String>,

    /// Public base URL used when synthesizing `next_page` links
    /// (default: http://localhost:{port}).
    pub site_url: String,

    /// CORS allowed origins (comma-separated, default: "*").
    pub cors_allowed_origins: Vec<String>,

    /// Response cache TTL in seconds (default: 86400).
    pub cache_ttl_secs: u64,

    /// Whether this deployment serves the staging dataset (default: true).
    pub staging: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("PORT must be a valid u16")?;

        let database_url = env::var("DATABASE_URL")
            .context("DATABASE_URL environment variable is required")
            // Older managed-Postgres providers hand out postgres:// URLs.
            .map(|url| match url.strip_prefix("postgres://") {
                Some(rest) => format!("postgresql://{rest}"),
                None => url,
            })?;

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("DATABASE_MAX_CONNECTIONS must be a valid u32")?;

        let api_key = env::var("API_KEY").ok().filter(|k| !k.is_empty());

        let site_url = env::var("SITE_URL").unwrap_or_else(|_| format!("http://localhost:{port}"));

        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
            .unwrap_or_else(|_| vec!["*".to_string()]);

        let cache_ttl_secs = env::var("CACHE_TTL_SECS")
            .unwrap_or_else(|_| "86400".to_string())
            .parse()
            .context("CACHE_TTL_SECS must be a valid u64")?;

        let staging = env::var("STAGING")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(true);

        Ok(Self {
            port,
            database_url,
            database_max_connections,
            api_key,
            site_url,
            cors_allowed_origins,
            cache_ttl_secs,
            staging,
        })
    }
}
