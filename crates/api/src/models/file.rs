//! Ingestion file bookkeeping model.
//!
//! The batch pipeline that loads registry exports lives outside this
//! service; these records track what it loaded and when, and back the
//! health endpoint's freshness report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Processing status values.
pub mod status {
    pub const PENDING: &str = "pending";
    pub const SUCCESS: &str = "success";
    pub const FAILURE: &str = "failure";
}

/// File categories tracked for freshness reporting.
pub const TRACKED_CATEGORIES: &[&str] = &["projects", "credits", "clips"];

/// One ingested source file.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct File {
    pub id: i64,

    /// Source URL of the file.
    pub url: String,

    /// Hash of file contents, when known.
    pub content_hash: Option<String>,

    /// Processing status (`pending`, `success`, `failure`).
    pub status: String,

    /// Error message if processing failed.
    pub error: Option<String>,

    /// When the file was recorded in the database.
    pub recorded_at: DateTime<Utc>,

    /// Kind of data the file carries (`projects`, `credits`, `clips`, ...).
    pub category: String,
}
