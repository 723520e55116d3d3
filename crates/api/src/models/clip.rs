//! News clip model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A news article or media clip referencing one or more projects.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Clip {
    pub id: i64,

    /// Date the clip was published.
    pub date: DateTime<Utc>,

    pub title: Option<String>,
    pub url: Option<String>,
    pub source: Option<String>,
    pub tags: Option<Vec<String>>,
    pub notes: Option<String>,

    /// Whether the clip URL points at an archived copy.
    pub is_waybacked: Option<bool>,

    /// Type of clip.
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub clip_type: String,
}

/// Clip-to-project association row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ClipProject {
    pub id: i64,
    pub clip_id: i64,
    pub project_id: String,
}
