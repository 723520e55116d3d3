//! Project model.
//!
//! A carbon-offset project as tracked by one of the registries. Projects
//! carry set-valued protocol/category labels and running credit totals.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Project record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    /// Project id used by the registry system (e.g. `VCS1234`).
    pub project_id: String,

    /// Name of the project.
    pub name: Option<String>,

    /// Name of the registry tracking the project.
    pub registry: String,

    /// Project proponent.
    pub proponent: Option<String>,

    /// Protocols the project follows.
    pub protocol: Option<Vec<String>>,

    /// Categories the project belongs to.
    pub category: Option<Vec<String>>,

    /// Registry status (listed, registered, completed, ...).
    pub status: Option<String>,

    /// Host country.
    pub country: Option<String>,

    /// Date the project was listed.
    pub listed_at: Option<NaiveDate>,

    /// Whether this is a compliance-market project.
    pub is_compliance: Option<bool>,

    /// Total retired credits.
    pub retired: Option<i64>,

    /// Total issued credits.
    pub issued: Option<i64>,

    /// URL to project details on the registry.
    pub project_url: Option<String>,
}
