//! Credit transaction model.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One credit issuance or retirement transaction.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Credit {
    pub id: i64,

    /// Project the transaction belongs to.
    pub project_id: Option<String>,

    /// Number of credits.
    pub quantity: i64,

    /// Vintage year of the credits.
    pub vintage: Option<i32>,

    /// Date of the transaction.
    pub transaction_date: Option<NaiveDate>,

    /// Type of transaction (issuance, retirement, ...).
    pub transaction_type: Option<String>,

    /// Retirement account, as reported by the registry.
    pub retirement_account: Option<String>,

    /// Retirement beneficiary, as reported.
    pub retirement_beneficiary: Option<String>,

    /// Normalized beneficiary name used for beneficiary search.
    pub retirement_beneficiary_harmonized: Option<String>,

    pub retirement_note: Option<String>,
    pub retirement_reason: Option<String>,
}
