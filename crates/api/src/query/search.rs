//! Free-text search predicates.
//!
//! A search term is a plain case-insensitive substring match unless an
//! explicit mode prefix is present:
//!
//! - `r:<pattern>` — POSIX regular expression (`~*`) over the field list
//! - `t:<term>` — trigram word similarity against a numeric threshold
//! - `w:<term>` — weighted fuzzy match that also expands known
//!   aliases/acronyms of the term before scoring
//!
//! Fields are supplied as `{field, weight}` pairs (the `search_fields`
//! parameter carries them as JSON). All per-field/per-variant conditions
//! are OR-ed into a single predicate.

use sea_query::SimpleExpr;
use sea_query::extension::postgres::PgBinOper;
use sea_query::{Cond, Expr, ExprTrait};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::query::entity::EntityDef;
use crate::query::filter::escape_like_wildcards;

/// Default trigram similarity threshold.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.7;

/// A search field with its relative weight.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct WeightedField {
    pub field: String,
    pub weight: f64,
}

impl WeightedField {
    pub fn unit(field: &str) -> Self {
        Self {
            field: field.to_string(),
            weight: 1.0,
        }
    }
}

/// Parse the `search_fields` parameter (a JSON list of `{field, weight}`).
pub fn parse_search_fields(raw: &str) -> ApiResult<Vec<WeightedField>> {
    serde_json::from_str(raw).map_err(|e| ApiError::MalformedSearchFields(e.to_string()))
}

/// Validate a `similarity_threshold` value.
pub fn validate_threshold(threshold: f64) -> ApiResult<f64> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(threshold)
    } else {
        Err(ApiError::invalid_parameter(
            "similarity_threshold",
            "must be between 0 and 1",
        ))
    }
}

/// Search interpretation modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    Plain,
    Regex,
    Similarity,
    WeightedFuzzy,
}

/// A parsed search term.
#[derive(Debug, Clone)]
pub struct SearchSpec {
    pub mode: SearchMode,
    pub term: String,
}

impl SearchSpec {
    /// Split an optional mode prefix off the raw search input.
    pub fn parse(input: &str) -> Self {
        let (mode, term) = if let Some(rest) = input.strip_prefix("r:") {
            (SearchMode::Regex, rest)
        } else if let Some(rest) = input.strip_prefix("t:") {
            (SearchMode::Similarity, rest)
        } else if let Some(rest) = input.strip_prefix("w:") {
            (SearchMode::WeightedFuzzy, rest)
        } else {
            (SearchMode::Plain, input)
        };

        Self {
            mode,
            term: term.trim().to_string(),
        }
    }
}

/// Expands a search term into known alias/acronym variations.
///
/// The default table covers common retirement-beneficiary shorthand; swap
/// the implementation to plug in an external synonym source.
pub trait AliasLookup: Send + Sync {
    /// All variations of a term worth scoring, starting with the term itself.
    fn expand(&self, term: &str) -> Vec<String>;
}

/// In-memory alias table.
#[derive(Debug, Clone, Default)]
pub struct StaticAliasTable {
    entries: Vec<(&'static str, &'static [&'static str])>,
}

impl StaticAliasTable {
    /// Table of well-known beneficiary acronyms and short forms.
    pub fn with_defaults() -> Self {
        Self {
            entries: vec![
                ("jpm", &["jpmorgan", "jpmorgan chase"]),
                ("gm", &["general motors"]),
                ("dal", &["delta", "delta air lines"]),
                ("ual", &["united", "united airlines"]),
                ("msft", &["microsoft"]),
                ("bp", &["british petroleum"]),
                ("ms", &["morgan stanley"]),
            ],
        }
    }
}

impl AliasLookup for StaticAliasTable {
    fn expand(&self, term: &str) -> Vec<String> {
        let needle = term.to_lowercase();
        let mut variants = vec![needle.clone()];

        for (acronym, expansions) in &self.entries {
            let hit = *acronym == needle || expansions.iter().any(|e| *e == needle);
            if hit {
                for form in std::iter::once(*acronym).chain(expansions.iter().copied()) {
                    if !variants.iter().any(|v| v == form) {
                        variants.push(form.to_string());
                    }
                }
            }
        }

        variants
    }
}

/// Build the search predicate for one entity, or None when the term is
/// empty or no usable field remains.
pub fn search_condition(
    entity: &'static EntityDef,
    spec: &SearchSpec,
    fields: &[WeightedField],
    threshold: f64,
    aliases: &dyn AliasLookup,
) -> ApiResult<Option<SimpleExpr>> {
    if spec.term.is_empty() {
        return Ok(None);
    }

    // Unregistered fields are dropped rather than erroring so that callers
    // can share one field list across entities.
    let fields: Vec<&WeightedField> = fields
        .iter()
        .filter(|f| {
            let known = entity.column(&f.field).is_some();
            if !known {
                tracing::debug!(entity = entity.table, field = %f.field, "skipping unknown search field");
            }
            known
        })
        .collect();

    if fields.is_empty() {
        tracing::warn!(entity = entity.table, "no usable search fields; search ignored");
        return Ok(None);
    }

    let mut cond = Cond::any();
    match spec.mode {
        SearchMode::Plain => {
            let pattern = format!("%{}%", escape_like_wildcards(&spec.term));
            for f in &fields {
                cond = cond.add(
                    Expr::col(entity.col(&f.field))
                        .binary(PgBinOper::ILike, Expr::val(pattern.clone())),
                );
            }
        }
        SearchMode::Regex => {
            // Reject syntactically broken patterns before they reach the
            // database; Postgres shares the POSIX-class syntax checked here.
            regex::Regex::new(&spec.term).map_err(|e| {
                ApiError::invalid_parameter("search", format!("invalid regular expression: {e}"))
            })?;
            for f in &fields {
                cond = cond.add(Expr::cust_with_values(
                    format!("\"{}\".\"{}\" ~* ?", entity.table, f.field),
                    [spec.term.clone()],
                ));
            }
        }
        SearchMode::Similarity => {
            for f in &fields {
                cond = cond.add(Expr::cust_with_values(
                    format!("word_similarity(?, \"{}\".\"{}\") >= ?", entity.table, f.field),
                    [spec.term.clone().into(), sea_query::Value::from(threshold)],
                ));
            }
        }
        SearchMode::WeightedFuzzy => {
            for variant in aliases.expand(&spec.term) {
                for f in &fields {
                    cond = cond.add(Expr::cust_with_values(
                        format!(
                            "word_similarity(?, \"{}\".\"{}\") * ? >= ?",
                            entity.table, f.field
                        ),
                        [
                            sea_query::Value::from(variant.clone()),
                            sea_query::Value::from(f.weight),
                            sea_query::Value::from(threshold),
                        ],
                    ));
                }
            }
        }
    }

    Ok(Some(cond.into()))
}
