//! Declarative filter descriptors and predicate construction.
//!
//! A [`FilterDescriptor`] is a declarative (entity, attribute, operator,
//! values) tuple. Descriptors with no values contribute no predicate; all
//! descriptors for a request are AND-ed together. Within one descriptor a
//! list of values matches ANY listed value, except `ALL` on array columns
//! which requires every element to be present.

use anyhow::anyhow;
use sea_query::extension::postgres::PgBinOper;
use sea_query::{Cond, Expr, ExprTrait, SimpleExpr, Value};

use crate::error::{ApiError, ApiResult};
use crate::query::entity::EntityDef;

/// A single typed filter value.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    Int(i64),
    Bool(bool),
    Date(chrono::NaiveDate),
    DateTime(chrono::DateTime<chrono::Utc>),
}

impl FilterValue {
    /// Convert into a sea-query value for predicate construction.
    fn to_value(&self) -> Value {
        match self {
            FilterValue::Text(s) => s.clone().into(),
            FilterValue::Int(i) => (*i).into(),
            FilterValue::Bool(b) => (*b).into(),
            FilterValue::Date(d) => (*d).into(),
            FilterValue::DateTime(t) => (*t).into(),
        }
    }

    /// Textual form, used for substring patterns.
    fn as_pattern_text(&self) -> String {
        match self {
            FilterValue::Text(s) => s.clone(),
            FilterValue::Int(i) => i.to_string(),
            FilterValue::Bool(b) => b.to_string(),
            FilterValue::Date(d) => d.to_string(),
            FilterValue::DateTime(t) => t.to_rfc3339(),
        }
    }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        FilterValue::Text(v)
    }
}

impl From<i64> for FilterValue {
    fn from(v: i64) -> Self {
        FilterValue::Int(v)
    }
}

impl From<bool> for FilterValue {
    fn from(v: bool) -> Self {
        FilterValue::Bool(v)
    }
}

impl From<chrono::NaiveDate> for FilterValue {
    fn from(v: chrono::NaiveDate) -> Self {
        FilterValue::Date(v)
    }
}

impl From<chrono::DateTime<chrono::Utc>> for FilterValue {
    fn from(v: chrono::DateTime<chrono::Utc>) -> Self {
        FilterValue::DateTime(v)
    }
}

/// Filter operators.
///
/// `ContainsAny`/`ContainsAll` apply to array columns only; the scalar
/// operators apply to scalar columns only. `ILike` matches anywhere in the
/// string, case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Equals,
    ILike,
    Gte,
    Lte,
    ContainsAny,
    ContainsAll,
}

/// Operator names accepted from external descriptors.
pub const OPERATOR_NAMES: &[&str] = &["==", "ilike", ">=", "<=", "ANY", "ALL"];

impl FilterOp {
    /// Parse an operator name. Unknown names fail, naming the allowed set.
    pub fn parse(name: &str) -> ApiResult<Self> {
        match name {
            "==" => Ok(FilterOp::Equals),
            "ilike" => Ok(FilterOp::ILike),
            ">=" => Ok(FilterOp::Gte),
            "<=" => Ok(FilterOp::Lte),
            "ANY" => Ok(FilterOp::ContainsAny),
            "ALL" => Ok(FilterOp::ContainsAll),
            other => Err(ApiError::InvalidFilterOperator {
                operator: other.to_string(),
                allowed: OPERATOR_NAMES,
            }),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FilterOp::Equals => "==",
            FilterOp::ILike => "ilike",
            FilterOp::Gte => ">=",
            FilterOp::Lte => "<=",
            FilterOp::ContainsAny => "ANY",
            FilterOp::ContainsAll => "ALL",
        }
    }
}

/// One declarative filter constraint.
#[derive(Debug, Clone)]
pub struct FilterDescriptor {
    pub entity: &'static EntityDef,
    pub attribute: &'static str,
    pub op: FilterOp,
    /// Absent values make the descriptor a no-op, never an error.
    pub values: Option<Vec<FilterValue>>,
}

impl FilterDescriptor {
    pub fn new(
        entity: &'static EntityDef,
        attribute: &'static str,
        op: FilterOp,
        values: Option<Vec<FilterValue>>,
    ) -> Self {
        Self {
            entity,
            attribute,
            op,
            values,
        }
    }

    /// Single-valued descriptor; None value → no-op.
    pub fn scalar<V: Into<FilterValue>>(
        entity: &'static EntityDef,
        attribute: &'static str,
        op: FilterOp,
        value: Option<V>,
    ) -> Self {
        Self::new(entity, attribute, op, value.map(|v| vec![v.into()]))
    }

    /// Multi-valued descriptor; empty list is treated as absent.
    pub fn list<V: Into<FilterValue>>(
        entity: &'static EntityDef,
        attribute: &'static str,
        op: FilterOp,
        values: Vec<V>,
    ) -> Self {
        let values = if values.is_empty() {
            None
        } else {
            Some(values.into_iter().map(Into::into).collect())
        };
        Self::new(entity, attribute, op, values)
    }

    /// Build the predicate for this descriptor, or None for a no-op.
    pub fn condition(&self) -> ApiResult<Option<SimpleExpr>> {
        let Some(values) = &self.values else {
            return Ok(None);
        };
        if values.is_empty() {
            return Ok(None);
        }

        let column = self.entity.column(self.attribute).ok_or_else(|| {
            ApiError::Internal(anyhow!(
                "filter references unregistered attribute {}.{}",
                self.entity.table,
                self.attribute
            ))
        })?;

        if column.kind.is_array() {
            let per_element: Vec<SimpleExpr> = values
                .iter()
                .map(|v| self.array_contains(v))
                .collect();

            let cond = match self.op {
                FilterOp::ContainsAll => per_element
                    .into_iter()
                    .fold(Cond::all(), |cond, expr| cond.add(expr)),
                // ANY is the default semantics for array attributes.
                FilterOp::ContainsAny | FilterOp::Equals | FilterOp::ILike => per_element
                    .into_iter()
                    .fold(Cond::any(), |cond, expr| cond.add(expr)),
                op => {
                    return Err(ApiError::Internal(anyhow!(
                        "operator {} not applicable to array column {}.{}",
                        op.name(),
                        self.entity.table,
                        self.attribute
                    )));
                }
            };
            return Ok(Some(cond.into()));
        }

        match self.op {
            FilterOp::ContainsAny | FilterOp::ContainsAll => Err(ApiError::Internal(anyhow!(
                "operator {} requires an array column, got scalar {}.{}",
                self.op.name(),
                self.entity.table,
                self.attribute
            ))),
            op => {
                if values.len() == 1 {
                    Ok(Some(self.scalar_condition(op, &values[0])))
                } else {
                    // A list on a scalar attribute matches ANY listed value.
                    let cond = values
                        .iter()
                        .map(|v| self.scalar_condition(op, v))
                        .fold(Cond::any(), |cond, expr| cond.add(expr));
                    Ok(Some(cond.into()))
                }
            }
        }
    }

    fn scalar_condition(&self, op: FilterOp, value: &FilterValue) -> SimpleExpr {
        let col = Expr::col(self.entity.col(self.attribute));
        match op {
            FilterOp::Equals => col.eq(value.to_value()),
            FilterOp::ILike => {
                let pattern = format!("%{}%", escape_like_wildcards(&value.as_pattern_text()));
                col.binary(PgBinOper::ILike, Expr::val(pattern))
            }
            FilterOp::Gte => col.gte(value.to_value()),
            FilterOp::Lte => col.lte(value.to_value()),
            // Array operators are routed away before this point.
            FilterOp::ContainsAny | FilterOp::ContainsAll => Expr::value(false),
        }
    }

    /// "array column contains element v" test (`@> ARRAY[v]`).
    fn array_contains(&self, value: &FilterValue) -> SimpleExpr {
        Expr::cust_with_values(
            format!(
                "\"{}\".\"{}\" @> ARRAY[?]",
                self.entity.table, self.attribute
            ),
            [value.to_value()],
        )
    }
}

/// AND all descriptors for a request into one composite condition.
pub fn build_conditions(descriptors: &[FilterDescriptor]) -> ApiResult<Cond> {
    let mut cond = Cond::all();
    for descriptor in descriptors {
        if let Some(expr) = descriptor.condition()? {
            cond = cond.add(expr);
        }
    }
    Ok(cond)
}

/// Escape SQL LIKE wildcard characters (`%`, `_`, `\`) in a value.
pub fn escape_like_wildcards(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
