//! Sort token parsing and ordering plans.
//!
//! Tokens are `field`, `+field`, or `-field` (ascending by default). Field
//! names are validated against the entity registry before any query runs.
//! Nulls always sort last, text columns compare case-insensitively, and the
//! entity primary key is appended as a final ascending tie-break so that
//! pagination is deterministic even when every requested key compares equal.

use sea_query::{Expr, Func, NullOrdering, Order, SelectStatement, SimpleExpr};

use crate::error::{ApiError, ApiResult};
use crate::query::entity::{ColumnDef, EntityDef};

/// One resolved ordering key.
#[derive(Debug, Clone)]
struct SortKey {
    column: &'static ColumnDef,
    order: Order,
}

/// A validated, total ordering over one entity.
#[derive(Debug, Clone)]
pub struct OrderingPlan {
    entity: &'static EntityDef,
    keys: Vec<SortKey>,
}

impl OrderingPlan {
    /// Parse and validate sort tokens into an ordering plan.
    ///
    /// Fails with `InvalidSortField` before any SQL is built when a token
    /// names an attribute the entity does not have.
    pub fn parse(tokens: &[String], entity: &'static EntityDef) -> ApiResult<Self> {
        let mut keys = Vec::with_capacity(tokens.len() + 1);
        let mut saw_primary_key = false;

        for token in tokens {
            let token = token.trim();
            let (order, field) = match token.strip_prefix('-') {
                Some(rest) => (Order::Desc, rest),
                None => (Order::Asc, token.strip_prefix('+').unwrap_or(token)),
            };

            let column = entity
                .column(field)
                .ok_or_else(|| ApiError::InvalidSortField {
                    field: field.to_string(),
                    valid: entity.column_names(),
                })?;

            if field == entity.primary_key {
                saw_primary_key = true;
            }

            keys.push(SortKey { column, order });
        }

        if !saw_primary_key {
            if let Some(pk) = entity.column(entity.primary_key) {
                keys.push(SortKey {
                    column: pk,
                    order: Order::Asc,
                });
            }
        }

        Ok(Self { entity, keys })
    }

    /// Apply the ordering to a select statement.
    pub fn apply(&self, query: &mut SelectStatement) {
        for key in &self.keys {
            let expr = self.key_expr(key);
            query.order_by_expr_with_nulls(expr, key.order.clone(), NullOrdering::Last);
        }
    }

    /// Ordering expression for one key; text columns compare on a
    /// lower-cased projection so "Apple" and "apple" sort adjacently.
    fn key_expr(&self, key: &SortKey) -> SimpleExpr {
        let col = Expr::col(self.entity.col(key.column.name));
        if key.column.kind.is_text() {
            Func::lower(col).into()
        } else {
            col.into()
        }
    }

    /// Number of ordering keys, including the appended tie-break.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
