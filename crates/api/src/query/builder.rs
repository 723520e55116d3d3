//! List query construction.
//!
//! Composes filter conditions, an ordering plan, and pagination into
//! renderable SQL: one paged SELECT plus one COUNT(DISTINCT pk) over the
//! same predicates and joins. The distinct count matters because joined
//! listings (credits joined to projects) can multiply rows.

use sea_query::{Cond, ExprTrait as _, JoinType, PostgresQueryBuilder, Query, SelectStatement, SimpleExpr};

use crate::error::ApiResult;
use crate::query::entity::EntityDef;
use crate::query::filter::FilterDescriptor;
use crate::query::paginate::PageParams;
use crate::query::sort::OrderingPlan;

/// A join from the base entity to a related entity.
#[derive(Debug, Clone)]
struct Join {
    target: &'static EntityDef,
    join_type: JoinType,
    local: &'static str,
    foreign: &'static str,
}

/// Builder for filtered, sorted, paginated listing queries.
pub struct ListQuery {
    entity: &'static EntityDef,
    joins: Vec<Join>,
    cond: Cond,
    ordering: Option<OrderingPlan>,
}

impl ListQuery {
    pub fn new(entity: &'static EntityDef) -> Self {
        Self {
            entity,
            joins: Vec::new(),
            cond: Cond::all(),
            ordering: None,
        }
    }

    /// LEFT JOIN `target` ON base.local = target.foreign.
    pub fn left_join(
        mut self,
        target: &'static EntityDef,
        local: &'static str,
        foreign: &'static str,
    ) -> Self {
        self.joins.push(Join {
            target,
            join_type: JoinType::LeftJoin,
            local,
            foreign,
        });
        self
    }

    /// INNER JOIN `target` ON base.local = target.foreign.
    pub fn inner_join(
        mut self,
        target: &'static EntityDef,
        local: &'static str,
        foreign: &'static str,
    ) -> Self {
        self.joins.push(Join {
            target,
            join_type: JoinType::InnerJoin,
            local,
            foreign,
        });
        self
    }

    /// AND the predicates of all descriptors into the query.
    pub fn filters(mut self, descriptors: &[FilterDescriptor]) -> ApiResult<Self> {
        for descriptor in descriptors {
            if let Some(expr) = descriptor.condition()? {
                self.cond = self.cond.add(expr);
            }
        }
        Ok(self)
    }

    /// AND a prebuilt condition (search predicates, subquery membership).
    pub fn and_where(mut self, expr: SimpleExpr) -> Self {
        self.cond = self.cond.add(expr);
        self
    }

    /// AND a condition when present.
    pub fn and_where_option(self, expr: Option<SimpleExpr>) -> Self {
        match expr {
            Some(expr) => self.and_where(expr),
            None => self,
        }
    }

    /// Set the ordering plan.
    pub fn order_by(mut self, plan: OrderingPlan) -> Self {
        self.ordering = Some(plan);
        self
    }

    fn base_statement(&self) -> SelectStatement {
        let mut query = Query::select();
        query.from(self.entity.table_alias());

        for join in &self.joins {
            let on = sea_query::Expr::col(self.entity.col(join.local))
                .equals(join.target.col(join.foreign));
            query.join(join.join_type, join.target.table_alias(), on);
        }

        query.cond_where(self.cond.clone());
        query
    }

    /// Paged SELECT of the given columns (base-table `*` when empty).
    pub fn build_page(
        &self,
        columns: &[(&'static EntityDef, &'static str)],
        page: PageParams,
    ) -> String {
        let mut query = self.select_columns(columns);

        if let Some(ordering) = &self.ordering {
            ordering.apply(&mut query);
        }

        query.limit(page.limit());
        query.offset(page.offset());
        query.to_string(PostgresQueryBuilder)
    }

    /// Unpaged SELECT of the given columns, used by chart endpoints that
    /// aggregate over the full filtered set.
    pub fn build_values(&self, columns: &[(&'static EntityDef, &'static str)]) -> String {
        self.select_columns(columns).to_string(PostgresQueryBuilder)
    }

    /// COUNT(DISTINCT pk) over the same predicates and joins, without
    /// ordering or pagination.
    pub fn build_count(&self) -> String {
        let mut query = self.base_statement();
        query.expr::<sea_query::SimpleExpr>(
            sea_query::Func::count_distinct(sea_query::Expr::col(
                self.entity.col(self.entity.primary_key),
            ))
            .into(),
        );
        query.to_string(PostgresQueryBuilder)
    }

    fn select_columns(
        &self,
        columns: &[(&'static EntityDef, &'static str)],
    ) -> SelectStatement {
        let mut query = self.base_statement();
        if columns.is_empty() {
            query.column((self.entity.table_alias(), sea_query::Asterisk));
        } else {
            for (entity, name) in columns {
                query.column(entity.col(name));
            }
        }
        query
    }
}
