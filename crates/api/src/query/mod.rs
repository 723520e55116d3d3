//! Generic filter/sort/pagination engine.
//!
//! Declarative descriptors go in; backend-independent sea-query predicates,
//! ordering plans, and paged SQL come out. Everything here is pure and
//! request-scoped: no I/O, no shared mutable state.

pub mod builder;
pub mod entity;
pub mod filter;
pub mod paginate;
pub mod params;
pub mod search;
pub mod sort;

pub use builder::ListQuery;
pub use entity::{CLIP, CLIP_PROJECT, CREDIT, ColumnKind, EntityDef, FILE, PROJECT};
pub use filter::{FilterDescriptor, FilterOp, FilterValue, build_conditions};
pub use paginate::{DEFAULT_PER_PAGE, MAX_PER_PAGE, PageParams, Paginated, Pagination};
pub use params::{QueryParams, next_page_url};
pub use search::{
    AliasLookup, DEFAULT_SIMILARITY_THRESHOLD, SearchMode, SearchSpec, StaticAliasTable,
    WeightedField, parse_search_fields, search_condition, validate_threshold,
};
pub use sort::OrderingPlan;
