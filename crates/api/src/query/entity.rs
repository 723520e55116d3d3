//! Static attribute registry for queryable entities.
//!
//! Every filterable/sortable attribute is declared here once, with its
//! column type, so filter and sort construction never has to reflect on
//! the database schema at request time. Unknown attribute names are
//! rejected before any SQL is built.

use sea_query::Alias;

/// Column type kinds, used to pick operator behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Integer,
    Boolean,
    Date,
    DateTime,
    /// PostgreSQL text[] column.
    TextArray,
}

impl ColumnKind {
    /// Whether values of this kind compare case-insensitively when sorting.
    pub fn is_text(self) -> bool {
        matches!(self, ColumnKind::Text)
    }

    /// Whether this is a set-valued (array) column.
    pub fn is_array(self) -> bool {
        matches!(self, ColumnKind::TextArray)
    }
}

/// A single registered column.
#[derive(Debug, Clone, Copy)]
pub struct ColumnDef {
    pub name: &'static str,
    pub kind: ColumnKind,
}

/// Registered metadata for one entity (table).
#[derive(Debug, Clone, Copy)]
pub struct EntityDef {
    pub table: &'static str,
    pub primary_key: &'static str,
    pub columns: &'static [ColumnDef],
}

impl EntityDef {
    /// Look up a column by attribute name.
    pub fn column(&self, name: &str) -> Option<&'static ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// All valid attribute names, for error messages.
    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    /// Fully qualified sea-query column reference.
    pub fn col(&self, name: &str) -> (Alias, Alias) {
        (Alias::new(self.table), Alias::new(name))
    }

    /// Table alias for FROM/JOIN clauses.
    pub fn table_alias(&self) -> Alias {
        Alias::new(self.table)
    }
}

use ColumnKind::{Boolean, Date, DateTime, Integer, Text, TextArray};

pub static PROJECT: EntityDef = EntityDef {
    table: "project",
    primary_key: "project_id",
    columns: &[
        ColumnDef { name: "project_id", kind: Text },
        ColumnDef { name: "name", kind: Text },
        ColumnDef { name: "registry", kind: Text },
        ColumnDef { name: "proponent", kind: Text },
        ColumnDef { name: "protocol", kind: TextArray },
        ColumnDef { name: "category", kind: TextArray },
        ColumnDef { name: "status", kind: Text },
        ColumnDef { name: "country", kind: Text },
        ColumnDef { name: "listed_at", kind: Date },
        ColumnDef { name: "is_compliance", kind: Boolean },
        ColumnDef { name: "retired", kind: Integer },
        ColumnDef { name: "issued", kind: Integer },
        ColumnDef { name: "project_url", kind: Text },
    ],
};

pub static CREDIT: EntityDef = EntityDef {
    table: "credit",
    primary_key: "id",
    columns: &[
        ColumnDef { name: "id", kind: Integer },
        ColumnDef { name: "project_id", kind: Text },
        ColumnDef { name: "quantity", kind: Integer },
        ColumnDef { name: "vintage", kind: Integer },
        ColumnDef { name: "transaction_date", kind: Date },
        ColumnDef { name: "transaction_type", kind: Text },
        ColumnDef { name: "retirement_account", kind: Text },
        ColumnDef { name: "retirement_beneficiary", kind: Text },
        ColumnDef { name: "retirement_beneficiary_harmonized", kind: Text },
        ColumnDef { name: "retirement_note", kind: Text },
        ColumnDef { name: "retirement_reason", kind: Text },
    ],
};

pub static CLIP: EntityDef = EntityDef {
    table: "clip",
    primary_key: "id",
    columns: &[
        ColumnDef { name: "id", kind: Integer },
        ColumnDef { name: "date", kind: DateTime },
        ColumnDef { name: "title", kind: Text },
        ColumnDef { name: "url", kind: Text },
        ColumnDef { name: "source", kind: Text },
        ColumnDef { name: "tags", kind: TextArray },
        ColumnDef { name: "notes", kind: Text },
        ColumnDef { name: "is_waybacked", kind: Boolean },
        ColumnDef { name: "type", kind: Text },
    ],
};

pub static CLIP_PROJECT: EntityDef = EntityDef {
    table: "clip_project",
    primary_key: "id",
    columns: &[
        ColumnDef { name: "id", kind: Integer },
        ColumnDef { name: "clip_id", kind: Integer },
        ColumnDef { name: "project_id", kind: Text },
    ],
};

pub static FILE: EntityDef = EntityDef {
    table: "file",
    primary_key: "id",
    columns: &[
        ColumnDef { name: "id", kind: Integer },
        ColumnDef { name: "url", kind: Text },
        ColumnDef { name: "content_hash", kind: Text },
        ColumnDef { name: "status", kind: Text },
        ColumnDef { name: "error", kind: Text },
        ColumnDef { name: "recorded_at", kind: DateTime },
        ColumnDef { name: "category", kind: Text },
    ],
};
