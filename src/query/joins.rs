//! Request-scoped join descriptions.

use serde::{Deserialize, Serialize};

/// SQL join type requested by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinKind {
    /// Inner join.
    #[default]
    Inner,
    /// Left outer join.
    Left,
    /// Right outer join.
    Right,
}

/// One join requested by the caller (or inferred from a qualified field).
///
/// Only `table` is required. When more than one join in the metadata connects
/// to `table`, `base_table_or_alias` names the side to join from; the
/// resolver raises an ambiguity error otherwise. `alias` defaults to the
/// table name. `select` controls whether the joined table's columns appear in
/// the output records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryJoin {
    /// Table to join in.
    pub table: String,
    /// Table name or alias to join from, when the graph is ambiguous.
    pub base_table_or_alias: Option<String>,
    /// Alias for the joined table; defaults to the table name.
    pub alias: Option<String>,
    /// Metadata join to use, bypassing graph search.
    pub join_name: Option<String>,
    /// Join type.
    pub kind: JoinKind,
    /// Whether the joined table's columns appear in the output.
    pub select: bool,
}

impl QueryJoin {
    /// Creates an inner, non-selected join to the given table.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            base_table_or_alias: None,
            alias: None,
            join_name: None,
            kind: JoinKind::Inner,
            select: false,
        }
    }

    /// Names the table or alias to join from.
    pub fn with_base_table_or_alias(mut self, base: impl Into<String>) -> Self {
        self.base_table_or_alias = Some(base.into());
        self
    }

    /// Overrides the alias.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Pins a specific metadata join by name.
    pub fn with_join_name(mut self, join_name: impl Into<String>) -> Self {
        self.join_name = Some(join_name.into());
        self
    }

    /// Sets the join type.
    pub fn with_kind(mut self, kind: JoinKind) -> Self {
        self.kind = kind;
        self
    }

    /// Includes the joined table's columns in the output records.
    pub fn select(mut self) -> Self {
        self.select = true;
        self
    }

    /// Effective alias: the explicit alias or the table name.
    pub fn effective_alias(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.table)
    }
}
