//! The metadata registry handed to the engine.

use std::collections::HashMap;

use crate::error::{EngineError, Result};
use crate::model::join::Join;
use crate::model::table::{Field, Table};

/// The set of tables and joins a single engine instance operates over.
///
/// Built once at startup and shared behind `Arc`; never mutated during a
/// request. The adjacency index over joins backs the resolver's breadth-first
/// path search.
#[derive(Debug, Default)]
pub struct MetaInstance {
    tables: HashMap<String, Table>,
    joins: Vec<Join>,
    joins_by_name: HashMap<String, usize>,
    adjacency: HashMap<String, Vec<usize>>,
}

impl MetaInstance {
    /// Creates an empty instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a table, builder style.
    pub fn with_table(mut self, table: Table) -> Self {
        self.tables.insert(table.name.clone(), table);
        self
    }

    /// Registers a join, builder style, updating the adjacency index.
    pub fn with_join(mut self, join: Join) -> Self {
        let idx = self.joins.len();
        self.joins_by_name.insert(join.name.clone(), idx);
        self.adjacency
            .entry(join.left_table.clone())
            .or_default()
            .push(idx);
        self.adjacency
            .entry(join.right_table.clone())
            .or_default()
            .push(idx);
        self.joins.push(join);
        self
    }

    /// Looks up a table by logical name.
    pub fn table(&self, name: &str) -> Result<&Table> {
        self.tables.get(name).ok_or_else(|| EngineError::UnknownTable {
            name: name.to_owned(),
        })
    }

    /// Looks up a field on a table.
    pub fn field(&self, table: &str, field: &str) -> Result<&Field> {
        self.table(table)?.field(field)
    }

    /// Looks up a join by name.
    pub fn join(&self, name: &str) -> Result<&Join> {
        self.joins_by_name
            .get(name)
            .map(|idx| &self.joins[*idx])
            .ok_or_else(|| EngineError::UnknownJoin {
                name: name.to_owned(),
            })
    }

    /// All joins touching the given table, in registration order.
    pub fn joins_touching(&self, table: &str) -> impl Iterator<Item = &Join> {
        self.adjacency
            .get(table)
            .into_iter()
            .flatten()
            .map(|idx| &self.joins[*idx])
    }

    /// All registered joins, in registration order.
    pub fn joins(&self) -> &[Join] {
        &self.joins
    }
}
