//! Join metadata forming the undirected table graph.

use serde::{Deserialize, Serialize};

/// Cardinality of a join as declared in metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinCardinality {
    /// At most one right-table row per left-table row.
    OneToOne,
    /// Any number of right-table rows per left-table row.
    OneToMany,
}

/// One equality pair in a join's ON condition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinOn {
    /// Field on the join's left table.
    pub left_field: String,
    /// Field on the join's right table.
    pub right_field: String,
}

/// A join relationship between two tables.
///
/// Joins are undirected: the resolver may traverse them from either side
/// ("flipping"), and the ON-clause generator keeps the literal condition
/// correct regardless of direction. `exposed` joins may be used implicitly,
/// without the caller naming them, including as hops of a multi-table chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Join {
    /// Unique join name.
    pub name: String,
    /// Left table.
    pub left_table: String,
    /// Right table.
    pub right_table: String,
    /// Equality pairs making up the ON condition.
    pub join_ons: Vec<JoinOn>,
    /// Declared cardinality, read left-to-right.
    pub cardinality: JoinCardinality,
    /// Whether the join may be used implicitly.
    pub exposed: bool,
}

impl Join {
    /// Creates an exposed join with no field pairs yet.
    pub fn new(
        name: impl Into<String>,
        left_table: impl Into<String>,
        right_table: impl Into<String>,
        cardinality: JoinCardinality,
    ) -> Self {
        Self {
            name: name.into(),
            left_table: left_table.into(),
            right_table: right_table.into(),
            join_ons: Vec::new(),
            cardinality,
            exposed: true,
        }
    }

    /// Appends an equality pair to the ON condition.
    pub fn with_field_pair(
        mut self,
        left_field: impl Into<String>,
        right_field: impl Into<String>,
    ) -> Self {
        self.join_ons.push(JoinOn {
            left_field: left_field.into(),
            right_field: right_field.into(),
        });
        self
    }

    /// Marks the join as requiring an explicit request from the caller.
    pub fn unexposed(mut self) -> Self {
        self.exposed = false;
        self
    }

    /// Whether the join touches the given table on either side.
    pub fn touches(&self, table: &str) -> bool {
        self.left_table == table || self.right_table == table
    }

    /// The table on the opposite side from `table`, if the join touches it.
    pub fn other_side(&self, table: &str) -> Option<&str> {
        if self.left_table == table {
            Some(&self.right_table)
        } else if self.right_table == table {
            Some(&self.left_table)
        } else {
            None
        }
    }
}
