//! Accumulates SQL text and bound parameters during compilation.

use crate::model::Value;
use crate::sql::dialect::Dialect;

/// A compiled, parameterized statement ready for the backend boundary.
#[derive(Debug, Clone, Default)]
pub struct Statement {
    /// SQL text with dialect placeholders where parameters bind.
    pub sql: String,
    /// Bound parameters in placeholder order.
    pub params: Vec<Value>,
}

impl Statement {
    /// Creates an empty statement.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends raw SQL text.
    pub fn push(&mut self, sql: &str) {
        self.sql.push_str(sql);
    }

    /// Appends one placeholder and binds its parameter.
    pub fn push_param(&mut self, dialect: &dyn Dialect, value: Value) {
        self.sql.push_str(dialect.placeholder());
        self.params.push(value);
    }

    /// Appends a comma-separated placeholder list binding every value.
    pub fn push_param_list<I>(&mut self, dialect: &dyn Dialect, values: I)
    where
        I: IntoIterator<Item = Value>,
    {
        for (i, value) in values.into_iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.push_param(dialect, value);
        }
    }

    /// Appends another statement's SQL and parameters in order.
    pub fn append(&mut self, other: Statement) {
        self.sql.push_str(&other.sql);
        self.params.extend(other.params);
    }

    /// Whether any SQL has been written yet.
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }
}
