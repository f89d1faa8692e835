//! Backend boundary: everything the engine needs from a relational backend.

use std::sync::Arc;

use crate::error::Result;
use crate::model::Value;
use crate::sql::dialect::Dialect;

/// A result set streamed back from the backend.
#[derive(Debug, Clone, Default)]
pub struct RowSet {
    /// Column labels in select-list order.
    pub columns: Vec<String>,
    /// Rows of values, positionally matching `columns`.
    pub rows: Vec<Vec<Value>>,
}

/// Outcome of an INSERT statement.
#[derive(Debug, Clone, Default)]
pub struct InsertResult {
    /// Number of rows the statement inserted.
    pub rows_affected: u64,
    /// One generated key per inserted row, in insertion order.
    ///
    /// Backends must honor this contract for multi-row inserts so the
    /// mutation engine can assign keys back onto batched records.
    pub generated_keys: Vec<Value>,
}

/// One live backend connection.
///
/// A connection is exclusively owned by the transaction or auto-commit scope
/// that checked it out; it is never used concurrently from two threads.
/// Errors split two ways: constraint violations surface as
/// [`crate::EngineError::Constraint`] so the mutation engine can attach them
/// to single records, everything else is transport-level and fatal to the
/// call.
pub trait BackendConnection: Send {
    /// Runs a SELECT and materializes the result set.
    fn query(&mut self, sql: &str, params: &[Value]) -> Result<RowSet>;

    /// Runs a single mutation statement, returning affected rows.
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64>;

    /// Runs an INSERT, returning affected rows and generated keys.
    fn execute_insert(&mut self, sql: &str, params: &[Value]) -> Result<InsertResult>;

    /// Runs one statement once per parameter row, returning per-row affected
    /// counts. Aborts on the first failing row.
    fn execute_batch(&mut self, sql: &str, param_rows: &[Vec<Value>]) -> Result<Vec<u64>>;

    /// Opens a transaction on this connection.
    fn begin(&mut self) -> Result<()>;

    /// Commits the open transaction.
    fn commit(&mut self) -> Result<()>;

    /// Rolls back the open transaction.
    fn rollback(&mut self) -> Result<()>;
}

/// Hands out pooled connections and names the backend's dialect.
pub trait ConnectionProvider: Send + Sync {
    /// Checks a connection out of the pool (or opens a fresh one).
    fn connection(&self) -> Result<Box<dyn BackendConnection>>;

    /// The dialect statements for this backend are rendered in.
    fn dialect(&self) -> Arc<dyn Dialect>;
}
