//! Execution: the backend boundary, the engine facade and its operations.
//!
//! Operations form a closed set (query, count, aggregate, insert, update,
//! delete), each compiled by `crate::sql` and executed against a
//! [`backend::BackendConnection`]. Calls without a [`Transaction`] get an
//! independent auto-committed connection from the provider; calls sharing a
//! transaction handle share its connection and see its uncommitted writes.

/// Backend boundary traits and row set types.
pub mod backend;

/// Engine configuration.
pub mod config;

/// Execution statistics counters.
pub mod stats;

/// SQLite-backed reference connection provider.
pub mod sqlite;

/// Unit-of-work coordinator.
pub mod transaction;

/// The engine facade.
pub mod engine;

mod delete;
mod insert;
mod read;
mod update;

pub use backend::{BackendConnection, ConnectionProvider, InsertResult, RowSet};
pub use config::EngineConfig;
pub use engine::Engine;
pub use sqlite::SqliteProvider;
pub use stats::{QueryStats, StatsSnapshot};
pub use transaction::Transaction;
