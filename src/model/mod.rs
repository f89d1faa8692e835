//! Read-only metadata model consumed by the compiler and executor.
//!
//! A [`MetaInstance`] is loaded once and treated as immutable for the life of
//! every request: tables with their fields, security locks and associations,
//! plus the undirected join graph connecting them.

/// Table, field and association metadata.
pub mod table;

/// Join metadata forming the undirected table graph.
pub mod join;

/// Row-level security lock metadata.
pub mod security;

/// Generic typed records mapped from result sets.
pub mod record;

/// Dynamically typed field values.
pub mod value;

/// The metadata registry handed to the engine.
pub mod instance;

pub use instance::MetaInstance;
pub use join::{Join, JoinCardinality, JoinOn};
pub use record::Record;
pub use security::{LockScope, RecordSecurityLock};
pub use table::{Association, Field, FieldBehavior, FieldType, Table};
pub use value::Value;
