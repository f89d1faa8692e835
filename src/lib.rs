//! Quarry: a metadata-driven relational query compilation and mutation
//! batching engine.
//!
//! Declarative requests — filter trees, join requests, aggregates, group-bys
//! — compile into parameterized SQL against table metadata, execute through a
//! pluggable backend boundary, and map back into generic typed records.
//! Row-level security locks inject session-derived predicates into every
//! query, pulling additional tables into the join graph when a lock's key
//! lives elsewhere. Mutations page into batches with per-record failure
//! reporting.

#![warn(missing_docs)]

pub mod error;
pub mod exec;
pub mod model;
pub mod query;
pub mod session;
pub mod sql;

pub use error::{EngineError, Result};
pub use exec::{
    BackendConnection, ConnectionProvider, Engine, EngineConfig, InsertResult, RowSet,
    SqliteProvider, StatsSnapshot, Transaction,
};
pub use model::{
    Association, Field, FieldBehavior, FieldType, Join, JoinCardinality, LockScope, MetaInstance,
    Record, RecordSecurityLock, Table, Value,
};
pub use query::{
    Aggregate, AggregateInput, AggregateOperator, AggregateOutput, AggregateResult, BooleanOperator,
    CountInput, CountOutput, Criteria, CriteriaOperator, DeleteFailure, DeleteInput, DeleteOutput,
    GroupBy, InsertInput, InsertOutput, JoinKind, OrderBy, QueryFilter, QueryInput, QueryJoin,
    QueryOutput, RecordError, RecordErrorKind, RecordFailure, SetOperator, UpdateInput,
    UpdateOutput,
};
pub use session::Session;
