//! Request-scoped value objects describing what the caller wants.
//!
//! Everything here is a plain serializable description; no SQL leaks in.
//! Field names may be qualified (`alias.field`) to reference joined tables,
//! in which case the join graph resolver pulls the named table into the
//! query, adding intermediate hops if necessary.

/// Single field comparisons.
pub mod criteria;

/// Nested boolean filter trees and ordering.
pub mod filter;

/// Request-scoped join descriptions.
pub mod joins;

/// Aggregate functions and group-by columns.
pub mod aggregate;

/// Input and output structs for every engine operation.
pub mod inputs;

pub use aggregate::{Aggregate, AggregateOperator, AggregateResult, GroupBy};
pub use criteria::{Criteria, CriteriaOperator};
pub use filter::{BooleanOperator, OrderBy, QueryFilter, SetOperator};
pub use inputs::{
    AggregateInput, AggregateOutput, CountInput, CountOutput, DeleteFailure, DeleteInput,
    DeleteOutput, InsertInput, InsertOutput, QueryInput, QueryOutput, RecordError,
    RecordErrorKind, RecordFailure, UpdateInput, UpdateOutput,
};
pub use joins::{JoinKind, QueryJoin};
