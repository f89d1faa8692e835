//! Input and output structs for every engine operation.
//!
//! Mutation outputs never raise for per-record problems: each record lands in
//! the output as `Ok(record)` or `Err(failure)`, and only resolution or
//! transport errors abort the whole call.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{Record, Value};
use crate::query::aggregate::{Aggregate, AggregateResult, GroupBy};
use crate::query::filter::QueryFilter;
use crate::query::joins::QueryJoin;

/// Input for a record query.
#[derive(Debug, Clone, Default)]
pub struct QueryInput {
    /// Main table to query.
    pub table_name: String,
    /// Filter tree; absent means all rows.
    pub filter: Option<QueryFilter>,
    /// Explicitly requested joins.
    pub joins: Vec<QueryJoin>,
    /// Restricts the output to the named fields when present.
    pub field_names_to_include: Option<BTreeSet<String>>,
}

impl QueryInput {
    /// Creates a query over all rows of a table.
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            ..Self::default()
        }
    }

    /// Sets the filter.
    pub fn with_filter(mut self, filter: QueryFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Appends an explicit join.
    pub fn with_join(mut self, join: QueryJoin) -> Self {
        self.joins.push(join);
        self
    }

    /// Restricts the output field set.
    pub fn with_field_names_to_include<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.field_names_to_include = Some(fields.into_iter().map(Into::into).collect());
        self
    }
}

/// Output of a record query.
#[derive(Debug, Clone, Default)]
pub struct QueryOutput {
    /// Matched records in result order.
    pub records: Vec<Record>,
}

/// Input for a row count.
#[derive(Debug, Clone, Default)]
pub struct CountInput {
    /// Table to count over.
    pub table_name: String,
    /// Filter tree; absent means all rows.
    pub filter: Option<QueryFilter>,
}

impl CountInput {
    /// Creates a count over all rows of a table.
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            filter: None,
        }
    }

    /// Sets the filter.
    pub fn with_filter(mut self, filter: QueryFilter) -> Self {
        self.filter = Some(filter);
        self
    }
}

/// Output of a row count.
#[derive(Debug, Clone, Copy, Default)]
pub struct CountOutput {
    /// Number of matching rows.
    pub count: u64,
}

/// Input for an aggregate query.
#[derive(Debug, Clone, Default)]
pub struct AggregateInput {
    /// Main table to aggregate over.
    pub table_name: String,
    /// Requested aggregates.
    pub aggregates: Vec<Aggregate>,
    /// Group-by columns.
    pub group_bys: Vec<GroupBy>,
    /// Filter tree; absent means all rows.
    pub filter: Option<QueryFilter>,
    /// Explicitly requested joins.
    pub joins: Vec<QueryJoin>,
}

impl AggregateInput {
    /// Creates an aggregate query over all rows of a table.
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            ..Self::default()
        }
    }

    /// Appends a requested aggregate.
    pub fn with_aggregate(mut self, aggregate: Aggregate) -> Self {
        self.aggregates.push(aggregate);
        self
    }

    /// Appends a group-by column.
    pub fn with_group_by(mut self, group_by: GroupBy) -> Self {
        self.group_bys.push(group_by);
        self
    }

    /// Sets the filter.
    pub fn with_filter(mut self, filter: QueryFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Appends an explicit join.
    pub fn with_join(mut self, join: QueryJoin) -> Self {
        self.joins.push(join);
        self
    }
}

/// Output of an aggregate query.
#[derive(Debug, Clone, Default)]
pub struct AggregateOutput {
    /// One result per group tuple; exactly one when no group-bys were given.
    pub results: Vec<AggregateResult>,
}

/// Input for a batch insert.
#[derive(Debug, Clone, Default)]
pub struct InsertInput {
    /// Table receiving the records.
    pub table_name: String,
    /// Records to insert; associations carry nested children.
    pub records: Vec<Record>,
}

impl InsertInput {
    /// Creates an insert for the given records.
    pub fn new(table_name: impl Into<String>, records: Vec<Record>) -> Self {
        Self {
            table_name: table_name.into(),
            records,
        }
    }
}

/// Kind of a per-record failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordErrorKind {
    /// Backend constraint rejected the record.
    Constraint,
    /// A write-scope security lock rejected the record.
    AccessDenied,
    /// The record is structurally invalid (unknown field, missing key).
    Invalid,
}

/// Error attached to a single failed record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordError {
    /// Failure category.
    pub kind: RecordErrorKind,
    /// Human-readable description.
    pub message: String,
}

impl RecordError {
    /// Creates an error from parts.
    pub fn new(kind: RecordErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// A record that failed, paired with why.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordFailure {
    /// The record as it stood when it failed.
    pub record: Record,
    /// The failure.
    pub error: RecordError,
}

/// Per-record result used by insert and update outputs.
pub type RecordResult = std::result::Result<Record, RecordFailure>;

/// Output of a batch insert.
#[derive(Debug, Clone, Default)]
pub struct InsertOutput {
    /// One entry per input record, in input order.
    pub records: Vec<RecordResult>,
}

impl InsertOutput {
    /// Number of records that succeeded.
    pub fn success_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_ok()).count()
    }

    /// Iterator over the failures.
    pub fn failures(&self) -> impl Iterator<Item = &RecordFailure> {
        self.records.iter().filter_map(|r| r.as_ref().err())
    }
}

/// Input for a batch update.
#[derive(Debug, Clone, Default)]
pub struct UpdateInput {
    /// Table holding the records.
    pub table_name: String,
    /// Records to update; each must carry its primary key.
    pub records: Vec<Record>,
}

impl UpdateInput {
    /// Creates an update for the given records.
    pub fn new(table_name: impl Into<String>, records: Vec<Record>) -> Self {
        Self {
            table_name: table_name.into(),
            records,
        }
    }
}

/// Output of a batch update.
#[derive(Debug, Clone, Default)]
pub struct UpdateOutput {
    /// One entry per input record, in input order.
    pub records: Vec<RecordResult>,
}

impl UpdateOutput {
    /// Number of records that succeeded.
    pub fn success_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_ok()).count()
    }

    /// Iterator over the failures.
    pub fn failures(&self) -> impl Iterator<Item = &RecordFailure> {
        self.records.iter().filter_map(|r| r.as_ref().err())
    }
}

/// Input for a batch delete by primary key.
#[derive(Debug, Clone, Default)]
pub struct DeleteInput {
    /// Table to delete from.
    pub table_name: String,
    /// Primary keys of the rows to delete.
    pub primary_keys: Vec<Value>,
}

impl DeleteInput {
    /// Creates a delete for the given primary keys.
    pub fn new<I, V>(table_name: impl Into<String>, primary_keys: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            table_name: table_name.into(),
            primary_keys: primary_keys.into_iter().map(Into::into).collect(),
        }
    }
}

/// A primary key whose deletion failed, paired with why.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteFailure {
    /// The primary key that could not be deleted.
    pub primary_key: Value,
    /// The failure.
    pub error: RecordError,
}

/// Output of a batch delete.
///
/// A primary key absent at delete time is a no-op, not a failure; blocked
/// rows (foreign key constraints, lock rejections) land in `failures` while
/// unrelated keys in the same call still succeed.
#[derive(Debug, Clone, Default)]
pub struct DeleteOutput {
    /// Number of rows actually deleted.
    pub deleted_count: u64,
    /// Keys that could not be deleted.
    pub failures: Vec<DeleteFailure>,
}
