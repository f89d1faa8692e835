//! Aggregate functions and group-by columns.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{FieldType, Value};

/// Aggregate function over a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AggregateOperator {
    /// Row count over non-null values of the field.
    Count,
    /// Sum of the field.
    Sum,
    /// Average of the field.
    Avg,
    /// Minimum of the field.
    Min,
    /// Maximum of the field.
    Max,
}

/// One requested aggregate: a field and an operator.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Aggregate {
    /// Field the aggregate runs over, optionally `alias.field` qualified.
    pub field_name: String,
    /// Aggregate function.
    pub operator: AggregateOperator,
}

impl Aggregate {
    /// Creates an aggregate from parts.
    pub fn new(field_name: impl Into<String>, operator: AggregateOperator) -> Self {
        Self {
            field_name: field_name.into(),
            operator,
        }
    }

    /// `COUNT(field)`.
    pub fn count(field_name: impl Into<String>) -> Self {
        Self::new(field_name, AggregateOperator::Count)
    }

    /// `SUM(field)`.
    pub fn sum(field_name: impl Into<String>) -> Self {
        Self::new(field_name, AggregateOperator::Sum)
    }

    /// `AVG(field)`.
    pub fn avg(field_name: impl Into<String>) -> Self {
        Self::new(field_name, AggregateOperator::Avg)
    }

    /// `MIN(field)`.
    pub fn min(field_name: impl Into<String>) -> Self {
        Self::new(field_name, AggregateOperator::Min)
    }

    /// `MAX(field)`.
    pub fn max(field_name: impl Into<String>) -> Self {
        Self::new(field_name, AggregateOperator::Max)
    }
}

/// One GROUP BY column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupBy {
    /// Field to group on, optionally `alias.field` qualified.
    pub field_name: String,
    /// Declared type used when mapping the grouped value back out.
    pub field_type: Option<FieldType>,
}

impl GroupBy {
    /// Creates a group-by with no declared type override.
    pub fn new(field_name: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            field_type: None,
        }
    }

    /// Declares the mapped type of the grouped value.
    pub fn with_field_type(mut self, field_type: FieldType) -> Self {
        self.field_type = Some(field_type);
        self
    }
}

/// One row of an aggregate result.
///
/// Without group-bys exactly one result exists per call, even when no rows
/// matched (COUNT is 0, the other operators are NULL). With group-bys there
/// is one result per distinct group tuple, and zero matching rows yield zero
/// results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    /// Computed value per requested aggregate.
    pub aggregates: BTreeMap<Aggregate, Value>,
    /// Group value per group-by field name.
    pub group_bys: BTreeMap<String, Value>,
}

impl AggregateResult {
    /// Computed value for one aggregate, if it was requested.
    pub fn aggregate(&self, aggregate: &Aggregate) -> Option<&Value> {
        self.aggregates.get(aggregate)
    }

    /// Group value for one group-by field.
    pub fn group_by(&self, field_name: &str) -> Option<&Value> {
        self.group_bys.get(field_name)
    }
}
