//! Nested boolean filter trees, set operations and ordering.

use serde::{Deserialize, Serialize};

use crate::query::aggregate::Aggregate;
use crate::query::criteria::Criteria;

/// Boolean connective joining the members of one filter level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BooleanOperator {
    /// All members must match.
    #[default]
    And,
    /// Any member may match.
    Or,
}

/// Set operation combining sub-filters as independent queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SetOperator {
    /// Distinct union of the arms.
    Union,
    /// Union keeping duplicates.
    UnionAll,
    /// Rows present in every arm.
    Intersect,
    /// Rows of the first arm absent from the later arms.
    Except,
}

/// One ORDER BY entry: either a field or an aggregate.
///
/// An aggregate order-by may reference an aggregate that was not requested in
/// the select list; the builder adds it internally and strips it from the
/// mapped result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBy {
    /// Field to order by, optionally `alias.field` qualified.
    pub field_name: Option<String>,
    /// Aggregate to order by, for aggregate queries.
    pub aggregate: Option<Aggregate>,
    /// Ascending when true.
    pub ascending: bool,
}

impl OrderBy {
    /// Ascending order on a field.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field_name: Some(field.into()),
            aggregate: None,
            ascending: true,
        }
    }

    /// Descending order on a field.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field_name: Some(field.into()),
            aggregate: None,
            ascending: false,
        }
    }

    /// Order on an aggregate value.
    pub fn aggregate(aggregate: Aggregate, ascending: bool) -> Self {
        Self {
            field_name: None,
            aggregate: Some(aggregate),
            ascending,
        }
    }
}

/// A nested boolean filter tree.
///
/// Criteria and sub-filters at one level are joined by `boolean_operator`
/// (AND when omitted); sub-filters recurse with parentheses so precedence is
/// preserved. When `sub_filter_set_operator` is set the sub-filters instead
/// compile as independent queries combined with the set operation, and only
/// the top-level `order_bys` apply, after the combination.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryFilter {
    /// Connective for this level.
    pub boolean_operator: BooleanOperator,
    /// Comparisons at this level.
    pub criteria: Vec<Criteria>,
    /// Nested sub-filters.
    pub sub_filters: Vec<QueryFilter>,
    /// Set operation applied over `sub_filters`, when present.
    pub sub_filter_set_operator: Option<SetOperator>,
    /// Ordering applied to the final result.
    pub order_bys: Vec<OrderBy>,
    /// Maximum number of rows to return.
    pub limit: Option<u64>,
    /// Number of rows to skip before returning.
    pub skip: Option<u64>,
}

impl QueryFilter {
    /// Creates an empty AND filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty OR filter.
    pub fn any() -> Self {
        Self {
            boolean_operator: BooleanOperator::Or,
            ..Self::default()
        }
    }

    /// Appends a criteria, builder style.
    pub fn with_criteria(mut self, criteria: Criteria) -> Self {
        self.criteria.push(criteria);
        self
    }

    /// Appends a nested sub-filter, builder style.
    pub fn with_sub_filter(mut self, filter: QueryFilter) -> Self {
        self.sub_filters.push(filter);
        self
    }

    /// Declares the sub-filters as set-operation arms.
    pub fn with_set_operator(mut self, op: SetOperator) -> Self {
        self.sub_filter_set_operator = Some(op);
        self
    }

    /// Appends an order-by entry, builder style.
    pub fn with_order_by(mut self, order_by: OrderBy) -> Self {
        self.order_bys.push(order_by);
        self
    }

    /// Sets the row limit.
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the number of rows to skip.
    pub fn with_skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Whether this filter, or any nested one, carries a criteria.
    pub fn has_any_criteria(&self) -> bool {
        !self.criteria.is_empty() || self.sub_filters.iter().any(QueryFilter::has_any_criteria)
    }
}
