//! Single field comparisons: one field, one operator, bound values.

use serde::{Deserialize, Serialize};

use crate::model::Value;

/// Comparison operator applied by a [`Criteria`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CriteriaOperator {
    /// `field = value` (or `field = other_field`).
    Equals,
    /// `field <> value` (or `field <> other_field`).
    NotEquals,
    /// `field IN (values…)`; an empty list is always false.
    In,
    /// `field NOT IN (values…)`; an empty list is always true.
    NotIn,
    /// Prefix match on text.
    StartsWith,
    /// Negated prefix match on text.
    NotStartsWith,
    /// Substring match on text.
    Contains,
    /// Negated substring match on text.
    NotContains,
    /// Suffix match on text.
    EndsWith,
    /// Negated suffix match on text.
    NotEndsWith,
    /// `field < value`.
    LessThan,
    /// `field <= value`.
    LessThanOrEquals,
    /// `field > value`.
    GreaterThan,
    /// `field >= value`.
    GreaterThanOrEquals,
    /// Inclusive range test; takes exactly two values.
    Between,
    /// Negated inclusive range test; takes exactly two values.
    NotBetween,
    /// NULL test; on text fields the empty string also counts as blank.
    IsBlank,
    /// Negated NULL test.
    IsNotBlank,
}

impl CriteriaOperator {
    /// Whether the operator may compare against another column instead of a
    /// bound value.
    pub fn supports_other_field(self) -> bool {
        matches!(
            self,
            CriteriaOperator::Equals
                | CriteriaOperator::NotEquals
                | CriteriaOperator::LessThan
                | CriteriaOperator::LessThanOrEquals
                | CriteriaOperator::GreaterThan
                | CriteriaOperator::GreaterThanOrEquals
        )
    }
}

/// One comparison within a filter tree.
///
/// The field name may be qualified with a table name or alias
/// (`"order_line.sku"`); unqualified names resolve against the query's main
/// table. When `other_field_name` is set the comparison is column-to-column
/// and `values` stays empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criteria {
    /// Field being tested, optionally `alias.field` qualified.
    pub field_name: String,
    /// Comparison operator.
    pub operator: CriteriaOperator,
    /// Bound values; arity depends on the operator.
    pub values: Vec<Value>,
    /// Right-hand column for column-to-column comparisons.
    pub other_field_name: Option<String>,
}

impl Criteria {
    /// Creates a criteria from raw parts.
    pub fn new(
        field_name: impl Into<String>,
        operator: CriteriaOperator,
        values: Vec<Value>,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            operator,
            values,
            other_field_name: None,
        }
    }

    /// `field = value`.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, CriteriaOperator::Equals, vec![value.into()])
    }

    /// `field <> value`.
    pub fn not_eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, CriteriaOperator::NotEquals, vec![value.into()])
    }

    /// `field IN (values…)`.
    pub fn is_in<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::new(
            field,
            CriteriaOperator::In,
            values.into_iter().map(Into::into).collect(),
        )
    }

    /// `field NOT IN (values…)`.
    pub fn not_in<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::new(
            field,
            CriteriaOperator::NotIn,
            values.into_iter().map(Into::into).collect(),
        )
    }

    /// Prefix match.
    pub fn starts_with(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, CriteriaOperator::StartsWith, vec![value.into()])
    }

    /// Substring match.
    pub fn contains(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, CriteriaOperator::Contains, vec![value.into()])
    }

    /// Suffix match.
    pub fn ends_with(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, CriteriaOperator::EndsWith, vec![value.into()])
    }

    /// `field < value`.
    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, CriteriaOperator::LessThan, vec![value.into()])
    }

    /// `field <= value`.
    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, CriteriaOperator::LessThanOrEquals, vec![value.into()])
    }

    /// `field > value`.
    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, CriteriaOperator::GreaterThan, vec![value.into()])
    }

    /// `field >= value`.
    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(
            field,
            CriteriaOperator::GreaterThanOrEquals,
            vec![value.into()],
        )
    }

    /// `field BETWEEN low AND high`.
    pub fn between(
        field: impl Into<String>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Self {
        Self::new(
            field,
            CriteriaOperator::Between,
            vec![low.into(), high.into()],
        )
    }

    /// `field NOT BETWEEN low AND high`.
    pub fn not_between(
        field: impl Into<String>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Self {
        Self::new(
            field,
            CriteriaOperator::NotBetween,
            vec![low.into(), high.into()],
        )
    }

    /// NULL (or empty string, for text) test.
    pub fn is_blank(field: impl Into<String>) -> Self {
        Self::new(field, CriteriaOperator::IsBlank, Vec::new())
    }

    /// Negated NULL test.
    pub fn is_not_blank(field: impl Into<String>) -> Self {
        Self::new(field, CriteriaOperator::IsNotBlank, Vec::new())
    }

    /// Column-to-column comparison: `field <op> other_field`.
    pub fn vs_field(
        field: impl Into<String>,
        operator: CriteriaOperator,
        other_field: impl Into<String>,
    ) -> Self {
        Self {
            field_name: field.into(),
            operator,
            values: Vec::new(),
            other_field_name: Some(other_field.into()),
        }
    }
}
