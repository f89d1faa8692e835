//! Generic typed records mapped from result sets and fed to mutations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::value::Value;

/// A generic typed record.
///
/// Values are keyed by logical field name; fields from joined tables use
/// `alias.field` keys. Association entries carry nested child records the
/// insert engine walks depth-first, so the structure is a strict tree, never
/// a graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Field values keyed by logical field name.
    pub values: BTreeMap<String, Value>,
    /// Nested child records keyed by association name.
    pub associations: BTreeMap<String, Vec<Record>>,
}

impl Record {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field value, builder style.
    pub fn with_value(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(field.into(), value.into());
        self
    }

    /// Attaches child records under an association name, builder style.
    pub fn with_associated_records(
        mut self,
        association: impl Into<String>,
        records: Vec<Record>,
    ) -> Self {
        self.associations.insert(association.into(), records);
        self
    }

    /// Sets a field value in place.
    pub fn set_value(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(field.into(), value.into());
    }

    /// Returns the value for a field, if set.
    pub fn value(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Returns the value for a field, treating an explicit NULL as absent.
    pub fn non_null_value(&self, field: &str) -> Option<&Value> {
        self.values.get(field).filter(|v| !v.is_null())
    }

    /// Integer content of a field, when present.
    pub fn value_int(&self, field: &str) -> Option<i64> {
        self.value(field).and_then(Value::as_int)
    }

    /// Text content of a field, when present.
    pub fn value_text(&self, field: &str) -> Option<&str> {
        self.value(field).and_then(Value::as_text)
    }
}
