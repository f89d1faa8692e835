//! Dynamically typed values carried by records, criteria and bind parameters.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::model::table::FieldType;

/// A dynamically typed value flowing between caller, compiler and backend.
///
/// Backends may widen or narrow representations (the reference backend stores
/// timestamps as RFC 3339 text); [`Value::coerce`] restores the declared field
/// type when mapping result sets back into records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// SQL NULL.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed 64-bit integer value.
    Int(i64),
    /// 64-bit floating point value.
    Float(f64),
    /// String value.
    Text(String),
    /// Binary value.
    Bytes(Vec<u8>),
    /// Point in time, carried with full offset precision.
    Timestamp(#[serde(with = "time::serde::rfc3339")] OffsetDateTime),
}

impl Value {
    /// Returns true when the value is [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Coerces a backend-supplied value into the declared field type.
    ///
    /// Lossless conversions only: integers become booleans (0/1) or floats,
    /// RFC 3339 text becomes a timestamp. Anything else passes through
    /// unchanged so the caller still sees what the backend returned.
    pub fn coerce(self, ty: FieldType) -> Value {
        match (ty, self) {
            (FieldType::Bool, Value::Int(i)) => Value::Bool(i != 0),
            (FieldType::Float, Value::Int(i)) => Value::Float(i as f64),
            (FieldType::Timestamp, Value::Text(s)) => {
                match OffsetDateTime::parse(&s, &time::format_description::well_known::Rfc3339) {
                    Ok(ts) => Value::Timestamp(ts),
                    Err(_) => Value::Text(s),
                }
            }
            (_, v) => v,
        }
    }

    /// Returns the integer content, widening booleans, when present.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    /// Returns the string content when the value is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Total ordering used for deterministic grouping of update batches.
    ///
    /// Values of different variants order by variant tag; NaN floats compare
    /// equal to each other so grouping stays stable.
    pub fn cmp_for_grouping(&self, other: &Value) -> Ordering {
        fn tag(v: &Value) -> u8 {
            match v {
                Value::Null => 0,
                Value::Bool(_) => 1,
                Value::Int(_) => 2,
                Value::Float(_) => 3,
                Value::Text(_) => 4,
                Value::Bytes(_) => 5,
                Value::Timestamp(_) => 6,
            }
        }
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Bytes(a), Value::Bytes(b)) => a.cmp(b),
            (Value::Timestamp(a), Value::Timestamp(b)) => a.cmp(b),
            (a, b) => tag(a).cmp(&tag(b)),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(v) => write!(f, "{v}"),
            Value::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            Value::Timestamp(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value)
    }
}

impl From<OffsetDateTime> for Value {
    fn from(value: OffsetDateTime) -> Self {
        Value::Timestamp(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}
