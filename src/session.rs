//! Immutable per-call session context.
//!
//! The security lock injector reads key values from a [`Session`] while
//! compiling; nothing mutates the session during a call, so it can be shared
//! freely across threads.

use std::collections::{HashMap, HashSet};

use crate::model::Value;

/// Security key values carried by the caller.
///
/// A key type may resolve three ways: an "all access" sentinel (the key
/// imposes no restriction), a list of allowed values (the lock compiles to an
/// IN predicate), or nothing at all (the lock is unsatisfiable and the query
/// returns zero rows, by design indistinguishable from "no data").
#[derive(Debug, Clone, Default)]
pub struct Session {
    security_key_values: HashMap<String, Vec<Value>>,
    all_access_keys: HashSet<String>,
}

impl Session {
    /// Creates a session with no keys at all.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one allowed value for a security key type.
    pub fn with_security_key_value(
        mut self,
        key_type: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.security_key_values
            .entry(key_type.into())
            .or_default()
            .push(value.into());
        self
    }

    /// Registers an explicitly empty value set for a security key type.
    ///
    /// Distinct from never mentioning the key only in intent; both compile to
    /// an unsatisfiable predicate.
    pub fn with_empty_security_key(mut self, key_type: impl Into<String>) -> Self {
        self.security_key_values.entry(key_type.into()).or_default();
        self
    }

    /// Grants the all-access sentinel for a security key type.
    pub fn with_all_access_key(mut self, key_type: impl Into<String>) -> Self {
        self.all_access_keys.insert(key_type.into());
        self
    }

    /// Allowed values for a key type, if the caller carries any entry for it.
    pub fn security_key_values(&self, key_type: &str) -> Option<&[Value]> {
        self.security_key_values.get(key_type).map(Vec::as_slice)
    }

    /// Whether the caller holds the all-access sentinel for a key type.
    pub fn has_all_access(&self, key_type: &str) -> bool {
        self.all_access_keys.contains(key_type)
    }

    /// Whether a specific value is allowed for a key type.
    ///
    /// Used by the mutation path to validate record key values against
    /// write-scope locks.
    pub fn allows_value(&self, key_type: &str, value: &Value) -> bool {
        if self.has_all_access(key_type) {
            return true;
        }
        self.security_key_values(key_type)
            .map(|values| values.contains(value))
            .unwrap_or(false)
    }
}
