//! Row-level security lock metadata.

use serde::{Deserialize, Serialize};

/// Access directions restricted by a lock.
///
/// A `Write` lock must never restrict read/query actions; a `Read` or
/// `ReadAndWrite` lock restricts every query touching the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockScope {
    /// Restricts queries only.
    Read,
    /// Restricts mutations only.
    Write,
    /// Restricts both directions.
    ReadAndWrite,
}

impl LockScope {
    /// Whether query actions are restricted by this scope.
    pub fn restricts_reads(self) -> bool {
        matches!(self, LockScope::Read | LockScope::ReadAndWrite)
    }

    /// Whether insert/update/delete actions are restricted by this scope.
    pub fn restricts_writes(self) -> bool {
        matches!(self, LockScope::Write | LockScope::ReadAndWrite)
    }
}

/// A row-level access predicate tied to a named security key type.
///
/// The key field may live on the table itself or on a table reached through
/// `join_name_chain`; in the latter case the injector silently extends the
/// join graph so the predicate can be evaluated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordSecurityLock {
    /// Security key type resolved against the caller's session.
    pub security_key_type: String,
    /// Field carrying the key value.
    pub field_name: String,
    /// Joins to traverse from the locked table to the table holding the field.
    pub join_name_chain: Vec<String>,
    /// Access directions restricted by the lock.
    pub scope: LockScope,
}

impl RecordSecurityLock {
    /// Creates a lock scoped to both reads and writes, keyed on a field of
    /// the locked table itself.
    pub fn new(security_key_type: impl Into<String>, field_name: impl Into<String>) -> Self {
        Self {
            security_key_type: security_key_type.into(),
            field_name: field_name.into(),
            join_name_chain: Vec::new(),
            scope: LockScope::ReadAndWrite,
        }
    }

    /// Overrides the lock scope.
    pub fn with_scope(mut self, scope: LockScope) -> Self {
        self.scope = scope;
        self
    }

    /// Routes the key field through a chain of named joins.
    pub fn with_join_name_chain<I, S>(mut self, chain: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.join_name_chain = chain.into_iter().map(Into::into).collect();
        self
    }

    /// Whether the key field lives on the locked table itself.
    pub fn is_on_table(&self) -> bool {
        self.join_name_chain.is_empty()
    }
}
