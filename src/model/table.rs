//! Table, field and association metadata.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::model::security::RecordSecurityLock;

/// Declared type of a field, used for blank-test semantics and result mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    /// Signed 64-bit integer column.
    Int,
    /// 64-bit floating point column.
    Float,
    /// Text column.
    Text,
    /// Boolean column.
    Bool,
    /// Binary column.
    Bytes,
    /// Timestamp column.
    Timestamp,
}

/// Automatic value behavior applied by the mutation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldBehavior {
    /// Stamped with the current time when a record is inserted.
    CreateDate,
    /// Stamped with the current time when a record is inserted or updated.
    ModifyDate,
}

/// A single field on a table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    /// Logical field name used in filters, records and order-bys.
    pub name: String,
    /// Declared type.
    pub field_type: FieldType,
    /// Backend column name; defaults to the logical name when absent.
    pub column_name: Option<String>,
    /// Optional automatic value behavior.
    pub behavior: Option<FieldBehavior>,
}

impl Field {
    /// Creates a field whose column name matches its logical name.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            column_name: None,
            behavior: None,
        }
    }

    /// Overrides the backend column name.
    pub fn with_column_name(mut self, column: impl Into<String>) -> Self {
        self.column_name = Some(column.into());
        self
    }

    /// Attaches an automatic value behavior.
    pub fn with_behavior(mut self, behavior: FieldBehavior) -> Self {
        self.behavior = Some(behavior);
        self
    }

    /// Backend column name for this field.
    pub fn column(&self) -> &str {
        self.column_name.as_deref().unwrap_or(&self.name)
    }
}

/// A named set of child records reachable from a parent table.
///
/// The referenced join supplies the parent/child field pairs the insert
/// engine uses to propagate generated keys down the tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Association {
    /// Name under which child records ride on the parent record.
    pub name: String,
    /// Table the child records belong to.
    pub associated_table: String,
    /// Join connecting parent and child tables.
    pub join_name: String,
}

/// Immutable table metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    /// Logical table name.
    pub name: String,
    /// Backend table name; defaults to the logical name when absent.
    pub table_name: Option<String>,
    /// Name of the primary key field.
    pub primary_key_field: String,
    /// Ordered field list.
    pub fields: Vec<Field>,
    /// Row-level security locks applying to this table.
    pub security_locks: Vec<RecordSecurityLock>,
    /// Nested child record sets for the insert engine.
    pub associations: Vec<Association>,
}

impl Table {
    /// Creates a table with the given name and primary key field name.
    pub fn new(name: impl Into<String>, primary_key_field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table_name: None,
            primary_key_field: primary_key_field.into(),
            fields: Vec::new(),
            security_locks: Vec::new(),
            associations: Vec::new(),
        }
    }

    /// Overrides the backend table name.
    pub fn with_table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = Some(table_name.into());
        self
    }

    /// Appends a field.
    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Appends a security lock.
    pub fn with_security_lock(mut self, lock: RecordSecurityLock) -> Self {
        self.security_locks.push(lock);
        self
    }

    /// Appends an association.
    pub fn with_association(mut self, association: Association) -> Self {
        self.associations.push(association);
        self
    }

    /// Backend table name.
    pub fn backend_name(&self) -> &str {
        self.table_name.as_deref().unwrap_or(&self.name)
    }

    /// Looks up a field by logical name.
    pub fn field(&self, name: &str) -> Result<&Field> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| EngineError::UnknownField {
                table: self.name.clone(),
                field: name.to_owned(),
            })
    }

    /// The primary key field.
    pub fn primary_key(&self) -> Result<&Field> {
        self.field(&self.primary_key_field)
    }

    /// Looks up an association by name.
    pub fn association(&self, name: &str) -> Option<&Association> {
        self.associations.iter().find(|a| a.name == name)
    }

    /// Security locks that restrict the given access direction.
    pub fn read_locks(&self) -> impl Iterator<Item = &RecordSecurityLock> {
        self.security_locks.iter().filter(|l| l.scope.restricts_reads())
    }

    /// Security locks evaluated on the mutation path.
    pub fn write_locks(&self) -> impl Iterator<Item = &RecordSecurityLock> {
        self.security_locks
            .iter()
            .filter(|l| l.scope.restricts_writes())
    }
}
