//! SQLite-backed reference connection provider.
//!
//! Backs every integration test and serves as the template for real vendor
//! providers: constraint failures map to [`EngineError::Constraint`] so the
//! mutation engine can attach them to single records, and generated keys for
//! multi-row inserts are derived from SQLite's contiguous rowid allocation
//! within one statement.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use time::format_description::well_known::Rfc3339;
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::exec::backend::{BackendConnection, ConnectionProvider, InsertResult, RowSet};
use crate::model::Value;
use crate::sql::dialect::{AnsiDialect, Dialect};

/// Pooled provider over one SQLite database file.
pub struct SqliteProvider {
    inner: Arc<PoolInner>,
    dialect: Arc<dyn Dialect>,
}

struct PoolInner {
    path: PathBuf,
    idle: Mutex<Vec<Connection>>,
    max_idle: usize,
}

impl SqliteProvider {
    /// Opens (creating if needed) the database at `path` and validates it
    /// with an eager first connection.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let inner = Arc::new(PoolInner {
            path: path.as_ref().to_owned(),
            idle: Mutex::new(Vec::new()),
            max_idle: 4,
        });
        let first = open_connection(&inner.path)?;
        inner.idle.lock().push(first);
        Ok(Self {
            inner,
            dialect: Arc::new(AnsiDialect),
        })
    }

    /// Overrides how many idle connections the pool retains.
    pub fn with_max_idle(mut self, max_idle: usize) -> Self {
        // The pool inner is not shared until the first checkout.
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.max_idle = max_idle;
        }
        self
    }
}

impl ConnectionProvider for SqliteProvider {
    fn connection(&self) -> Result<Box<dyn BackendConnection>> {
        let conn = match self.inner.idle.lock().pop() {
            Some(conn) => conn,
            None => open_connection(&self.inner.path)?,
        };
        Ok(Box::new(SqliteConnection {
            conn: Some(conn),
            pool: Arc::clone(&self.inner),
            in_tx: false,
        }))
    }

    fn dialect(&self) -> Arc<dyn Dialect> {
        Arc::clone(&self.dialect)
    }
}

fn open_connection(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path).map_err(map_sqlite_err)?;
    conn.pragma_update(None, "journal_mode", "WAL")
        .map_err(map_sqlite_err)?;
    conn.pragma_update(None, "synchronous", "NORMAL")
        .map_err(map_sqlite_err)?;
    conn.pragma_update(None, "foreign_keys", "ON")
        .map_err(map_sqlite_err)?;
    conn.busy_timeout(Duration::from_secs(5))
        .map_err(map_sqlite_err)?;
    debug!(path = %path.display(), "opened sqlite connection");
    Ok(conn)
}

struct SqliteConnection {
    conn: Option<Connection>,
    pool: Arc<PoolInner>,
    in_tx: bool,
}

impl SqliteConnection {
    fn conn(&self) -> Result<&Connection> {
        self.conn
            .as_ref()
            .ok_or_else(|| EngineError::backend("connection already closed"))
    }
}

impl BackendConnection for SqliteConnection {
    fn query(&mut self, sql: &str, params: &[Value]) -> Result<RowSet> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql).map_err(map_sqlite_err)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| (*c).to_owned()).collect();
        let mut rows = stmt
            .query(rusqlite::params_from_iter(params.iter().map(to_sql_value)))
            .map_err(map_sqlite_err)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(map_sqlite_err)? {
            let mut values = Vec::with_capacity(columns.len());
            for i in 0..columns.len() {
                values.push(from_sql_value(row.get_ref(i).map_err(map_sqlite_err)?));
            }
            out.push(values);
        }
        Ok(RowSet { columns, rows: out })
    }

    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64> {
        let conn = self.conn()?;
        let changed = conn
            .execute(sql, rusqlite::params_from_iter(params.iter().map(to_sql_value)))
            .map_err(map_sqlite_err)?;
        Ok(changed as u64)
    }

    fn execute_insert(&mut self, sql: &str, params: &[Value]) -> Result<InsertResult> {
        let conn = self.conn()?;
        let changed = conn
            .execute(sql, rusqlite::params_from_iter(params.iter().map(to_sql_value)))
            .map_err(map_sqlite_err)? as i64;
        // One multi-row INSERT allocates contiguous rowids, so the keys are
        // the run ending at last_insert_rowid.
        let generated_keys = if changed > 0 {
            let last = conn.last_insert_rowid();
            (last - changed + 1..=last).map(Value::Int).collect()
        } else {
            Vec::new()
        };
        Ok(InsertResult {
            rows_affected: changed as u64,
            generated_keys,
        })
    }

    fn execute_batch(&mut self, sql: &str, param_rows: &[Vec<Value>]) -> Result<Vec<u64>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql).map_err(map_sqlite_err)?;
        let mut counts = Vec::with_capacity(param_rows.len());
        for params in param_rows {
            let changed = stmt
                .execute(rusqlite::params_from_iter(params.iter().map(to_sql_value)))
                .map_err(map_sqlite_err)?;
            counts.push(changed as u64);
        }
        Ok(counts)
    }

    fn begin(&mut self) -> Result<()> {
        self.conn()?
            .execute_batch("BEGIN")
            .map_err(map_sqlite_err)?;
        self.in_tx = true;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.conn()?
            .execute_batch("COMMIT")
            .map_err(map_sqlite_err)?;
        self.in_tx = false;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.conn()?
            .execute_batch("ROLLBACK")
            .map_err(map_sqlite_err)?;
        self.in_tx = false;
        Ok(())
    }
}

impl Drop for SqliteConnection {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            // A connection abandoned mid-transaction is in an indeterminate
            // state; closing it lets the backend discard the work.
            if !self.in_tx {
                let mut idle = self.pool.idle.lock();
                if idle.len() < self.pool.max_idle {
                    idle.push(conn);
                }
            }
        }
    }
}

fn to_sql_value(value: &Value) -> rusqlite::types::Value {
    match value {
        Value::Null => rusqlite::types::Value::Null,
        Value::Bool(b) => rusqlite::types::Value::Integer(i64::from(*b)),
        Value::Int(i) => rusqlite::types::Value::Integer(*i),
        Value::Float(f) => rusqlite::types::Value::Real(*f),
        Value::Text(s) => rusqlite::types::Value::Text(s.clone()),
        Value::Bytes(b) => rusqlite::types::Value::Blob(b.clone()),
        Value::Timestamp(ts) => rusqlite::types::Value::Text(
            ts.format(&Rfc3339).unwrap_or_else(|_| ts.to_string()),
        ),
    }
}

fn from_sql_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(text) => Value::Text(String::from_utf8_lossy(text).into_owned()),
        ValueRef::Blob(blob) => Value::Bytes(blob.to_vec()),
    }
}

fn map_sqlite_err(err: rusqlite::Error) -> EngineError {
    match &err {
        rusqlite::Error::SqliteFailure(ffi_err, message)
            if ffi_err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            EngineError::Constraint {
                message: message
                    .clone()
                    .unwrap_or_else(|| ffi_err.to_string()),
            }
        }
        _ => EngineError::backend(err.to_string()),
    }
}
