//! Batch delete engine: paged IN-list deletes with per-row constraint
//! fallback and retry probes.

use std::collections::HashSet;

use tracing::debug;

use crate::error::Result;
use crate::exec::backend::BackendConnection;
use crate::exec::config::EngineConfig;
use crate::exec::stats::QueryStats;
use crate::model::{MetaInstance, RecordSecurityLock, Value};
use crate::query::inputs::{DeleteFailure, DeleteInput, DeleteOutput, RecordError, RecordErrorKind};
use crate::session::Session;
use crate::sql::dialect::Dialect;

pub(crate) fn delete(
    meta: &MetaInstance,
    dialect: &dyn Dialect,
    session: &Session,
    config: &EngineConfig,
    conn: &mut dyn BackendConnection,
    stats: &QueryStats,
    input: DeleteInput,
) -> Result<DeleteOutput> {
    let table = meta.table(&input.table_name)?;
    let pk_field = table.primary_key()?;
    let table_sql = dialect.quote_identifier(table.backend_name());
    let pk_sql = dialect.quote_identifier(pk_field.column());

    let mut output = DeleteOutput::default();
    let mut keys = input.primary_keys;

    // Write-scope locks gate deletes on the stored key values, which takes
    // one pre-check query per page.
    let locks: Vec<&RecordSecurityLock> = table
        .write_locks()
        .filter(|lock| lock.is_on_table() && !session.has_all_access(&lock.security_key_type))
        .collect();
    if !locks.is_empty() {
        let mut denied: HashSet<usize> = HashSet::new();
        for (page_idx, page) in keys.chunks(config.mutation_page_size).enumerate() {
            let lock_columns: Vec<String> = locks
                .iter()
                .map(|lock| {
                    table
                        .field(&lock.field_name)
                        .map(|f| dialect.quote_identifier(f.column()))
                })
                .collect::<Result<_>>()?;
            let placeholders = vec![dialect.placeholder(); page.len()].join(", ");
            let sql = format!(
                "SELECT {pk_sql}, {} FROM {table_sql} WHERE {pk_sql} IN ({placeholders})",
                lock_columns.join(", ")
            );
            let rows = conn.query(&sql, page)?;
            stats.record_query();
            for row in rows.rows {
                let Some(pk_value) = row.first() else {
                    continue;
                };
                let pk_value = pk_value.clone().coerce(pk_field.field_type);
                for (lock_idx, lock) in locks.iter().enumerate() {
                    let stored = row.get(lock_idx + 1).cloned().unwrap_or(Value::Null);
                    if !session.allows_value(&lock.security_key_type, &stored) {
                        if let Some(offset) =
                            page.iter().position(|key| key == &pk_value)
                        {
                            denied.insert(page_idx * config.mutation_page_size + offset);
                        }
                        break;
                    }
                }
            }
        }
        let mut kept = Vec::with_capacity(keys.len());
        for (i, key) in keys.into_iter().enumerate() {
            if denied.contains(&i) {
                output.failures.push(DeleteFailure {
                    primary_key: key,
                    error: RecordError::new(
                        RecordErrorKind::AccessDenied,
                        "row is not accessible under the caller's security keys",
                    ),
                });
            } else {
                kept.push(key);
            }
        }
        keys = kept;
    }

    debug!(table = %input.table_name, keys = keys.len(), "deleting records");

    for page in keys.chunks(config.mutation_page_size) {
        let placeholders = vec![dialect.placeholder(); page.len()].join(", ");
        let sql = format!("DELETE FROM {table_sql} WHERE {pk_sql} IN ({placeholders})");
        match conn.execute(&sql, page) {
            Ok(deleted) => {
                stats.record_batch();
                output.deleted_count += deleted;
            }
            Err(error) if error.is_constraint() => {
                stats.record_batch();
                // Retry row by row; blocked rows become per-record failures
                // while the rest of the page still deletes.
                let single_sql =
                    format!("DELETE FROM {table_sql} WHERE {pk_sql} = {}", dialect.placeholder());
                for key in page {
                    match conn.execute(&single_sql, std::slice::from_ref(key)) {
                        Ok(deleted) => {
                            stats.record_batch();
                            // Zero affected rows means the key was already
                            // absent: a no-op, not an error.
                            output.deleted_count += deleted;
                        }
                        Err(error) if error.is_constraint() => {
                            stats.record_batch();
                            // One probe confirms the row really is still
                            // there, bounding extra queries to one per
                            // blocked row.
                            let probe_sql = format!(
                                "SELECT {pk_sql} FROM {table_sql} WHERE {pk_sql} = {}",
                                dialect.placeholder()
                            );
                            let probe = conn.query(&probe_sql, std::slice::from_ref(key))?;
                            stats.record_query();
                            if !probe.rows.is_empty() {
                                output.failures.push(DeleteFailure {
                                    primary_key: key.clone(),
                                    error: RecordError::new(
                                        RecordErrorKind::Constraint,
                                        error.to_string(),
                                    ),
                                });
                            }
                        }
                        Err(error) => return Err(error),
                    }
                }
            }
            Err(error) => return Err(error),
        }
    }

    Ok(output)
}
