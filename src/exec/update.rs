//! Batch update engine: column-set grouping with shared-value statement
//! merging.

use std::collections::BTreeMap;

use time::OffsetDateTime;
use tracing::debug;

use crate::error::Result;
use crate::exec::backend::BackendConnection;
use crate::exec::config::EngineConfig;
use crate::exec::insert::{stamp_behaviors, validate_record_fields};
use crate::exec::stats::QueryStats;
use crate::model::{MetaInstance, Record, Table, Value};
use crate::query::inputs::{
    RecordError, RecordErrorKind, RecordFailure, RecordResult, UpdateInput, UpdateOutput,
};
use crate::session::Session;
use crate::sql::dialect::Dialect;

pub(crate) fn update(
    meta: &MetaInstance,
    dialect: &dyn Dialect,
    session: &Session,
    config: &EngineConfig,
    conn: &mut dyn BackendConnection,
    stats: &QueryStats,
    input: UpdateInput,
) -> Result<UpdateOutput> {
    let table = meta.table(&input.table_name)?;
    let pk_name = table.primary_key_field.clone();
    let now = OffsetDateTime::now_utc();

    let mut records = input.records;
    let mut errors: Vec<Option<RecordError>> = vec![None; records.len()];

    for (i, record) in records.iter_mut().enumerate() {
        if let Some(error) = validate_record_fields(table, record) {
            errors[i] = Some(error);
            continue;
        }
        if record.non_null_value(&pk_name).is_none() {
            errors[i] = Some(RecordError::new(
                RecordErrorKind::Invalid,
                format!("record carries no value for primary key '{pk_name}'"),
            ));
            continue;
        }
        if let Some(error) = validate_update_locks(table, session, record) {
            errors[i] = Some(error);
            continue;
        }
        stamp_behaviors(table, record, now, false);
    }

    let updatable: Vec<usize> = (0..records.len()).filter(|i| errors[*i].is_none()).collect();
    debug!(
        table = %input.table_name,
        records = records.len(),
        updatable = updatable.len(),
        "updating records"
    );

    for page in updatable.chunks(config.mutation_page_size) {
        // Group by the set of non-key columns being changed.
        let mut groups: BTreeMap<Vec<String>, Vec<usize>> = BTreeMap::new();
        for &i in page {
            let signature: Vec<String> = records[i]
                .values
                .keys()
                .filter(|name| *name != &pk_name)
                .cloned()
                .collect();
            if signature.is_empty() {
                // A key and nothing else changes nothing.
                continue;
            }
            groups.entry(signature).or_default().push(i);
        }

        for (signature, mut indices) in groups {
            // Records with identical literal values share one statement.
            indices.sort_by(|&a, &b| {
                compare_signature_values(&records[a], &records[b], &signature)
            });
            let mut buckets: Vec<Vec<usize>> = Vec::new();
            for &i in &indices {
                match buckets.last_mut() {
                    Some(bucket)
                        if compare_signature_values(
                            &records[bucket[0]],
                            &records[i],
                            &signature,
                        )
                        .is_eq() =>
                    {
                        bucket.push(i);
                    }
                    _ => buckets.push(vec![i]),
                }
            }

            let mut singles: Vec<usize> = Vec::new();
            for bucket in buckets {
                if bucket.len() > 1 {
                    run_shared_value_update(
                        dialect, conn, stats, table, &signature, &pk_name, &bucket, &records,
                        &mut errors,
                    )?;
                } else {
                    singles.push(bucket[0]);
                }
            }
            if !singles.is_empty() {
                run_batched_update(
                    dialect, conn, stats, table, &signature, &pk_name, &singles, &records,
                    &mut errors,
                )?;
            }
        }
    }

    let records: Vec<RecordResult> = records
        .into_iter()
        .zip(errors)
        .map(|(record, error)| match error {
            None => Ok(record),
            Some(error) => Err(RecordFailure { record, error }),
        })
        .collect();
    Ok(UpdateOutput { records })
}

// UPDATE t SET c = ?, … WHERE pk IN (…): one statement for a whole bucket of
// records changing the same columns to the same values.
#[allow(clippy::too_many_arguments)]
fn run_shared_value_update(
    dialect: &dyn Dialect,
    conn: &mut dyn BackendConnection,
    stats: &QueryStats,
    table: &Table,
    signature: &[String],
    pk_name: &str,
    bucket: &[usize],
    records: &[Record],
    errors: &mut [Option<RecordError>],
) -> Result<()> {
    let (sql, set_params) = build_set_clause(dialect, table, signature, &records[bucket[0]])?;
    let pk_field = table.primary_key()?;
    let placeholders = vec![dialect.placeholder(); bucket.len()].join(", ");
    let sql = format!(
        "{sql} WHERE {} IN ({placeholders})",
        dialect.quote_identifier(pk_field.column())
    );
    let mut params = set_params;
    for &i in bucket {
        params.push(records[i].values[pk_name].clone());
    }

    match conn.execute(&sql, &params) {
        Ok(_) => {
            stats.record_batch();
            Ok(())
        }
        Err(error) if error.is_constraint() => {
            stats.record_batch();
            retry_rows(dialect, conn, stats, table, signature, pk_name, bucket, records, errors)
        }
        Err(error) => Err(error),
    }
}

// UPDATE t SET c = ? WHERE pk = ?, executed once per record through the
// batch path for records whose literal values differ.
#[allow(clippy::too_many_arguments)]
fn run_batched_update(
    dialect: &dyn Dialect,
    conn: &mut dyn BackendConnection,
    stats: &QueryStats,
    table: &Table,
    signature: &[String],
    pk_name: &str,
    indices: &[usize],
    records: &[Record],
    errors: &mut [Option<RecordError>],
) -> Result<()> {
    let (set_sql, _) = build_set_clause(dialect, table, signature, &records[indices[0]])?;
    let pk_field = table.primary_key()?;
    let sql = format!(
        "{set_sql} WHERE {} = {}",
        dialect.quote_identifier(pk_field.column()),
        dialect.placeholder()
    );

    let param_rows: Vec<Vec<Value>> = indices
        .iter()
        .map(|&i| {
            let mut row: Vec<Value> = signature
                .iter()
                .map(|name| records[i].values[name].clone())
                .collect();
            row.push(records[i].values[pk_name].clone());
            row
        })
        .collect();

    match conn.execute_batch(&sql, &param_rows) {
        Ok(_) => {
            stats.record_batch();
            Ok(())
        }
        Err(error) if error.is_constraint() => {
            stats.record_batch();
            retry_rows(dialect, conn, stats, table, signature, pk_name, indices, records, errors)
        }
        Err(error) => Err(error),
    }
}

// Row-at-a-time fallback after a constraint failure somewhere in a shared
// statement; each failing record keeps its own error.
#[allow(clippy::too_many_arguments)]
fn retry_rows(
    dialect: &dyn Dialect,
    conn: &mut dyn BackendConnection,
    stats: &QueryStats,
    table: &Table,
    signature: &[String],
    pk_name: &str,
    indices: &[usize],
    records: &[Record],
    errors: &mut [Option<RecordError>],
) -> Result<()> {
    let pk_field = table.primary_key()?;
    for &i in indices {
        let (set_sql, mut params) = build_set_clause(dialect, table, signature, &records[i])?;
        let sql = format!(
            "{set_sql} WHERE {} = {}",
            dialect.quote_identifier(pk_field.column()),
            dialect.placeholder()
        );
        params.push(records[i].values[pk_name].clone());
        match conn.execute(&sql, &params) {
            Ok(_) => stats.record_batch(),
            Err(error) if error.is_constraint() => {
                stats.record_batch();
                errors[i] = Some(RecordError::new(
                    RecordErrorKind::Constraint,
                    error.to_string(),
                ));
            }
            Err(error) => return Err(error),
        }
    }
    Ok(())
}

fn build_set_clause(
    dialect: &dyn Dialect,
    table: &Table,
    signature: &[String],
    record: &Record,
) -> Result<(String, Vec<Value>)> {
    let mut assignments = Vec::with_capacity(signature.len());
    let mut params = Vec::with_capacity(signature.len());
    for name in signature {
        let field = table.field(name)?;
        assignments.push(format!(
            "{} = {}",
            dialect.quote_identifier(field.column()),
            dialect.placeholder()
        ));
        params.push(record.values[name].clone());
    }
    Ok((
        format!(
            "UPDATE {} SET {}",
            dialect.quote_identifier(table.backend_name()),
            assignments.join(", ")
        ),
        params,
    ))
}

fn compare_signature_values(
    a: &Record,
    b: &Record,
    signature: &[String],
) -> std::cmp::Ordering {
    for name in signature {
        let ordering = a.values[name].cmp_for_grouping(&b.values[name]);
        if !ordering.is_eq() {
            return ordering;
        }
    }
    std::cmp::Ordering::Equal
}

// Updates only validate the lock values they are about to write; a record
// that leaves the key field untouched passes (the row's stored value was
// validated when it was written).
fn validate_update_locks(
    table: &Table,
    session: &Session,
    record: &Record,
) -> Option<RecordError> {
    for lock in table.write_locks() {
        if !lock.is_on_table() || session.has_all_access(&lock.security_key_type) {
            continue;
        }
        if !record.values.contains_key(&lock.field_name) {
            continue;
        }
        let allowed = record
            .non_null_value(&lock.field_name)
            .map(|value| session.allows_value(&lock.security_key_type, value))
            .unwrap_or(false);
        if !allowed {
            return Some(RecordError::new(
                RecordErrorKind::AccessDenied,
                format!(
                    "value of '{}' is not allowed by the '{}' security key",
                    lock.field_name, lock.security_key_type
                ),
            ));
        }
    }
    None
}
