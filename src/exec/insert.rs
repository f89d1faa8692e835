//! Batch insert engine: paging, column-set grouping, key backfill, nested
//! association trees.

use std::collections::BTreeMap;

use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::error::{EngineError, Result};
use crate::exec::backend::BackendConnection;
use crate::exec::config::EngineConfig;
use crate::exec::stats::QueryStats;
use crate::model::{MetaInstance, Record, Table};
use crate::query::inputs::{
    InsertInput, InsertOutput, RecordError, RecordErrorKind, RecordFailure, RecordResult,
};
use crate::session::Session;
use crate::sql::dialect::Dialect;
use crate::sql::security::validate_write_locks;

pub(crate) fn insert(
    meta: &MetaInstance,
    dialect: &dyn Dialect,
    session: &Session,
    config: &EngineConfig,
    conn: &mut dyn BackendConnection,
    stats: &QueryStats,
    input: InsertInput,
) -> Result<InsertOutput> {
    let records = insert_records(
        meta,
        dialect,
        session,
        config,
        conn,
        stats,
        &input.table_name,
        input.records,
    )?;
    Ok(InsertOutput { records })
}

// Recursive worker: inserts one table's records, then walks each association
// depth-first, propagating generated keys onto child foreign-key fields.
#[allow(clippy::too_many_arguments)]
fn insert_records(
    meta: &MetaInstance,
    dialect: &dyn Dialect,
    session: &Session,
    config: &EngineConfig,
    conn: &mut dyn BackendConnection,
    stats: &QueryStats,
    table_name: &str,
    mut records: Vec<Record>,
) -> Result<Vec<RecordResult>> {
    let table = meta.table(table_name)?;
    let now = OffsetDateTime::now_utc();
    let mut errors: Vec<Option<RecordError>> = vec![None; records.len()];

    for (i, record) in records.iter_mut().enumerate() {
        if let Some(error) = validate_record_fields(table, record) {
            errors[i] = Some(error);
            continue;
        }
        if let Some(error) = validate_write_locks(table, session, record) {
            errors[i] = Some(error);
            continue;
        }
        stamp_behaviors(table, record, now, true);
    }

    let insertable: Vec<usize> = (0..records.len()).filter(|i| errors[*i].is_none()).collect();
    debug!(
        table = table_name,
        records = records.len(),
        insertable = insertable.len(),
        "inserting records"
    );

    for page in insertable.chunks(config.mutation_page_size) {
        // Records sharing a column set share one multi-row statement.
        let mut groups: BTreeMap<Vec<String>, Vec<usize>> = BTreeMap::new();
        for &i in page {
            let signature: Vec<String> = records[i].values.keys().cloned().collect();
            groups.entry(signature).or_default().push(i);
        }
        for (signature, indices) in groups {
            match insert_group(dialect, conn, stats, table, &signature, &indices, &mut records) {
                Ok(()) => {}
                Err(error) if error.is_constraint() => {
                    // One bad record must not abort its siblings: retry each
                    // row on its own and attach failures individually.
                    for &i in &indices {
                        if let Err(error) =
                            insert_group(dialect, conn, stats, table, &signature, &[i], &mut records)
                        {
                            if error.is_constraint() {
                                errors[i] = Some(RecordError::new(
                                    RecordErrorKind::Constraint,
                                    error.to_string(),
                                ));
                            } else {
                                return Err(error);
                            }
                        }
                    }
                }
                Err(error) => return Err(error),
            }
        }
    }

    insert_associations(meta, dialect, session, config, conn, stats, table, &mut records, &errors)?;

    Ok(records
        .into_iter()
        .zip(errors)
        .map(|(record, error)| match error {
            None => Ok(record),
            Some(error) => Err(RecordFailure { record, error }),
        })
        .collect())
}

fn insert_group(
    dialect: &dyn Dialect,
    conn: &mut dyn BackendConnection,
    stats: &QueryStats,
    table: &Table,
    signature: &[String],
    indices: &[usize],
    records: &mut [Record],
) -> Result<()> {
    let table_sql = dialect.quote_identifier(table.backend_name());

    let (sql, params) = if signature.is_empty() {
        (format!("INSERT INTO {table_sql} DEFAULT VALUES"), Vec::new())
    } else {
        let columns: Vec<String> = signature
            .iter()
            .map(|name| {
                table
                    .field(name)
                    .map(|f| dialect.quote_identifier(f.column()))
            })
            .collect::<Result<_>>()?;
        let row_placeholders = format!(
            "({})",
            vec![dialect.placeholder(); signature.len()].join(", ")
        );
        let rows = vec![row_placeholders; indices.len()].join(", ");
        let mut params = Vec::with_capacity(indices.len() * signature.len());
        for &i in indices {
            for name in signature {
                params.push(records[i].values[name].clone());
            }
        }
        (
            format!(
                "INSERT INTO {table_sql} ({}) VALUES {rows}",
                columns.join(", ")
            ),
            params,
        )
    };

    let result = conn.execute_insert(&sql, &params)?;
    stats.record_batch();

    // Backfill generated keys, in insertion order, onto records that did not
    // carry an explicit primary key. Grouping by column set guarantees the
    // whole group either carried one or none.
    let pk_name = &table.primary_key_field;
    if !signature.contains(pk_name) {
        for (&i, key) in indices.iter().zip(result.generated_keys) {
            let field_type = table.primary_key()?.field_type;
            records[i].set_value(pk_name.clone(), key.coerce(field_type));
        }
    }
    Ok(())
}

// Takes each association's children off their parents, stamps the foreign
// key fields from the freshly assigned parent keys, and recurses.
#[allow(clippy::too_many_arguments)]
fn insert_associations(
    meta: &MetaInstance,
    dialect: &dyn Dialect,
    session: &Session,
    config: &EngineConfig,
    conn: &mut dyn BackendConnection,
    stats: &QueryStats,
    table: &Table,
    records: &mut [Record],
    errors: &[Option<RecordError>],
) -> Result<()> {
    for association in &table.associations {
        let join = meta.join(&association.join_name)?;
        let pairs: Vec<(&str, &str)> = if join.left_table == table.name {
            join.join_ons
                .iter()
                .map(|p| (p.left_field.as_str(), p.right_field.as_str()))
                .collect()
        } else if join.right_table == table.name {
            join.join_ons
                .iter()
                .map(|p| (p.right_field.as_str(), p.left_field.as_str()))
                .collect()
        } else {
            return Err(EngineError::InvalidMetadata {
                reason: format!(
                    "association '{}' names join '{}' which does not touch table '{}'",
                    association.name, association.join_name, table.name
                ),
            });
        };

        let mut owners: Vec<(usize, usize)> = Vec::new();
        let mut children: Vec<Record> = Vec::new();
        for (i, record) in records.iter_mut().enumerate() {
            if errors[i].is_some() {
                continue;
            }
            let taken = match record.associations.get_mut(&association.name) {
                Some(kids) if !kids.is_empty() => std::mem::take(kids),
                _ => continue,
            };
            let count = taken.len();
            for mut child in taken {
                for (parent_field, child_field) in &pairs {
                    if let Some(value) = record.value(parent_field).cloned() {
                        child.set_value((*child_field).to_owned(), value);
                    }
                }
                children.push(child);
            }
            owners.push((i, count));
        }

        if children.is_empty() {
            continue;
        }

        let child_results = insert_records(
            meta,
            dialect,
            session,
            config,
            conn,
            stats,
            &association.associated_table,
            children,
        )?;

        let mut results = child_results.into_iter();
        for (parent_idx, count) in owners {
            let mut kids = Vec::with_capacity(count);
            for _ in 0..count {
                match results.next() {
                    Some(Ok(child)) => kids.push(child),
                    Some(Err(failure)) => {
                        warn!(
                            association = %association.name,
                            error = %failure.error,
                            "associated record failed to insert"
                        );
                        kids.push(failure.record);
                    }
                    None => break,
                }
            }
            records[parent_idx]
                .associations
                .insert(association.name.clone(), kids);
        }
    }
    Ok(())
}

pub(crate) fn validate_record_fields(table: &Table, record: &Record) -> Option<RecordError> {
    for name in record.values.keys() {
        if table.field(name).is_err() {
            return Some(RecordError::new(
                RecordErrorKind::Invalid,
                format!("unknown field '{}' on table '{}'", name, table.name),
            ));
        }
    }
    None
}

pub(crate) fn stamp_behaviors(
    table: &Table,
    record: &mut Record,
    now: OffsetDateTime,
    inserting: bool,
) {
    use crate::model::FieldBehavior;
    for field in &table.fields {
        match field.behavior {
            Some(FieldBehavior::CreateDate) if inserting => {
                record.set_value(field.name.clone(), now);
            }
            Some(FieldBehavior::ModifyDate) => {
                record.set_value(field.name.clone(), now);
            }
            _ => {}
        }
    }
}
