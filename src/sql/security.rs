//! Injects row-security predicates derived from the caller's session.

use crate::error::Result;
use crate::model::{MetaInstance, Record, RecordSecurityLock, Table};
use crate::query::criteria::{Criteria, CriteriaOperator};
use crate::query::inputs::{RecordError, RecordErrorKind};
use crate::session::Session;
use crate::sql::join_graph::JoinGraph;

/// Builds the lock criteria for every table present in the query.
///
/// Runs as a worklist so tables pulled in purely to reach a lock's key field
/// get their own locks evaluated too. Each returned criteria is an `IN` test
/// qualified with the alias of the table holding the key field; a session
/// with no values for a key type yields an empty `IN` list, which compiles to
/// an unsatisfiable predicate — "no access" is a valid empty result, never an
/// error. All-access sentinels contribute nothing.
pub(crate) fn build_security_criteria(
    meta: &MetaInstance,
    session: &Session,
    graph: &mut JoinGraph,
) -> Result<Vec<Criteria>> {
    let mut out = Vec::new();
    let mut idx = 0;
    while idx < graph.alias_table_pairs().len() {
        let (alias, table_name) = graph.alias_table_pairs()[idx].clone();
        idx += 1;
        let table = meta.table(&table_name)?;
        for lock in table.read_locks() {
            if let Some(criteria) = lock_criteria(meta, session, graph, &alias, lock)? {
                out.push(criteria);
            }
        }
    }
    Ok(out)
}

fn lock_criteria(
    meta: &MetaInstance,
    session: &Session,
    graph: &mut JoinGraph,
    table_alias: &str,
    lock: &RecordSecurityLock,
) -> Result<Option<Criteria>> {
    if session.has_all_access(&lock.security_key_type) {
        return Ok(None);
    }

    let field_alias = if lock.is_on_table() {
        table_alias.to_owned()
    } else {
        graph.ensure_join_chain(meta, table_alias, &lock.join_name_chain)?
    };

    // Fail fast on misconfigured lock metadata.
    let (_, field_table) = graph
        .alias_for(&field_alias)
        .expect("chain walk registered the alias");
    meta.field(field_table, &lock.field_name)?;

    let values = session
        .security_key_values(&lock.security_key_type)
        .map(<[_]>::to_vec)
        .unwrap_or_default();

    Ok(Some(Criteria::new(
        format!("{field_alias}.{}", lock.field_name),
        CriteriaOperator::In,
        values,
    )))
}

/// Validates a record's key values against the table's write-scope locks.
///
/// Only locks whose key field lives on the table itself are checked here; an
/// absent or NULL key value is denied unless the session holds the all-access
/// sentinel for that key type.
pub(crate) fn validate_write_locks(
    table: &Table,
    session: &Session,
    record: &Record,
) -> Option<RecordError> {
    for lock in table.write_locks() {
        if !lock.is_on_table() {
            continue;
        }
        if session.has_all_access(&lock.security_key_type) {
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
