//! Read-path execution: queries, counts and aggregates.

use tracing::debug;

use crate::error::Result;
use crate::exec::backend::BackendConnection;
use crate::exec::stats::QueryStats;
use crate::model::{MetaInstance, Record, Value};
use crate::query::aggregate::AggregateOperator;
use crate::query::inputs::{
    AggregateInput, AggregateOutput, CountInput, CountOutput, QueryInput, QueryOutput,
};
use crate::query::AggregateResult;
use crate::session::Session;
use crate::sql::dialect::Dialect;
use crate::sql::select::{compile_aggregate, compile_count, compile_query};

pub(crate) fn query(
    meta: &MetaInstance,
    dialect: &dyn Dialect,
    session: &Session,
    input: &QueryInput,
    conn: &mut dyn BackendConnection,
    stats: &QueryStats,
) -> Result<QueryOutput> {
    let compiled = compile_query(meta, dialect, session, input)?;
    debug!(
        table = %input.table_name,
        params = compiled.statement.params.len(),
        sql = %compiled.statement.sql,
        "running query"
    );
    let row_set = conn.query(&compiled.statement.sql, &compiled.statement.params)?;
    stats.record_query();

    let mut records = Vec::with_capacity(row_set.rows.len());
    for row in row_set.rows {
        let mut record = Record::new();
        for (column, value) in compiled.columns.iter().zip(row) {
            record
                .values
                .insert(column.key.clone(), value.coerce(column.field_type));
        }
        records.push(record);
    }
    debug!(rows = records.len(), "query complete");
    Ok(QueryOutput { records })
}

pub(crate) fn count(
    meta: &MetaInstance,
    dialect: &dyn Dialect,
    session: &Session,
    input: &CountInput,
    conn: &mut dyn BackendConnection,
    stats: &QueryStats,
) -> Result<CountOutput> {
    let statement = compile_count(meta, dialect, session, input)?;
    debug!(table = %input.table_name, sql = %statement.sql, "running count");
    let row_set = conn.query(&statement.sql, &statement.params)?;
    stats.record_query();

    let count = row_set
        .rows
        .first()
        .and_then(|row| row.first())
        .and_then(Value::as_int)
        .map(|n| n.max(0) as u64)
        .unwrap_or(0);
    Ok(CountOutput { count })
}

pub(crate) fn aggregate(
    meta: &MetaInstance,
    dialect: &dyn Dialect,
    session: &Session,
    input: &AggregateInput,
    conn: &mut dyn BackendConnection,
    stats: &QueryStats,
) -> Result<AggregateOutput> {
    let compiled = compile_aggregate(meta, dialect, session, input)?;
    debug!(table = %input.table_name, sql = %compiled.statement.sql, "running aggregate");
    let row_set = conn.query(&compiled.statement.sql, &compiled.statement.params)?;
    stats.record_query();

    let group_offset = compiled.aggregates.len();
    let mut results = Vec::with_capacity(row_set.rows.len());
    for row in row_set.rows {
        let mut result = AggregateResult::default();
        for (i, (aggregate, field_type)) in compiled.aggregates.iter().enumerate() {
            let raw = row.get(i).cloned().unwrap_or(Value::Null);
            // COUNT is always integral and AVG always fractional; MIN/MAX
            // and SUM echo the field's declared type back out.
            let value = match aggregate.operator {
                AggregateOperator::Count | AggregateOperator::Avg => raw,
                _ => raw.coerce(*field_type),
            };
            result.aggregates.insert(aggregate.clone(), value);
        }
        for (j, (group_by, field_type)) in compiled.group_bys.iter().enumerate() {
            let raw = row.get(group_offset + j).cloned().unwrap_or(Value::Null);
            result
                .group_bys
                .insert(group_by.field_name.clone(), raw.coerce(*field_type));
        }
        results.push(result);
    }
    Ok(AggregateOutput { results })
}
