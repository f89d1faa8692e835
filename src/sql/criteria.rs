//! Compiles a single comparison into a predicate fragment plus parameters.

use crate::error::{EngineError, Result};
use crate::model::{FieldType, MetaInstance, Value};
use crate::query::criteria::{Criteria, CriteriaOperator};
use crate::sql::dialect::Dialect;
use crate::sql::join_graph::JoinGraph;
use crate::sql::statement::Statement;
use crate::sql::{column_sql, ensure_field_table, resolve_field};

/// Pulls into the graph every table a criteria references.
pub(crate) fn ensure_criteria_tables(
    meta: &MetaInstance,
    graph: &mut JoinGraph,
    criteria: &Criteria,
) -> Result<()> {
    ensure_field_table(meta, graph, &criteria.field_name)?;
    if let Some(other) = &criteria.other_field_name {
        ensure_field_table(meta, graph, other)?;
    }
    Ok(())
}

/// Appends one compiled predicate to the statement.
pub(crate) fn compile_criteria(
    meta: &MetaInstance,
    graph: &JoinGraph,
    dialect: &dyn Dialect,
    criteria: &Criteria,
    stmt: &mut Statement,
) -> Result<()> {
    let (alias, field) = resolve_field(meta, graph, &criteria.field_name)?;
    let col = column_sql(dialect, &alias, field);

    if let Some(other_name) = &criteria.other_field_name {
        return compile_column_comparison(meta, graph, dialect, criteria, &col, other_name, stmt);
    }

    match criteria.operator {
        CriteriaOperator::Equals => {
            let value = single_value(criteria)?;
            stmt.push(&format!("{col} = "));
            stmt.push_param(dialect, value);
        }
        CriteriaOperator::NotEquals => {
            let value = single_value(criteria)?;
            stmt.push(&format!("{col} <> "));
            stmt.push_param(dialect, value);
        }
        CriteriaOperator::LessThan => {
            let value = single_value(criteria)?;
            stmt.push(&format!("{col} < "));
            stmt.push_param(dialect, value);
        }
        CriteriaOperator::LessThanOrEquals => {
            let value = single_value(criteria)?;
            stmt.push(&format!("{col} <= "));
            stmt.push_param(dialect, value);
        }
        CriteriaOperator::GreaterThan => {
            let value = single_value(criteria)?;
            stmt.push(&format!("{col} > "));
            stmt.push_param(dialect, value);
        }
        CriteriaOperator::GreaterThanOrEquals => {
            let value = single_value(criteria)?;
            stmt.push(&format!("{col} >= "));
            stmt.push_param(dialect, value);
        }
        CriteriaOperator::In => {
            if criteria.values.is_empty() {
                // Empty membership is always false, by contract.
                stmt.push("0 = 1");
            } else {
                stmt.push(&format!("{col} IN ("));
                stmt.push_param_list(dialect, criteria.values.iter().cloned());
                stmt.push(")");
            }
        }
        CriteriaOperator::NotIn => {
            if criteria.values.is_empty() {
                // Empty negated membership is always true, by contract.
                stmt.push("1 = 1");
            } else {
                stmt.push(&format!("{col} NOT IN ("));
                stmt.push_param_list(dialect, criteria.values.iter().cloned());
                stmt.push(")");
            }
        }
        CriteriaOperator::StartsWith => compile_like(dialect, criteria, &col, false, stmt, |v| {
            format!("{v}%")
        })?,
        CriteriaOperator::NotStartsWith => compile_like(dialect, criteria, &col, true, stmt, |v| {
            format!("{v}%")
        })?,
        CriteriaOperator::Contains => compile_like(dialect, criteria, &col, false, stmt, |v| {
            format!("%{v}%")
        })?,
        CriteriaOperator::NotContains => compile_like(dialect, criteria, &col, true, stmt, |v| {
            format!("%{v}%")
        })?,
        CriteriaOperator::EndsWith => compile_like(dialect, criteria, &col, false, stmt, |v| {
            format!("%{v}")
        })?,
        CriteriaOperator::NotEndsWith => compile_like(dialect, criteria, &col, true, stmt, |v| {
            format!("%{v}")
        })?,
        CriteriaOperator::Between => {
            let (low, high) = pair_values(criteria)?;
            stmt.push(&format!("{col} BETWEEN "));
            stmt.push_param(dialect, low);
            stmt.push(" AND ");
            stmt.push_param(dialect, high);
        }
        CriteriaOperator::NotBetween => {
            let (low, high) = pair_values(criteria)?;
            stmt.push(&format!("{col} NOT BETWEEN "));
            stmt.push_param(dialect, low);
            stmt.push(" AND ");
            stmt.push_param(dialect, high);
        }
        CriteriaOperator::IsBlank => {
            if field.field_type == FieldType::Text {
                stmt.push(&format!("({col} IS NULL OR {col} = '')"));
            } else {
                stmt.push(&format!("{col} IS NULL"));
            }
        }
        CriteriaOperator::IsNotBlank => {
            if field.field_type == FieldType::Text {
                stmt.push(&format!("({col} IS NOT NULL AND {col} <> '')"));
            } else {
                stmt.push(&format!("{col} IS NOT NULL"));
            }
        }
    }
    Ok(())
}

fn compile_column_comparison(
    meta: &MetaInstance,
    graph: &JoinGraph,
    dialect: &dyn Dialect,
    criteria: &Criteria,
    left: &str,
    other_name: &str,
    stmt: &mut Statement,
) -> Result<()> {
    if !criteria.operator.supports_other_field() {
        return Err(EngineError::invalid_filter(format!(
            "operator {:?} cannot compare against another column",
            criteria.operator
        )));
    }
    let (other_alias, other_field) = resolve_field(meta, graph, other_name)?;
    let right = column_sql(dialect, &other_alias, other_field);
    let op = match criteria.operator {
        CriteriaOperator::Equals => "=",
        CriteriaOperator::NotEquals => "<>",
        CriteriaOperator::LessThan => "<",
        CriteriaOperator::LessThanOrEquals => "<=",
        CriteriaOperator::GreaterThan => ">",
        CriteriaOperator::GreaterThanOrEquals => ">=",
        _ => unreachable!("guarded by supports_other_field"),
    };
    stmt.push(&format!("{left} {op} {right}"));
    Ok(())
}

fn compile_like(
    dialect: &dyn Dialect,
    criteria: &Criteria,
    col: &str,
    negated: bool,
    stmt: &mut Statement,
    pattern: impl FnOnce(&str) -> String,
) -> Result<()> {
    let value = single_value(criteria)?;
    let text = value.as_text().ok_or_else(|| {
        EngineError::invalid_filter(format!(
            "operator {:?} requires a text value on field '{}'",
            criteria.operator, criteria.field_name
        ))
    })?;
    let keyword = if negated { "NOT LIKE" } else { "LIKE" };
    stmt.push(&format!("{col} {keyword} "));
    stmt.push_param(dialect, Value::Text(pattern(&escape_like(text))));
    stmt.push(" ESCAPE '\\'");
    Ok(())
}

// Escapes LIKE wildcards so caller-supplied text always matches literally.
fn escape_like(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn single_value(criteria: &Criteria) -> Result<Value> {
    if criteria.values.len() != 1 {
        return Err(EngineError::invalid_filter(format!(
            "operator {:?} takes exactly one value on field '{}', got {}",
            criteria.operator,
            criteria.field_name,
            criteria.values.len()
        )));
    }
    let value = criteria.values[0].clone();
    if value.is_null() {
        return Err(EngineError::invalid_filter(format!(
            "operator {:?} cannot compare against NULL on field '{}'; use IS_BLANK / IS_NOT_BLANK",
            criteria.operator, criteria.field_name
        )));
    }
    Ok(value)
}

fn pair_values(criteria: &Criteria) -> Result<(Value, Value)> {
    if criteria.values.len() != 2 {
        return Err(EngineError::invalid_filter(format!(
            "operator {:?} takes exactly two values on field '{}', got {}",
            criteria.operator,
            criteria.field_name,
            criteria.values.len()
        )));
    }
    Ok((criteria.values[0].clone(), criteria.values[1].clone()))
}
