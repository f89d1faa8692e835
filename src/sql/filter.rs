//! Compiles nested boolean filter trees into WHERE fragments.

use crate::error::{EngineError, Result};
use crate::model::MetaInstance;
use crate::query::filter::{BooleanOperator, QueryFilter};
use crate::sql::criteria::{compile_criteria, ensure_criteria_tables};
use crate::sql::dialect::Dialect;
use crate::sql::join_graph::JoinGraph;
use crate::sql::statement::Statement;
use crate::sql::ensure_field_table;

/// Pulls into the graph every table the filter tree references, including
/// order-by fields and nested sub-filters.
pub(crate) fn ensure_filter_tables(
    meta: &MetaInstance,
    graph: &mut JoinGraph,
    filter: &QueryFilter,
) -> Result<()> {
    for criteria in &filter.criteria {
        ensure_criteria_tables(meta, graph, criteria)?;
    }
    for order_by in &filter.order_bys {
        if let Some(field_name) = &order_by.field_name {
            ensure_field_table(meta, graph, field_name)?;
        }
    }
    for sub in &filter.sub_filters {
        ensure_filter_tables(meta, graph, sub)?;
    }
    Ok(())
}

/// Appends the filter's boolean tree to the statement.
///
/// Returns false without writing anything when the filter holds no criteria.
/// Sub-filters recurse inside parentheses so precedence survives mixed
/// AND/OR nesting. Set-operator filters never reach this function; the
/// select assembler compiles their arms as independent queries.
pub(crate) fn compile_where(
    meta: &MetaInstance,
    graph: &JoinGraph,
    dialect: &dyn Dialect,
    filter: &QueryFilter,
    stmt: &mut Statement,
) -> Result<bool> {
    if filter.sub_filter_set_operator.is_some() {
        return Err(EngineError::invalid_filter(
            "set-operator filters cannot nest inside a boolean tree",
        ));
    }

    let connective = match filter.boolean_operator {
        BooleanOperator::And => " AND ",
        BooleanOperator::Or => " OR ",
    };

    let mut wrote = false;
    for criteria in &filter.criteria {
        if wrote {
            stmt.push(connective);
        }
        compile_criteria(meta, graph, dialect, criteria, stmt)?;
        wrote = true;
    }

    for sub in &filter.sub_filters {
        if !sub.has_any_criteria() {
            continue;
        }
        let mut inner = Statement::new();
        if compile_where(meta, graph, dialect, sub, &mut inner)? {
            if wrote {
                stmt.push(connective);
            }
            stmt.push("(");
            stmt.append(inner);
            stmt.push(")");
            wrote = true;
        }
    }

    Ok(wrote)
}
