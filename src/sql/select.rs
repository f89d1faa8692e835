//! Assembles complete SELECT statements for queries, counts and aggregates.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{EngineError, Result};
use crate::model::{FieldType, MetaInstance};
use crate::query::aggregate::{Aggregate, AggregateOperator, GroupBy};
use crate::query::filter::{OrderBy, QueryFilter, SetOperator};
use crate::query::inputs::{AggregateInput, CountInput, QueryInput};
use crate::session::Session;
use crate::sql::criteria::compile_criteria;
use crate::sql::dialect::Dialect;
use crate::sql::filter::{compile_where, ensure_filter_tables};
use crate::sql::join_graph::JoinGraph;
use crate::sql::security::build_security_criteria;
use crate::sql::statement::Statement;
use crate::sql::{column_sql, ensure_field_table, resolve_field, split_qualified};
use crate::query::criteria::Criteria;
use crate::query::joins::JoinKind;

/// One output column of a compiled record query.
#[derive(Debug, Clone)]
pub(crate) struct SelectColumn {
    /// Record key the column maps to (`field`, or `alias.field` for joins).
    pub key: String,
    /// Declared type used to coerce the backend value.
    pub field_type: FieldType,
}

/// A compiled record query plus its output column layout.
#[derive(Debug)]
pub(crate) struct CompiledQuery {
    /// The statement to execute.
    pub statement: Statement,
    /// Output columns in select-list order.
    pub columns: Vec<SelectColumn>,
}

/// A compiled aggregate query plus its positional result layout.
///
/// Result columns are ordered: visible aggregates, then group-bys, then any
/// aggregates added internally for ORDER BY (which the mapper strips).
#[derive(Debug)]
pub(crate) struct CompiledAggregate {
    /// The statement to execute.
    pub statement: Statement,
    /// Requested aggregates with the declared type of their field.
    pub aggregates: Vec<(Aggregate, FieldType)>,
    /// Group-by columns with their resolved types.
    pub group_bys: Vec<(GroupBy, FieldType)>,
}

/// Compiles a record query, dispatching on set-operator filters.
pub(crate) fn compile_query(
    meta: &MetaInstance,
    dialect: &dyn Dialect,
    session: &Session,
    input: &QueryInput,
) -> Result<CompiledQuery> {
    let filter = input.filter.clone().unwrap_or_default();
    match filter.sub_filter_set_operator {
        Some(op) => compile_compound(meta, dialect, session, input, &filter, op),
        None => {
            let (mut compiled, graph) = compile_simple(meta, dialect, session, input, &filter)?;
            push_order_by(
                meta,
                &graph,
                dialect,
                &filter.order_bys,
                OrderTarget::Columns,
                &mut compiled.statement,
            )?;
            if let Some(clause) = dialect.limit_clause(filter.limit, filter.skip) {
                compiled.statement.push(" ");
                compiled.statement.push(&clause);
            }
            Ok(compiled)
        }
    }
}

/// Compiles a row count, wrapping set-operator filters as a derived table.
pub(crate) fn compile_count(
    meta: &MetaInstance,
    dialect: &dyn Dialect,
    session: &Session,
    input: &CountInput,
) -> Result<Statement> {
    let filter = input.filter.clone().unwrap_or_default();

    if filter.sub_filter_set_operator.is_some() {
        // Count the combined arms; ordering and pagination don't apply.
        let mut inner_filter = filter;
        inner_filter.order_bys.clear();
        inner_filter.limit = None;
        inner_filter.skip = None;
        let query_input = QueryInput::new(&input.table_name).with_filter(inner_filter);
        let inner = compile_query(meta, dialect, session, &query_input)?;
        let mut stmt = Statement::new();
        stmt.push("SELECT COUNT(*) AS ");
        stmt.push(&dialect.quote_identifier("record_count"));
        stmt.push(" FROM (");
        stmt.append(inner.statement);
        stmt.push(")");
        return Ok(stmt);
    }

    let mut graph = JoinGraph::new(meta, &input.table_name)?;
    ensure_filter_tables(meta, &mut graph, &filter)?;
    let security = build_security_criteria(meta, session, &mut graph)?;

    let mut stmt = Statement::new();
    stmt.push("SELECT ");
    if graph.has_to_many() {
        // Fanning joins would overcount main-table rows.
        let table = meta.table(graph.main_table())?;
        let pk = table.primary_key()?;
        stmt.push(&format!(
            "COUNT(DISTINCT {})",
            column_sql(dialect, graph.main_alias(), pk)
        ));
    } else {
        stmt.push("COUNT(*)");
    }
    stmt.push(" AS ");
    stmt.push(&dialect.quote_identifier("record_count"));
    stmt.push(" FROM ");
    push_from(meta, dialect, &graph, &mut stmt)?;
    push_where(meta, dialect, &graph, &filter, &security, &mut stmt)?;
    Ok(stmt)
}

/// Compiles an aggregate query.
///
/// An ORDER BY referencing an aggregate that was not requested adds it to
/// the select list internally; the executor strips it from the mapped result.
pub(crate) fn compile_aggregate(
    meta: &MetaInstance,
    dialect: &dyn Dialect,
    session: &Session,
    input: &AggregateInput,
) -> Result<CompiledAggregate> {
    let filter = input.filter.clone().unwrap_or_default();
    if filter.sub_filter_set_operator.is_some() {
        return Err(EngineError::InvalidAggregate {
            reason: "set operations are not supported in aggregate queries".into(),
        });
    }
    if input.aggregates.is_empty() && input.group_bys.is_empty() {
        return Err(EngineError::InvalidAggregate {
            reason: "at least one aggregate or group-by is required".into(),
        });
    }

    let mut graph = JoinGraph::new(meta, &input.table_name)?;
    for qj in &input.joins {
        graph.add_query_join(meta, qj)?;
    }
    ensure_filter_tables(meta, &mut graph, &filter)?;
    for aggregate in &input.aggregates {
        ensure_field_table(meta, &mut graph, &aggregate.field_name)?;
    }
    for group_by in &input.group_bys {
        ensure_field_table(meta, &mut graph, &group_by.field_name)?;
    }
    for order_by in &filter.order_bys {
        if let Some(aggregate) = &order_by.aggregate {
            ensure_field_table(meta, &mut graph, &aggregate.field_name)?;
        }
    }
    let security = build_security_criteria(meta, session, &mut graph)?;

    let mut visible: Vec<Aggregate> = Vec::new();
    for aggregate in &input.aggregates {
        if !visible.contains(aggregate) {
            visible.push(aggregate.clone());
        }
    }
    let mut hidden: Vec<Aggregate> = Vec::new();
    for order_by in &filter.order_bys {
        if let Some(aggregate) = &order_by.aggregate {
            if !visible.contains(aggregate) && !hidden.contains(aggregate) {
                hidden.push(aggregate.clone());
            }
        }
    }

    let mut aliases: BTreeMap<Aggregate, String> = BTreeMap::new();
    for aggregate in visible.iter().chain(hidden.iter()) {
        aliases.insert(aggregate.clone(), aggregate_alias(aggregate));
    }

    let mut stmt = Statement::new();
    stmt.push("SELECT ");
    let mut first = true;
    let mut typed_visible = Vec::with_capacity(visible.len());
    for aggregate in &visible {
        if !first {
            stmt.push(", ");
        }
        first = false;
        let (expr, field_type) = aggregate_expr(meta, &graph, dialect, aggregate)?;
        stmt.push(&format!(
            "{expr} AS {}",
            dialect.quote_identifier(&aliases[aggregate])
        ));
        typed_visible.push((aggregate.clone(), field_type));
    }
    let mut typed_groups = Vec::with_capacity(input.group_bys.len());
    let mut group_exprs = Vec::with_capacity(input.group_bys.len());
    for group_by in &input.group_bys {
        if !first {
            stmt.push(", ");
        }
        first = false;
        let (alias, field) = resolve_field(meta, &graph, &group_by.field_name)?;
        let col = column_sql(dialect, &alias, field);
        stmt.push(&format!(
            "{col} AS {}",
            dialect.quote_identifier(&group_by.field_name)
        ));
        let field_type = group_by.field_type.unwrap_or(field.field_type);
        typed_groups.push((group_by.clone(), field_type));
        group_exprs.push(col);
    }
    for aggregate in &hidden {
        if !first {
            stmt.push(", ");
        }
        first = false;
        let (expr, _) = aggregate_expr(meta, &graph, dialect, aggregate)?;
        stmt.push(&format!(
            "{expr} AS {}",
            dialect.quote_identifier(&aliases[aggregate])
        ));
    }

    stmt.push(" FROM ");
    push_from(meta, dialect, &graph, &mut stmt)?;
    push_where(meta, dialect, &graph, &filter, &security, &mut stmt)?;

    if !group_exprs.is_empty() {
        stmt.push(" GROUP BY ");
        stmt.push(&group_exprs.join(", "));
    }

    push_order_by(
        meta,
        &graph,
        dialect,
        &filter.order_bys,
        OrderTarget::Aggregates(&aliases),
        &mut stmt,
    )?;
    if let Some(clause) = dialect.limit_clause(filter.limit, filter.skip) {
        stmt.push(" ");
        stmt.push(&clause);
    }

    Ok(CompiledAggregate {
        statement: stmt,
        aggregates: typed_visible,
        group_bys: typed_groups,
    })
}

// Simple (non-compound) select, without ORDER BY or pagination so compound
// arms can reuse it.
fn compile_simple(
    meta: &MetaInstance,
    dialect: &dyn Dialect,
    session: &Session,
    input: &QueryInput,
    filter: &QueryFilter,
) -> Result<(CompiledQuery, JoinGraph)> {
    let mut graph = JoinGraph::new(meta, &input.table_name)?;
    for qj in &input.joins {
        graph.add_query_join(meta, qj)?;
    }
    ensure_filter_tables(meta, &mut graph, filter)?;
    let security = build_security_criteria(meta, session, &mut graph)?;

    let (select_sql, columns) =
        build_select_list(meta, dialect, &graph, input.field_names_to_include.as_ref())?;

    let mut stmt = Statement::new();
    stmt.push("SELECT ");
    stmt.push(&select_sql);
    stmt.push(" FROM ");
    push_from(meta, dialect, &graph, &mut stmt)?;
    push_where(meta, dialect, &graph, filter, &security, &mut stmt)?;

    Ok((
        CompiledQuery {
            statement: stmt,
            columns,
        },
        graph,
    ))
}

fn compile_compound(
    meta: &MetaInstance,
    dialect: &dyn Dialect,
    session: &Session,
    input: &QueryInput,
    filter: &QueryFilter,
    op: SetOperator,
) -> Result<CompiledQuery> {
    if !filter.criteria.is_empty() {
        return Err(EngineError::invalid_filter(
            "a set-operator filter cannot carry criteria of its own",
        ));
    }
    if filter.sub_filters.is_empty() {
        return Err(EngineError::invalid_filter(
            "a set-operator filter requires at least one sub-filter",
        ));
    }

    let op_sql = match op {
        SetOperator::Union => "UNION",
        SetOperator::UnionAll => "UNION ALL",
        SetOperator::Intersect => "INTERSECT",
        SetOperator::Except => "EXCEPT",
    };

    let mut combined = Statement::new();
    let mut columns: Vec<SelectColumn> = Vec::new();
    for (i, arm) in filter.sub_filters.iter().enumerate() {
        if arm.sub_filter_set_operator.is_some() {
            return Err(EngineError::invalid_filter(
                "set-operator filters cannot nest inside each other",
            ));
        }
        if arm.limit.is_some() || arm.skip.is_some() {
            return Err(EngineError::invalid_filter(
                "pagination belongs on the top-level filter of a set operation",
            ));
        }
        let (arm_compiled, _) = compile_simple(meta, dialect, session, input, arm)?;
        if i == 0 {
            columns = arm_compiled.columns;
        } else {
            // Compound members may not be parenthesized; the arms already
            // share one select list because they share the input.
            combined.push(&format!(" {op_sql} "));
        }
        combined.append(arm_compiled.statement);
    }

    let keys: BTreeSet<&str> = columns.iter().map(|c| c.key.as_str()).collect();
    push_compound_order_by(dialect, &filter.order_bys, &keys, &mut combined)?;
    if let Some(clause) = dialect.limit_clause(filter.limit, filter.skip) {
        combined.push(" ");
        combined.push(&clause);
    }

    Ok(CompiledQuery {
        statement: combined,
        columns,
    })
}

fn build_select_list(
    meta: &MetaInstance,
    dialect: &dyn Dialect,
    graph: &JoinGraph,
    include: Option<&BTreeSet<String>>,
) -> Result<(String, Vec<SelectColumn>)> {
    let mut parts: Vec<String> = Vec::new();
    let mut columns: Vec<SelectColumn> = Vec::new();

    let main_table = meta.table(graph.main_table())?;
    for field in &main_table.fields {
        if include.map_or(true, |set| set.contains(&field.name)) {
            parts.push(format!(
                "{} AS {}",
                column_sql(dialect, graph.main_alias(), field),
                dialect.quote_identifier(&field.name)
            ));
            columns.push(SelectColumn {
                key: field.name.clone(),
                field_type: field.field_type,
            });
        }
    }

    for entry in graph.entries().iter().filter(|e| e.select) {
        let table = meta.table(&entry.table)?;
        for field in &table.fields {
            let key = format!("{}.{}", entry.alias, field.name);
            if include.map_or(true, |set| set.contains(&key)) {
                parts.push(format!(
                    "{} AS {}",
                    column_sql(dialect, &entry.alias, field),
                    dialect.quote_identifier(&key)
                ));
                columns.push(SelectColumn {
                    key,
                    field_type: field.field_type,
                });
            }
        }
    }

    if let Some(include) = include {
        for name in include {
            if !columns.iter().any(|c| &c.key == name) {
                // Resolve for the precise error: unknown field vs alias.
                resolve_field(meta, graph, name)?;
                return Err(EngineError::invalid_filter(format!(
                    "field '{name}' references a join that is not selected"
                )));
            }
        }
    }

    if columns.is_empty() {
        return Err(EngineError::invalid_filter(
            "the requested field name list excludes every selectable field",
        ));
    }

    Ok((parts.join(", "), columns))
}

fn from_item(dialect: &dyn Dialect, backend_name: &str, alias: &str) -> String {
    if backend_name == alias {
        dialect.quote_identifier(alias)
    } else {
        format!(
            "{} AS {}",
            dialect.quote_identifier(backend_name),
            dialect.quote_identifier(alias)
        )
    }
}

fn push_from(
    meta: &MetaInstance,
    dialect: &dyn Dialect,
    graph: &JoinGraph,
    stmt: &mut Statement,
) -> Result<()> {
    let main = meta.table(graph.main_table())?;
    stmt.push(&from_item(dialect, main.backend_name(), graph.main_alias()));

    for entry in graph.entries() {
        let join = meta.join(&entry.join_name)?;
        if join.join_ons.is_empty() {
            return Err(EngineError::InvalidMetadata {
                reason: format!("join '{}' declares no field pairs", join.name),
            });
        }
        let table = meta.table(&entry.table)?;
        let keyword = match entry.kind {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
        };
        stmt.push(&format!(
            " {keyword} {} ON ",
            from_item(dialect, table.backend_name(), &entry.alias)
        ));
        let (left_alias, right_alias) = if entry.flipped {
            (entry.alias.as_str(), entry.base_alias.as_str())
        } else {
            (entry.base_alias.as_str(), entry.alias.as_str())
        };
        for (i, pair) in join.join_ons.iter().enumerate() {
            if i > 0 {
                stmt.push(" AND ");
            }
            let left_field = meta.field(&join.left_table, &pair.left_field)?;
            let right_field = meta.field(&join.right_table, &pair.right_field)?;
            stmt.push(&format!(
                "{} = {}",
                column_sql(dialect, left_alias, left_field),
                column_sql(dialect, right_alias, right_field)
            ));
        }
    }
    Ok(())
}

fn push_where(
    meta: &MetaInstance,
    dialect: &dyn Dialect,
    graph: &JoinGraph,
    filter: &QueryFilter,
    security: &[Criteria],
    stmt: &mut Statement,
) -> Result<()> {
    let mut where_stmt = Statement::new();
    let wrote = compile_where(meta, graph, dialect, filter, &mut where_stmt)?;
    if !wrote && security.is_empty() {
        return Ok(());
    }

    stmt.push(" WHERE ");
    if wrote {
        if security.is_empty() {
            stmt.append(where_stmt);
        } else {
            stmt.push("(");
            stmt.append(where_stmt);
            stmt.push(")");
        }
    }
    for (i, criteria) in security.iter().enumerate() {
        if wrote || i > 0 {
            stmt.push(" AND ");
        }
        compile_criteria(meta, graph, dialect, criteria, stmt)?;
    }
    Ok(())
}

enum OrderTarget<'a> {
    /// Record query: order-by fields render as qualified columns.
    Columns,
    /// Aggregate query: aggregate order-bys render as their select aliases.
    Aggregates(&'a BTreeMap<Aggregate, String>),
}

fn push_order_by(
    meta: &MetaInstance,
    graph: &JoinGraph,
    dialect: &dyn Dialect,
    order_bys: &[OrderBy],
    target: OrderTarget<'_>,
    stmt: &mut Statement,
) -> Result<()> {
    if order_bys.is_empty() {
        return Ok(());
    }
    stmt.push(" ORDER BY ");
    for (i, order_by) in order_bys.iter().enumerate() {
        if i > 0 {
            stmt.push(", ");
        }
        match (&order_by.field_name, &order_by.aggregate) {
            (Some(field_name), _) => {
                let (alias, field) = resolve_field(meta, graph, field_name)?;
                stmt.push(&column_sql(dialect, &alias, field));
            }
            (None, Some(aggregate)) => match &target {
                OrderTarget::Aggregates(aliases) => {
                    let alias = aliases.get(aggregate).ok_or_else(|| {
                        EngineError::InvalidAggregate {
                            reason: format!(
                                "order-by aggregate on '{}' was not compiled",
                                aggregate.field_name
                            ),
                        }
                    })?;
                    stmt.push(&dialect.quote_identifier(alias));
                }
                OrderTarget::Columns => {
                    return Err(EngineError::invalid_filter(
                        "aggregate order-bys require an aggregate query",
                    ));
                }
            },
            (None, None) => {
                return Err(EngineError::invalid_filter(
                    "an order-by needs a field or an aggregate",
                ));
            }
        }
        stmt.push(if order_by.ascending { " ASC" } else { " DESC" });
    }
    Ok(())
}

// Compound selects must order by select-list aliases: qualified column
// references are not valid after a set operation.
fn push_compound_order_by(
    dialect: &dyn Dialect,
    order_bys: &[OrderBy],
    keys: &BTreeSet<&str>,
    stmt: &mut Statement,
) -> Result<()> {
    if order_bys.is_empty() {
        return Ok(());
    }
    stmt.push(" ORDER BY ");
    for (i, order_by) in order_bys.iter().enumerate() {
        if i > 0 {
            stmt.push(", ");
        }
        let Some(field_name) = &order_by.field_name else {
            return Err(EngineError::invalid_filter(
                "set-operation results can only be ordered by selected fields",
            ));
        };
        let key = match split_qualified(field_name) {
            (None, field) => field.to_owned(),
            (Some(qualifier), field) => format!("{qualifier}.{field}"),
        };
        if !keys.contains(key.as_str()) {
            return Err(EngineError::invalid_filter(format!(
                "order-by field '{field_name}' must be part of the select list of a set operation"
            )));
        }
        stmt.push(&dialect.quote_identifier(&key));
        stmt.push(if order_by.ascending { " ASC" } else { " DESC" });
    }
    Ok(())
}

fn aggregate_alias(aggregate: &Aggregate) -> String {
    let op = match aggregate.operator {
        AggregateOperator::Count => "count",
        AggregateOperator::Sum => "sum",
        AggregateOperator::Avg => "avg",
        AggregateOperator::Min => "min",
        AggregateOperator::Max => "max",
    };
    format!("{op}_{}", aggregate.field_name.replace('.', "_"))
}

fn aggregate_expr(
    meta: &MetaInstance,
    graph: &JoinGraph,
    dialect: &dyn Dialect,
    aggregate: &Aggregate,
) -> Result<(String, FieldType)> {
    let (alias, field) = resolve_field(meta, graph, &aggregate.field_name)?;
    let col = column_sql(dialect, &alias, field);
    let op = match aggregate.operator {
        AggregateOperator::Count => "COUNT",
        AggregateOperator::Sum => "SUM",
        AggregateOperator::Avg => "AVG",
        AggregateOperator::Min => "MIN",
        AggregateOperator::Max => "MAX",
    };
    Ok((format!("{op}({col})"), field.field_type))
}
