//! Compilation of request-scoped query descriptions into parameterized SQL.
//!
//! The pipeline runs resolution before emission: the join graph resolver
//! pulls in every table the request touches (explicit joins, qualified field
//! references, security lock chains), then the compilers stream predicate and
//! select-list fragments into a [`statement::Statement`]. No SQL here assumes
//! a specific backend beyond parameterization; identifier quoting goes
//! through the [`dialect::Dialect`] seam.

/// Vendor quoting and placeholder syntax.
pub mod dialect;

/// Accumulates SQL text and bound parameters.
pub mod statement;

/// Join graph resolution: aliases, flipping, multi-hop exposed joins.
pub mod join_graph;

/// Compiles a single comparison into a predicate fragment.
pub mod criteria;

/// Compiles nested boolean filter trees into WHERE fragments.
pub mod filter;

/// Injects row-security predicates derived from the caller's session.
pub mod security;

/// Assembles complete SELECT statements.
pub mod select;

use crate::error::{EngineError, Result};
use crate::model::table::Field;
use crate::model::MetaInstance;
use crate::sql::dialect::Dialect;
use crate::sql::join_graph::JoinGraph;

/// Splits a possibly qualified field name into qualifier and field parts.
pub(crate) fn split_qualified(name: &str) -> (Option<&str>, &str) {
    match name.rsplit_once('.') {
        Some((qualifier, field)) => (Some(qualifier), field),
        None => (None, name),
    }
}

/// Ensures the table referenced by a qualified field name is in the graph.
///
/// Unqualified names resolve against the main table and never extend the
/// graph. A qualifier that matches neither an alias nor a resolved table is
/// treated as a table name and joined in through the unique connecting path.
pub(crate) fn ensure_field_table(
    meta: &MetaInstance,
    graph: &mut JoinGraph,
    name: &str,
) -> Result<()> {
    if let (Some(qualifier), _) = split_qualified(name) {
        if graph.alias_for(qualifier).is_none() {
            graph.ensure_table(meta, qualifier)?;
        }
    }
    Ok(())
}

/// Resolves a possibly qualified field name to its alias and field metadata.
pub(crate) fn resolve_field<'a>(
    meta: &'a MetaInstance,
    graph: &JoinGraph,
    name: &str,
) -> Result<(String, &'a Field)> {
    let (qualifier, field_name) = split_qualified(name);
    match qualifier {
        None => {
            let field = meta.field(graph.main_table(), field_name)?;
            Ok((graph.main_alias().to_owned(), field))
        }
        Some(qualifier) => {
            let (alias, table) =
                graph
                    .alias_for(qualifier)
                    .ok_or_else(|| EngineError::UnresolvedAlias {
                        alias: qualifier.to_owned(),
                        context: name.to_owned(),
                    })?;
            let field = meta.field(table, field_name)?;
            Ok((alias.to_owned(), field))
        }
    }
}

/// Renders a fully qualified, quoted column reference.
pub(crate) fn column_sql(dialect: &dyn Dialect, alias: &str, field: &Field) -> String {
    format!(
        "{}.{}",
        dialect.quote_identifier(alias),
        dialect.quote_identifier(field.column())
    )
}
