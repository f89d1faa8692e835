//! Vendor quoting and placeholder syntax.

use std::fmt;

/// Backend-specific SQL rendering decisions.
///
/// The compiler core emits ANSI-ish parameterized SQL; everything a vendor
/// disagrees about (identifier quoting, placeholder spelling, pagination)
/// goes through this trait. Providers hand the engine their dialect.
pub trait Dialect: Send + Sync + fmt::Debug {
    /// Quotes an identifier for use as a table, column or alias name.
    fn quote_identifier(&self, ident: &str) -> String;

    /// Renders one bind-parameter placeholder.
    fn placeholder(&self) -> &'static str;

    /// Renders the pagination clause, if any rows are limited or skipped.
    fn limit_clause(&self, limit: Option<u64>, skip: Option<u64>) -> Option<String>;
}

/// Double-quoted identifiers and `?` placeholders.
///
/// Suits SQLite and any backend accepting ANSI quoting.
#[derive(Debug, Default, Clone, Copy)]
pub struct AnsiDialect;

impl Dialect for AnsiDialect {
    fn quote_identifier(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    fn placeholder(&self) -> &'static str {
        "?"
    }

    fn limit_clause(&self, limit: Option<u64>, skip: Option<u64>) -> Option<String> {
        match (limit, skip) {
            (Some(limit), Some(skip)) => Some(format!("LIMIT {limit} OFFSET {skip}")),
            (Some(limit), None) => Some(format!("LIMIT {limit}")),
            // A bare OFFSET needs a LIMIT in front of it; -1 means unbounded.
            (None, Some(skip)) => Some(format!("LIMIT -1 OFFSET {skip}")),
            (None, None) => None,
        }
    }
}
