use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Structured errors emitted by the query compiler and executor.
///
/// Resolution errors (`UnknownTable`, `AmbiguousJoin`, `NoJoinPath`,
/// `DuplicateAlias`, `InvalidFilter`) are raised before any SQL executes and
/// always abort the single call. `Constraint` is only surfaced internally:
/// the mutation engine converts it into a per-record failure on the structured
/// output. `Backend` is a transport-level failure and leaves any open
/// transaction in an indeterminate state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Referenced table name does not exist in the metadata instance.
    #[error("unknown table '{name}'")]
    UnknownTable {
        /// The table name that failed to resolve.
        name: String,
    },
    /// Referenced field name does not exist on the named table.
    #[error("unknown field '{field}' on table '{table}'")]
    UnknownField {
        /// Table the lookup ran against.
        table: String,
        /// The field name that failed to resolve.
        field: String,
    },
    /// Referenced join name does not exist in the metadata instance.
    #[error("unknown join '{name}'")]
    UnknownJoin {
        /// The join name that failed to resolve.
        name: String,
    },
    /// More than one join connects to the requested table; the caller must
    /// disambiguate with a left-table-or-alias qualifier.
    #[error("ambiguous join to table '{table}': {candidates} candidate joins, specify a base table or alias")]
    AmbiguousJoin {
        /// Table the join request targeted.
        table: String,
        /// Number of candidate joins found.
        candidates: usize,
    },
    /// No join path connects the requested table to any table in the query.
    #[error("no join path from '{from}' to table '{table}'")]
    NoJoinPath {
        /// Table (or alias) the search started from.
        from: String,
        /// Unreachable target table.
        table: String,
    },
    /// Two tables in the same query resolved to the same alias.
    #[error("duplicate alias '{alias}' in join graph")]
    DuplicateAlias {
        /// The colliding identifier.
        alias: String,
    },
    /// Alias referenced by a qualified field name is not part of the query.
    #[error("unresolved alias '{alias}' referenced by '{context}'")]
    UnresolvedAlias {
        /// The alias that failed to resolve.
        alias: String,
        /// The qualified name that referenced it.
        context: String,
    },
    /// A filter or criteria is structurally invalid.
    #[error("invalid filter: {reason}")]
    InvalidFilter {
        /// Human-readable description of the problem.
        reason: String,
    },
    /// The metadata instance itself is inconsistent (a lock's join chain
    /// names a join that does not touch the table it starts from, …).
    #[error("invalid metadata: {reason}")]
    InvalidMetadata {
        /// Human-readable description of the problem.
        reason: String,
    },
    /// An aggregate request is structurally invalid.
    #[error("invalid aggregate request: {reason}")]
    InvalidAggregate {
        /// Human-readable description of the problem.
        reason: String,
    },
    /// The backend rejected a statement with a constraint violation.
    #[error("constraint violation: {message}")]
    Constraint {
        /// Backend-supplied description of the violated constraint.
        message: String,
    },
    /// Transport-level backend failure (lost connection, statement timeout).
    #[error("backend error: {message}")]
    Backend {
        /// Backend-supplied description of the failure.
        message: String,
    },
    /// Operation attempted on a transaction that is no longer active.
    #[error("transaction is no longer active")]
    TransactionInactive,
}

impl EngineError {
    /// Builds an [`EngineError::InvalidFilter`] from any displayable reason.
    pub fn invalid_filter(reason: impl Into<String>) -> Self {
        EngineError::InvalidFilter {
            reason: reason.into(),
        }
    }

    /// Builds an [`EngineError::Backend`] from any displayable message.
    pub fn backend(message: impl Into<String>) -> Self {
        EngineError::Backend {
            message: message.into(),
        }
    }

    /// Returns true when the error is a per-row constraint violation rather
    /// than a transport failure.
    pub fn is_constraint(&self) -> bool {
        matches!(self, EngineError::Constraint { .. })
    }
}
