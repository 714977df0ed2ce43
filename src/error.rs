//! Error types for PDSQL.

use thiserror::Error;

/// The main error type for PDSQL operations.
#[derive(Debug, Error)]
pub enum PdsqlError {
    /// An aggregate, unary function or null check was applied twice.
    #[error("Duplicate operator: {0}")]
    DuplicateOperator(String),

    /// Operator token outside the supported vocabulary.
    #[error("Invalid operator: '{0}'")]
    InvalidOperator(String),

    /// Aggregate column used in a clause that only accepts plain values.
    #[error("Aggregate not allowed in {clause}: {column}")]
    AggregateNotAllowed { clause: &'static str, column: String },

    /// HAVING present without GROUP BY.
    #[error("HAVING clause on '{0}' requires a GROUP BY")]
    MissingGroupBy(String),

    /// Argument of the wrong kind.
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// A second limit on the same query.
    #[error("Limit already set to {0}")]
    LimitAlreadySet(u64),

    /// Row access outside `row(0)`, `row(-1)`, `rows(..k)` and `rows(-k..)`.
    #[error("Unsupported row access: {0}")]
    UnsupportedAccess(String),

    /// `run` called on a table without a driver.
    #[error("No driver attached to table '{0}'")]
    NoDriver(String),

    /// Driver failed to execute a statement.
    #[error("Driver error: {0}")]
    Driver(String),

    /// Connection error.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PdsqlError {
    /// Create an aggregate-not-allowed error for the given clause.
    pub fn aggregate(clause: &'static str, column: impl ToString) -> Self {
        Self::AggregateNotAllowed {
            clause,
            column: column.to_string(),
        }
    }

    /// Create a duplicate operator error.
    pub fn duplicate(message: impl Into<String>) -> Self {
        Self::DuplicateOperator(message.into())
    }
}

/// Result type alias for PDSQL operations.
pub type PdsqlResult<T> = Result<T, PdsqlError>;
