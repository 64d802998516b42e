//! Error types for dbkit

use std::fmt;

use thiserror::Error;

/// Result type alias for query construction and rendering.
pub type QueryResult<T> = Result<T, QueryError>;

/// Result type alias for pool and execution operations.
pub type DbResult<T> = Result<T, DbError>;

/// The kind of identifier a validation failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentifierKind {
    Table,
    Column,
    TableAlias,
    ColumnAlias,
    Parameter,
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IdentifierKind::Table => "table name",
            IdentifierKind::Column => "column name",
            IdentifierKind::TableAlias => "table alias",
            IdentifierKind::ColumnAlias => "column alias",
            IdentifierKind::Parameter => "parameter name",
        };
        f.write_str(name)
    }
}

/// An invalid query, detected before any SQL reaches the database.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// An explicit column (or value, or function argument) list was empty.
    #[error("{query}: column list is empty")]
    EmptyColumnList { query: &'static str },

    /// An identifier was empty or contained illegal characters.
    #[error("invalid {kind}: {value:?}")]
    InvalidIdentifier { kind: IdentifierKind, value: String },

    /// A statement that would touch every row was built without opting in.
    #[error("{query}: missing WHERE clause (call all_rows() to update every row)")]
    MissingWhere { query: &'static str },

    /// The dialect has no syntax for the requested clause.
    #[error("{feature} is not supported by the {dialect} dialect")]
    Unsupported {
        dialect: &'static str,
        feature: &'static str,
    },
}

impl QueryError {
    /// Create an invalid identifier error.
    pub fn invalid_identifier(kind: IdentifierKind, value: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            kind,
            value: value.into(),
        }
    }
}

/// Error types for pool and database operations
#[derive(Debug, Error)]
pub enum DbError {
    /// The query could not be built.
    #[error("Invalid query: {0}")]
    InvalidQuery(#[from] QueryError),

    /// A caller passed an argument the operation cannot accept.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A connection was handed to a pool that did not lease it.
    #[error("Connection does not belong to this pool")]
    ForeignConnection,

    /// The lease was revoked by `free_all` or `clear`.
    #[error("Lease on pool slot {slot} was revoked")]
    LeaseRevoked { slot: usize },

    /// The pool reached its configured maximum size.
    #[error("Pool exhausted: {max_size} connections already leased")]
    PoolExhausted { max_size: usize },

    /// The SQL references a parameter that was not bound.
    #[error("Missing parameter: {0}")]
    MissingParameter(String),

    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution error
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Unique constraint violation
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// A background component (the runner worker) has shut down.
    #[error("Closed: {0}")]
    Closed(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl DbError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Check if the query was rejected before reaching the database
    pub fn is_invalid_query(&self) -> bool {
        matches!(self, Self::InvalidQuery(_))
    }

    /// Check if this is an argument error (bad input to a pool operation)
    pub fn is_argument_error(&self) -> bool {
        matches!(self, Self::InvalidArgument(_) | Self::ForeignConnection)
    }

    /// Check if this is a unique violation error
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation(_))
    }

    /// Parse a tokio_postgres error into a more specific DbError
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let constraint = db_err.constraint().unwrap_or("unknown");
            let message = db_err.message();

            match db_err.code().code() {
                "23505" => return Self::UniqueViolation(format!("{}: {}", constraint, message)),
                "23503" => {
                    return Self::ForeignKeyViolation(format!("{}: {}", constraint, message));
                }
                _ => {}
            }
        }
        Self::Query(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_identifier_names_the_kind() {
        let err = QueryError::invalid_identifier(IdentifierKind::TableAlias, "a b");
        assert_eq!(err.to_string(), "invalid table alias: \"a b\"");
    }

    #[test]
    fn query_errors_convert_into_db_errors() {
        let err: DbError = QueryError::EmptyColumnList { query: "SELECT" }.into();
        assert!(err.is_invalid_query());
        assert!(!err.is_argument_error());
        assert_eq!(err.to_string(), "Invalid query: SELECT: column list is empty");
    }

    #[test]
    fn argument_errors() {
        assert!(DbError::invalid_argument("connection").is_argument_error());
        assert!(DbError::ForeignConnection.is_argument_error());
        assert!(!DbError::LeaseRevoked { slot: 3 }.is_argument_error());
    }
}
