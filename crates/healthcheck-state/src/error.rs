//! Error types for healthcheck-state

use thiserror::Error;

/// Errors raised while enumerating or talking to schemas under test.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    /// Could not reach the database server at all
    #[error("Database connection failed: {0}")]
    Connection(String),

    /// A query against an open connection failed
    #[error("Database query failed: {0}")]
    Query(String),

    /// The named schema does not exist in the source
    #[error("Schema not found: {0}")]
    SchemaNotFound(String),

    /// The schema exists but refuses connections
    #[error("Schema unreachable: {schema}: {reason}")]
    Unreachable { schema: String, reason: String },

    /// Caller supplied an invalid table or condition
    #[error("Invalid query input: {0}")]
    InvalidInput(String),
}

impl From<surrealdb::Error> for StateError {
    fn from(err: surrealdb::Error) -> Self {
        StateError::Query(err.to_string())
    }
}
