//! Healthcheck-State: schema sources for healthcheck runs
//!
//! This crate owns all I/O with the databases under test. The orchestration
//! engine only sees the two traits defined here, so checks can be exercised
//! against in-memory fakes as easily as against a live server.
//!
//! ## Key Components
//!
//! - `SchemaSource`: enumerates schemas and opens connections
//! - `TargetConnection`: a shareable connection bound to one schema
//! - `SurrealSchemaSource`: SurrealDB backend (one database per schema)
//! - `fakes`: in-memory implementations for tests

mod error;
pub mod fakes;
mod handle;
pub mod storage_traits;

pub use error::StateError;
pub use handle::{SourceConfig, SurrealConnection, SurrealSchemaSource};
pub use storage_traits::{
    column_alias, validate_column, validate_table_name, Row, SchemaSource, StorageResult,
    TargetConnection,
};

/// Result type for healthcheck-state operations
pub type Result<T> = std::result::Result<T, StateError>;
