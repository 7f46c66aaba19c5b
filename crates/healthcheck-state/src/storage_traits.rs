//! Storage trait definitions for healthcheck targets
//!
//! These traits define the two seams between the orchestration engine and
//! the databases it inspects:
//! - `SchemaSource`: enumerates schemas and opens connections to them
//! - `TargetConnection`: a connection scoped to a single schema
//!
//! Both traits are async and backend-agnostic. In-memory fakes are provided
//! for testing via the `fakes` module.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StateError;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StateError>;

/// One selected row, keyed by column alias. Values are rendered as strings;
/// a missing value is the empty string.
pub type Row = BTreeMap<String, String>;

/// Something that knows which schemas exist and how to connect to them.
///
/// Guarantees:
/// - `list_schemas` returns each schema name at most once.
/// - `connect(name)` for a name not returned by `list_schemas` fails with
///   `StateError::SchemaNotFound`.
#[async_trait]
pub trait SchemaSource: Send + Sync {
    /// Enumerate every schema visible to this source.
    async fn list_schemas(&self) -> StorageResult<Vec<String>>;

    /// Open a connection scoped to `schema`.
    async fn connect(&self, schema: &str) -> StorageResult<Arc<dyn TargetConnection>>;
}

/// A live connection to one schema.
///
/// Implementations must tolerate concurrent use: several checks may run
/// against the same target at once and share this handle.
#[async_trait]
pub trait TargetConnection: Send + Sync {
    /// Name of the schema this connection is bound to.
    fn schema(&self) -> &str;

    /// Count rows of `table`, optionally restricted by a boolean `condition`
    /// written in the backend's expression syntax.
    async fn count(&self, table: &str, condition: Option<&str>) -> StorageResult<u64>;

    /// Fetch at most `limit` rows of `table` matching `condition`.
    ///
    /// Each column is a field path such as `coord_system.name`; it is
    /// returned under its alias (see [`column_alias`]). Conditions may refer
    /// to linked records, which is how checks express joins.
    async fn select(
        &self,
        table: &str,
        columns: &[&str],
        condition: Option<&str>,
        limit: usize,
    ) -> StorageResult<Vec<Row>>;

    /// Cheap liveness check.
    async fn ping(&self) -> StorageResult<()>;
}

/// Validate a table identifier before it is interpolated into a query.
pub fn validate_table_name(table: &str) -> StorageResult<()> {
    let valid = !table.is_empty()
        && table
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !table.starts_with(|c: char| c.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(StateError::InvalidInput(format!(
            "invalid table name '{table}'"
        )))
    }
}

/// Validate a column path (`name`, `coord_system.name`) before interpolation.
pub fn validate_column(column: &str) -> StorageResult<()> {
    let valid = !column.is_empty()
        && column.split('.').all(|part| validate_table_name(part).is_ok());
    if valid {
        Ok(())
    } else {
        Err(StateError::InvalidInput(format!(
            "invalid column '{column}'"
        )))
    }
}

/// Key a selected column is returned under: the path with `.` turned into `_`.
pub fn column_alias(column: &str) -> String {
    column.replace('.', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns() {
        assert!(validate_column("name").is_ok());
        assert!(validate_column("coord_system.name").is_ok());
        assert!(validate_column("coord_system.").is_err());
        assert!(validate_column("name AS x").is_err());
        assert_eq!(column_alias("coord_system.name"), "coord_system_name");
    }

    #[test]
    fn test_table_names() {
        assert!(validate_table_name("seq_region").is_ok());
        assert!(validate_table_name("ditag_feature2").is_ok());
        assert!(validate_table_name("").is_err());
        assert!(validate_table_name("1abc").is_err());
        assert!(validate_table_name("assembly; DELETE assembly").is_err());
    }
}
