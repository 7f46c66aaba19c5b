//! In-memory fakes for storage traits (testing only)
//!
//! Provides `MemorySchemaSource` and `MemoryConnection` that satisfy the
//! trait contracts without any external dependencies. Row counts are canned
//! per `(table, condition)` pair rather than evaluated.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::StateError;
use crate::storage_traits::*;

type QueryKey = (String, Option<String>);

/// Canned contents of one in-memory schema.
#[derive(Debug, Clone, Default)]
pub struct MemorySchema {
    counts: HashMap<QueryKey, u64>,
    rows: HashMap<QueryKey, Vec<Row>>,
    unreachable: bool,
    failing_tables: Vec<String>,
}

impl MemorySchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `count(table, condition)` with `n`.
    pub fn with_count(mut self, table: &str, condition: Option<&str>, n: u64) -> Self {
        self.counts
            .insert((table.to_string(), condition.map(str::to_string)), n);
        self
    }

    /// Answer `select(table, _, condition, _)` with `rows`.
    pub fn with_rows(mut self, table: &str, condition: Option<&str>, rows: Vec<Row>) -> Self {
        self.rows
            .insert((table.to_string(), condition.map(str::to_string)), rows);
        self
    }

    /// Refuse every connection attempt to this schema.
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    /// Fail any query touching `table`.
    pub fn failing_table(mut self, table: &str) -> Self {
        self.failing_tables.push(table.to_string());
        self
    }
}

// ---------------------------------------------------------------------------
// MemorySchemaSource
// ---------------------------------------------------------------------------

/// In-memory schema source backed by a `BTreeMap<name, MemorySchema>`.
#[derive(Debug, Default)]
pub struct MemorySchemaSource {
    schemas: Mutex<BTreeMap<String, MemorySchema>>,
    connects: AtomicU64,
}

impl MemorySchemaSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a source holding empty, reachable schemas with the given names.
    pub fn with_schemas<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let source = Self::new();
        for name in names {
            source.insert(name, MemorySchema::new());
        }
        source
    }

    /// Add or replace a schema.
    pub fn insert(&self, name: impl Into<String>, schema: MemorySchema) {
        let mut schemas = self.schemas.lock().unwrap_or_else(|e| e.into_inner());
        schemas.insert(name.into(), schema);
    }

    /// Number of successful `connect` calls so far.
    pub fn connect_count(&self) -> u64 {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SchemaSource for MemorySchemaSource {
    async fn list_schemas(&self) -> StorageResult<Vec<String>> {
        let schemas = self.schemas.lock().unwrap_or_else(|e| e.into_inner());
        Ok(schemas.keys().cloned().collect())
    }

    async fn connect(&self, schema: &str) -> StorageResult<Arc<dyn TargetConnection>> {
        let contents = {
            let schemas = self.schemas.lock().unwrap_or_else(|e| e.into_inner());
            schemas
                .get(schema)
                .cloned()
                .ok_or_else(|| StateError::SchemaNotFound(schema.to_string()))?
        };
        if contents.unreachable {
            return Err(StateError::Unreachable {
                schema: schema.to_string(),
                reason: "connection refused".to_string(),
            });
        }
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MemoryConnection::new(schema, contents)))
    }
}

// ---------------------------------------------------------------------------
// MemoryConnection
// ---------------------------------------------------------------------------

/// In-memory connection answering canned counts.
#[derive(Debug)]
pub struct MemoryConnection {
    schema: String,
    contents: MemorySchema,
    queries: AtomicU64,
}

impl MemoryConnection {
    pub fn new(schema: impl Into<String>, contents: MemorySchema) -> Self {
        Self {
            schema: schema.into(),
            contents,
            queries: AtomicU64::new(0),
        }
    }

    /// Number of `count` calls served.
    pub fn query_count(&self) -> u64 {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TargetConnection for MemoryConnection {
    fn schema(&self) -> &str {
        &self.schema
    }

    async fn count(&self, table: &str, condition: Option<&str>) -> StorageResult<u64> {
        validate_table_name(table)?;
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.contents.failing_tables.iter().any(|t| t == table) {
            return Err(StateError::Query(format!(
                "table '{table}' is not readable in {}",
                self.schema
            )));
        }
        let key = (table.to_string(), condition.map(str::to_string));
        Ok(self.contents.counts.get(&key).copied().unwrap_or(0))
    }

    async fn select(
        &self,
        table: &str,
        columns: &[&str],
        condition: Option<&str>,
        limit: usize,
    ) -> StorageResult<Vec<Row>> {
        validate_table_name(table)?;
        if columns.is_empty() {
            return Err(StateError::InvalidInput("select needs at least one column".into()));
        }
        for column in columns {
            validate_column(column)?;
        }
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.contents.failing_tables.iter().any(|t| t == table) {
            return Err(StateError::Query(format!(
                "table '{table}' is not readable in {}",
                self.schema
            )));
        }

        let aliases: Vec<String> = columns.iter().map(|c| column_alias(c)).collect();
        let key = (table.to_string(), condition.map(str::to_string));
        let rows = self
            .contents
            .rows
            .get(&key)
            .map(Vec::as_slice)
            .unwrap_or_default();
        Ok(rows
            .iter()
            .take(limit)
            .map(|row| {
                aliases
                    .iter()
                    .map(|a| (a.clone(), row.get(a).cloned().unwrap_or_default()))
                    .collect()
            })
            .collect())
    }

    async fn ping(&self) -> StorageResult<()> {
        Ok(())
    }
}
