//! SurrealDB Schema Source - Connection and Enumeration
//!
//! Every database inside one SurrealDB namespace is a schema under test.
//! The source keeps a namespace-scoped client for enumeration and opens a
//! dedicated client per schema, so concurrent checks against different
//! schemas never share session state. The last listing is cached so that
//! connecting to a known schema does not rescan the namespace.
//!
//! Supports both local (in-memory) and remote (WebSocket) endpoints.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::Deserialize;
use surrealdb::engine::any::Any;
use surrealdb::opt::auth::Root;
use surrealdb::Surreal;
use tracing::{debug, info, instrument};

use crate::error::StateError;
use crate::storage_traits::{
    column_alias, validate_column, validate_table_name, Row, SchemaSource, StorageResult,
    TargetConnection,
};

/// Connection settings for a SurrealDB-backed schema source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    /// Endpoint URL (e.g., "ws://db.internal:8000" or "mem://")
    pub endpoint: String,
    /// Namespace whose databases are the schemas under test
    pub namespace: String,
    /// Root username (optional)
    pub username: Option<String>,
    /// Root password (optional)
    pub password: Option<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            endpoint: "mem://".to_string(),
            namespace: "healthcheck".to_string(),
            username: None,
            password: None,
        }
    }
}

impl SourceConfig {
    /// Create a configuration for an unauthenticated endpoint
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    /// Set custom namespace
    pub fn with_namespace(mut self, ns: impl Into<String>) -> Self {
        self.namespace = ns.into();
        self
    }

    /// Sign in as a root user on every connection
    pub fn with_root(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Create from environment variables
    ///
    /// Reads:
    /// - HEALTHCHECK_DB_ENDPOINT (optional, default: "mem://")
    /// - HEALTHCHECK_DB_NAMESPACE (optional, default: "healthcheck")
    /// - HEALTHCHECK_DB_USERNAME / HEALTHCHECK_DB_PASSWORD (optional, used together)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`SourceConfig::from_env`] with an injectable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            endpoint: lookup("HEALTHCHECK_DB_ENDPOINT").unwrap_or(defaults.endpoint),
            namespace: lookup("HEALTHCHECK_DB_NAMESPACE").unwrap_or(defaults.namespace),
            username: lookup("HEALTHCHECK_DB_USERNAME"),
            password: lookup("HEALTHCHECK_DB_PASSWORD"),
        }
    }

    fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(u), Some(p)) => Some((u.as_str(), p.as_str())),
            _ => None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct NamespaceInfo {
    #[serde(default)]
    databases: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct CountRow {
    n: u64,
}

/// Open a client, authenticate if configured, and select the namespace.
async fn open_client(config: &SourceConfig) -> StorageResult<Surreal<Any>> {
    let db = surrealdb::engine::any::connect(&config.endpoint)
        .await
        .map_err(|e| {
            StateError::Connection(format!("Failed to connect to {}: {}", config.endpoint, e))
        })?;

    if let Some((username, password)) = config.credentials() {
        db.signin(Root { username, password })
            .await
            .map_err(|e| StateError::Connection(format!("Root authentication failed: {}", e)))?;
    }

    db.use_ns(&config.namespace)
        .await
        .map_err(|e| StateError::Connection(format!("Failed to select namespace: {}", e)))?;

    Ok(db)
}

/// SurrealDB-backed [`SchemaSource`]
#[derive(Clone)]
pub struct SurrealSchemaSource {
    config: SourceConfig,
    db: Surreal<Any>,
    known: Arc<RwLock<BTreeSet<String>>>,
    scans: Arc<AtomicU64>,
}

impl SurrealSchemaSource {
    /// Connect the enumeration client.
    #[instrument(skip(config), fields(endpoint = %config.endpoint, namespace = %config.namespace))]
    pub async fn connect(config: SourceConfig) -> StorageResult<Self> {
        info!("Connecting schema source");
        let db = open_client(&config).await?;
        Ok(Self {
            config,
            db,
            known: Arc::default(),
            scans: Arc::default(),
        })
    }

    /// The namespace-scoped client used for enumeration.
    pub fn client(&self) -> &Surreal<Any> {
        &self.db
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// Number of `INFO FOR NS` scans issued so far.
    pub fn namespace_scans(&self) -> u64 {
        self.scans.load(Ordering::SeqCst)
    }

    fn is_known(&self, schema: &str) -> bool {
        self.known
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(schema)
    }
}

#[async_trait]
impl SchemaSource for SurrealSchemaSource {
    async fn list_schemas(&self) -> StorageResult<Vec<String>> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        let mut result = self.db.query("INFO FOR NS").await?;
        let info: Option<NamespaceInfo> = result.take(0)?;
        let schemas: Vec<String> = info.unwrap_or_default().databases.into_keys().collect();
        *self.known.write().unwrap_or_else(|e| e.into_inner()) =
            schemas.iter().cloned().collect();
        debug!(count = schemas.len(), "Listed schemas");
        Ok(schemas)
    }

    #[instrument(skip(self))]
    async fn connect(&self, schema: &str) -> StorageResult<Arc<dyn TargetConnection>> {
        // Rescan only for names the cached listing has not seen.
        if !self.is_known(schema) && !self.list_schemas().await?.iter().any(|s| s == schema) {
            return Err(StateError::SchemaNotFound(schema.to_string()));
        }

        let unreachable = |reason: String| StateError::Unreachable {
            schema: schema.to_string(),
            reason,
        };

        let db = open_client(&self.config)
            .await
            .map_err(|e| unreachable(e.to_string()))?;
        db.use_db(schema)
            .await
            .map_err(|e| unreachable(e.to_string()))?;

        let conn = SurrealConnection {
            schema: schema.to_string(),
            db,
        };
        conn.ping().await.map_err(|e| unreachable(e.to_string()))?;

        debug!("Opened target connection");
        Ok(Arc::new(conn))
    }
}

/// A SurrealDB client bound to one database.
///
/// The underlying client multiplexes requests, so one handle serves every
/// check running against the schema.
pub struct SurrealConnection {
    schema: String,
    db: Surreal<Any>,
}

impl SurrealConnection {
    /// Wrap a client that already has namespace and database selected.
    pub fn from_client(schema: impl Into<String>, db: Surreal<Any>) -> Self {
        Self {
            schema: schema.into(),
            db,
        }
    }
}

#[async_trait]
impl TargetConnection for SurrealConnection {
    fn schema(&self) -> &str {
        &self.schema
    }

    async fn count(&self, table: &str, condition: Option<&str>) -> StorageResult<u64> {
        validate_table_name(table)?;
        let sql = match condition {
            Some(cond) => format!("SELECT count() AS n FROM {table} WHERE {cond} GROUP ALL"),
            None => format!("SELECT count() AS n FROM {table} GROUP ALL"),
        };
        let mut result = self.db.query(sql).await?;
        let rows: Vec<CountRow> = result.take(0)?;
        Ok(rows.first().map(|r| r.n).unwrap_or(0))
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
        let mut projection = Vec::with_capacity(columns.len());
        for column in columns {
            validate_column(column)?;
            projection.push(format!("<string> ({column} ?? '') AS {}", column_alias(column)));
        }
        let projection = projection.join(", ");
        let sql = match condition {
            Some(cond) => format!("SELECT {projection} FROM {table} WHERE {cond} LIMIT {limit}"),
            None => format!("SELECT {projection} FROM {table} LIMIT {limit}"),
        };
        let mut result = self.db.query(sql).await?;
        let rows: Vec<Row> = result.take(0)?;
        Ok(rows)
    }

    async fn ping(&self) -> StorageResult<()> {
        self.db
            .health()
            .await
            .map_err(|e| StateError::Connection(e.to_string()))
    }
}
