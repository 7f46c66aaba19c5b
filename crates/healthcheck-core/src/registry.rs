//! Database target registry.
//!
//! [`DatabaseRegistry::build`] enumerates the schemas a [`SchemaSource`]
//! exposes, keeps those whose whole name matches the selection pattern,
//! classifies each one and opens its connection. Schemas that refuse the
//! connection are logged and left out; only a failure to enumerate at all is
//! fatal.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use healthcheck_state::SchemaSource;
use regex::Regex;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument};

use crate::domain::{DatabaseType, HealthcheckError, Result, Target};
use crate::metrics::METRICS;
use crate::obs::emit_target_excluded;

/// Compile `pattern` so that it must match a whole schema name.
pub fn compile_pattern(pattern: &str) -> Result<Regex> {
    Regex::new(&format!("^(?:{pattern})$")).map_err(|e| HealthcheckError::InvalidPattern {
        pattern: pattern.to_string(),
        detail: e.to_string(),
    })
}

/// The set of reachable targets selected for this process.
#[derive(Debug, Default)]
pub struct DatabaseRegistry {
    targets: BTreeMap<String, Arc<Target>>,
}

impl DatabaseRegistry {
    /// Scan `source` and register every reachable schema matching `pattern`.
    ///
    /// Connections are opened concurrently; each successful connection stays
    /// cached on its target for reuse by later checks.
    #[instrument(skip(source))]
    pub async fn build(source: Arc<dyn SchemaSource>, pattern: &str) -> Result<Self> {
        let regex = compile_pattern(pattern)?;
        let names: BTreeSet<String> = source
            .list_schemas()
            .await
            .map_err(|e| HealthcheckError::Registry(e.to_string()))?
            .into_iter()
            .filter(|name| regex.is_match(name))
            .collect();

        debug!(matched = names.len(), "schemas matched pattern");

        let mut join_set = JoinSet::new();
        for name in names {
            let target = Arc::new(Target::new(name, Arc::clone(&source)));
            join_set.spawn(async move {
                let opened = target.connection().await.map(|_| ());
                (target, opened)
            });
        }

        let mut targets = BTreeMap::new();
        while let Some(joined) = join_set.join_next().await {
            let (target, opened) = joined
                .map_err(|e| HealthcheckError::Registry(format!("connection attempt panicked: {e}")))?;
            match opened {
                Ok(()) => {
                    targets.insert(target.name().to_string(), target);
                }
                Err(e) => {
                    METRICS.inc_targets_excluded();
                    emit_target_excluded(target.name(), &e);
                }
            }
        }

        info!(targets = targets.len(), "database registry built");
        Ok(Self { targets })
    }

    /// Build a registry from already-constructed targets, keeping the first
    /// of any duplicate names.
    pub fn from_targets<I>(targets: I) -> Self
    where
        I: IntoIterator<Item = Arc<Target>>,
    {
        let mut map = BTreeMap::new();
        for target in targets {
            map.entry(target.name().to_string()).or_insert(target);
        }
        Self { targets: map }
    }

    /// Every registered target, ordered by name.
    pub fn all(&self) -> Vec<Arc<Target>> {
        self.targets.values().cloned().collect()
    }

    pub fn get_by_exact_name(&self, name: &str) -> Option<Arc<Target>> {
        self.targets.get(name).cloned()
    }

    /// Targets whose whole name matches `pattern`, ordered by name.
    pub fn get_by_pattern(&self, pattern: &str) -> Result<Vec<Arc<Target>>> {
        let regex = compile_pattern(pattern)?;
        Ok(self
            .targets
            .values()
            .filter(|t| regex.is_match(t.name()))
            .cloned()
            .collect())
    }

    /// Targets of a given type, ordered by name.
    pub fn by_type(&self, db_type: DatabaseType) -> Vec<Arc<Target>> {
        self.targets
            .values()
            .filter(|t| t.db_type() == db_type)
            .cloned()
            .collect()
    }

    /// Distinct types present in the registry.
    pub fn types(&self) -> BTreeSet<DatabaseType> {
        self.targets.values().map(|t| t.db_type()).collect()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}
