//! Test catalog: registered checks and group selection.
//!
//! Checks are registered explicitly when the process starts. A
//! [`CheckCatalog`] is immutable once built, so descriptors (groups,
//! excluded types) are fixed before any scheduling happens.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::checks;
use crate::domain::{Check, CheckDescriptor, CheckExt, HealthcheckError, Result, Target};

/// Collects checks before the catalog is frozen.
#[derive(Default)]
pub struct CatalogBuilder {
    checks: BTreeMap<String, Arc<dyn Check>>,
}

impl CatalogBuilder {
    /// Register a check. Names must be unique.
    pub fn register(mut self, check: Arc<dyn Check>) -> Result<Self> {
        let name = check.name().to_string();
        if self.checks.contains_key(&name) {
            return Err(HealthcheckError::DuplicateCheck(name));
        }
        self.checks.insert(name, check);
        Ok(self)
    }

    /// Register every check in `checks`.
    pub fn register_all<I>(self, checks: I) -> Result<Self>
    where
        I: IntoIterator<Item = Arc<dyn Check>>,
    {
        checks.into_iter().try_fold(self, |b, c| b.register(c))
    }

    pub fn build(self) -> CheckCatalog {
        CheckCatalog {
            checks: self.checks,
        }
    }
}

/// Every check known to this process, keyed by name.
#[derive(Default)]
pub struct CheckCatalog {
    checks: BTreeMap<String, Arc<dyn Check>>,
}

impl CheckCatalog {
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    /// Descriptors of all registered checks, ordered by name.
    pub fn discover(&self) -> Vec<CheckDescriptor> {
        self.checks
            .values()
            .map(|c| c.descriptor().clone())
            .collect()
    }

    /// Checks declaring membership in at least one of `groups`.
    pub fn select_by_groups(&self, groups: &BTreeSet<String>) -> Vec<Arc<dyn Check>> {
        self.checks
            .values()
            .filter(|c| c.descriptor().in_any_group(groups))
            .cloned()
            .collect()
    }

    /// Whether `check` may run against `target`. Pure.
    pub fn applies(check: &dyn Check, target: &Target) -> bool {
        check.applies_to_type(target.db_type())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Check>> {
        self.checks.get(name).cloned()
    }

    /// Union of every declared group.
    pub fn groups(&self) -> BTreeSet<String> {
        self.checks
            .values()
            .flat_map(|c| c.groups().iter().cloned())
            .collect()
    }

    /// Checks owned by `team` (case-insensitive).
    pub fn by_team(&self, team: &str) -> Vec<Arc<dyn Check>> {
        self.checks
            .values()
            .filter(|c| c.descriptor().team.eq_ignore_ascii_case(team))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}

/// Catalog holding the checks shipped with this crate.
pub fn builtin_catalog() -> Result<CheckCatalog> {
    Ok(CheckCatalog::builder()
        .register_all(checks::builtin())?
        .build())
}
