//! Check descriptors and the pluggable check contract.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::error::CheckError;
use crate::domain::target::{DatabaseType, Target};
use crate::reporter::CheckContext;

/// Static metadata a check declares when it is registered.
///
/// Immutable once the check is in a catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckDescriptor {
    /// Unique check name.
    pub name: String,

    /// Groups this check belongs to.
    pub groups: BTreeSet<String>,

    /// Target types this check must never run against.
    pub excluded_types: BTreeSet<DatabaseType>,

    /// Team responsible for the check.
    pub team: String,

    /// Human-readable description.
    pub description: String,
}

impl CheckDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            groups: BTreeSet::new(),
            excluded_types: BTreeSet::new(),
            team: String::new(),
            description: String::new(),
        }
    }

    /// Add the check to a group.
    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.groups.insert(group.into());
        self
    }

    /// Never run this check against targets of `db_type`.
    pub fn excluding(mut self, db_type: DatabaseType) -> Self {
        self.excluded_types.insert(db_type);
        self
    }

    pub fn team(mut self, team: impl Into<String>) -> Self {
        self.team = team.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// True unless `db_type` is explicitly excluded.
    pub fn applies_to_type(&self, db_type: DatabaseType) -> bool {
        !self.excluded_types.contains(&db_type)
    }

    /// True when the check belongs to at least one of `groups`.
    pub fn in_any_group<'a, I>(&self, groups: I) -> bool
    where
        I: IntoIterator<Item = &'a String>,
    {
        groups.into_iter().any(|g| self.groups.contains(g))
    }
}

/// A pluggable unit of validation logic.
///
/// `run` reports findings through `ctx` as often as it likes and returns its
/// overall verdict for the target. Returning `Err` means the check itself
/// broke, which is recorded as an internal error rather than a problem with
/// the data.
#[async_trait]
pub trait Check: Send + Sync {
    fn descriptor(&self) -> &CheckDescriptor;

    async fn run(&self, target: &Target, ctx: &CheckContext) -> Result<bool, CheckError>;
}

/// Accessors derived from [`Check::descriptor`].
///
/// Implemented for every `Check` and not overridable, so scheduling always
/// agrees with what the check declared.
pub trait CheckExt {
    fn name(&self) -> &str;
    fn groups(&self) -> &BTreeSet<String>;
    fn applies_to_type(&self, db_type: DatabaseType) -> bool;
}

impl<T: Check + ?Sized> CheckExt for T {
    fn name(&self) -> &str {
        &self.descriptor().name
    }

    fn groups(&self) -> &BTreeSet<String> {
        &self.descriptor().groups
    }

    fn applies_to_type(&self, db_type: DatabaseType) -> bool {
        self.descriptor().applies_to_type(db_type)
    }
}
