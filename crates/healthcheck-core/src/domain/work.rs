//! Run requests and the per-WorkItem state machine.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of one (check, target) execution unit.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WorkItemId {
    pub check: String,
    pub target: String,
}

impl WorkItemId {
    pub fn new(check: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            check: check.into(),
            target: target.into(),
        }
    }
}

impl fmt::Display for WorkItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.check, self.target)
    }
}

/// Lifecycle of a WorkItem.
///
/// `Pending -> Admitted -> Running -> {Completed | Failed}`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WorkItemState {
    Pending,
    Admitted,
    Running,
    /// The check returned a verdict, pass or fail.
    Completed,
    /// The check raised an internal error, panicked or timed out.
    Failed,
}

impl WorkItemState {
    pub fn can_transition_to(self, next: WorkItemState) -> bool {
        use WorkItemState::*;
        matches!(
            (self, next),
            (Pending, Admitted) | (Admitted, Running) | (Running, Completed) | (Running, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, WorkItemState::Completed | WorkItemState::Failed)
    }
}

/// Which targets a run should cover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TargetSelection {
    /// Every target in the registry.
    All,
    /// Exactly these schema names.
    Names(BTreeSet<String>),
    /// Every registry target whose name matches this regular expression.
    Pattern(String),
}

impl fmt::Display for TargetSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetSelection::All => write!(f, "all targets"),
            TargetSelection::Names(names) => {
                let names: Vec<&str> = names.iter().map(String::as_str).collect();
                write!(f, "names [{}]", names.join(", "))
            }
            TargetSelection::Pattern(p) => write!(f, "pattern '{p}'"),
        }
    }
}

/// Selected groups plus selected targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRequest {
    pub groups: BTreeSet<String>,
    pub targets: TargetSelection,
}

impl RunRequest {
    pub fn new<I, S>(groups: I, targets: TargetSelection) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            groups: groups.into_iter().map(Into::into).collect(),
            targets,
        }
    }

    /// Run `groups` against every registered target.
    pub fn all_targets<I, S>(groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(groups, TargetSelection::All)
    }
}
