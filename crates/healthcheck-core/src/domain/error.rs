//! Domain-level error taxonomy for healthcheck runs.

use healthcheck_state::StateError;
use serde::{Deserialize, Serialize};

/// Errors raised from inside a check's `run`.
///
/// Any of these turns the WorkItem into an `internal_error` outcome; they
/// never describe the data under test.
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error("storage error: {0}")]
    Storage(#[from] StateError),

    #[error("check timed out after {0:?}")]
    TimedOut(std::time::Duration),

    #[error("check panicked: {0}")]
    Panicked(String),

    #[error("{0}")]
    Other(String),
}

/// Healthcheck engine errors.
///
/// Only configuration problems and failures to build the registry surface
/// here; per-WorkItem failures are recovered into outcomes.
#[derive(Debug, thiserror::Error)]
pub enum HealthcheckError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid pattern '{pattern}': {detail}")]
    InvalidPattern { pattern: String, detail: String },

    #[error("registry could not be built: {0}")]
    Registry(String),

    #[error("check already registered: {0}")]
    DuplicateCheck(String),

    #[error("storage error: {0}")]
    Storage(#[from] StateError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for healthcheck engine operations.
pub type Result<T> = std::result::Result<T, HealthcheckError>;

/// A problem with the run request itself, found while planning.
///
/// Issues are reported, not raised: the run proceeds with whatever work
/// remains, possibly none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConfigurationIssue {
    /// The target selection matched nothing in the registry.
    NoTargets { selection: String },
    /// No registered check belongs to any requested group.
    NoChecks { groups: Vec<String> },
    /// A target was named explicitly but is not in the registry.
    UnknownTarget { name: String },
    /// Checks and targets exist but no pair is applicable.
    EmptyWorkSet,
}

impl std::fmt::Display for ConfigurationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigurationIssue::NoTargets { selection } => {
                write!(f, "no targets matched {selection}")
            }
            ConfigurationIssue::NoChecks { groups } => {
                write!(f, "no checks in groups [{}]", groups.join(", "))
            }
            ConfigurationIssue::UnknownTarget { name } => {
                write!(f, "target {name} is not in the registry")
            }
            ConfigurationIssue::EmptyWorkSet => write!(f, "no applicable check/target pairs"),
        }
    }
}
