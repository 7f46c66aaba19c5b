//! Domain models for healthcheck runs.
//!
//! Canonical definitions for the core entities:
//! - `Target`: a schema under test, classified by its name
//! - `CheckDescriptor` / `Check`: a registered unit of validation logic
//! - `OutcomeRecord`: one result emitted during a check
//! - `RunRequest` / `WorkItemState`: what to run and how each unit progresses

pub mod check;
pub mod error;
pub mod outcome;
pub mod target;
pub mod work;

// Re-export main types and errors
pub use check::{Check, CheckDescriptor, CheckExt};
pub use error::{CheckError, ConfigurationIssue, HealthcheckError, Result};
pub use outcome::{OutcomeRecord, Verdict};
pub use target::{DatabaseType, SchemaInfo, Species, Target};
pub use work::{RunRequest, TargetSelection, WorkItemId, WorkItemState};
