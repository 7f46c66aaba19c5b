//! Outcome records emitted while checks run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Verdict carried by a single outcome.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// The check confirmed an invariant holds.
    Correct,
    /// The data violates an invariant the check encodes.
    Problem,
    /// The check could not do its job.
    InternalError,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Verdict::Correct => "correct",
            Verdict::Problem => "problem",
            Verdict::InternalError => "internal_error",
        };
        f.write_str(s)
    }
}

/// One accepted outcome. Never modified after the reporter accepts it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutcomeRecord {
    pub check: String,
    pub target: String,
    pub verdict: Verdict,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// Position within the emitting WorkItem, starting at 0.
    pub seq: u64,
}

impl OutcomeRecord {
    pub fn new(
        check: impl Into<String>,
        target: impl Into<String>,
        verdict: Verdict,
        message: impl Into<String>,
        seq: u64,
    ) -> Self {
        Self {
            check: check.into(),
            target: target.into(),
            verdict,
            message: message.into(),
            timestamp: Utc::now(),
            seq,
        }
    }
}
