//! Final run report.
//!
//! [`RunReport`] lists, per target, the checks that failed and the checks
//! that could not be run, plus global pass/fail counts. It renders as plain
//! text for operators or as JSON for machines.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Result, WorkItemId};
use crate::reporter::ItemResult;

/// Per-target section of the report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetReport {
    pub target: String,
    pub passed: usize,
    pub failed_checks: Vec<String>,
    pub errored_checks: Vec<String>,
}

impl TargetReport {
    pub fn is_clean(&self) -> bool {
        self.failed_checks.is_empty() && self.errored_checks.is_empty()
    }
}

/// Report for a whole run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub targets: Vec<TargetReport>,
    pub passed: usize,
    pub failed: usize,
    pub errored: usize,
    /// Planned items that never reached a terminal result.
    pub not_run: usize,
}

impl RunReport {
    /// Build the report for the `planned` items from recorded `results`.
    ///
    /// Results for items outside `planned` are ignored.
    pub fn build(
        run_id: Uuid,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        planned: &[WorkItemId],
        results: &BTreeMap<WorkItemId, ItemResult>,
    ) -> Self {
        let mut by_target: BTreeMap<&str, TargetReport> = BTreeMap::new();
        let (mut passed, mut failed, mut errored, mut not_run) = (0, 0, 0, 0);

        for item in planned {
            let entry = by_target
                .entry(item.target.as_str())
                .or_insert_with(|| TargetReport {
                    target: item.target.clone(),
                    ..TargetReport::default()
                });
            match results.get(item) {
                Some(ItemResult::Passed) => {
                    entry.passed += 1;
                    passed += 1;
                }
                Some(ItemResult::Failed) => {
                    entry.failed_checks.push(item.check.clone());
                    failed += 1;
                }
                Some(ItemResult::Errored) => {
                    entry.errored_checks.push(item.check.clone());
                    errored += 1;
                }
                None => not_run += 1,
            }
        }

        let mut targets: Vec<TargetReport> = by_target.into_values().collect();
        for t in &mut targets {
            t.failed_checks.sort();
            t.errored_checks.sort();
        }

        Self {
            run_id,
            started_at,
            finished_at,
            targets,
            passed,
            failed,
            errored,
            not_run,
        }
    }

    /// True when every planned item ran and passed.
    pub fn success(&self) -> bool {
        self.failed == 0 && self.errored == 0 && self.not_run == 0
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Human-readable rendering.
    pub fn render_text(&self) -> String {
        let mut out = format!("Healthcheck run {}\n", self.run_id);

        for t in &self.targets {
            if t.is_clean() {
                out.push_str(&format!("\n{}: all {} checks passed\n", t.target, t.passed));
                continue;
            }
            out.push_str(&format!("\n{}:\n", t.target));
            for check in &t.failed_checks {
                out.push_str(&format!("  FAILED  {check}\n"));
            }
            for check in &t.errored_checks {
                out.push_str(&format!("  ERROR   {check}\n"));
            }
        }

        out.push_str(&format!(
            "\n{} passed, {} failed, {} could not be checked\n",
            self.passed, self.failed, self.errored
        ));
        if self.not_run > 0 {
            out.push_str(&format!("{} never ran\n", self.not_run));
        }
        out
    }
}
