//! Structured observability hooks for healthcheck run lifecycle events.
//!
//! This module provides:
//! - The run-scoped tracing span, built by `run_span` and entered through the
//!   `RunSpan` RAII guard or attached to a future with `Instrument`
//! - Emission functions for key lifecycle events: run start/finish, WorkItem
//!   start/finish, internal errors, excluded targets and configuration issues
//!
//! Events are emitted at `info!` level unless they signal trouble, which goes
//! to `warn!`. For JSON output, set `HEALTHCHECK_LOG_JSON=true`.

use tracing::{debug, info, info_span, warn, Span};

/// The span every event of one run is recorded under.
pub fn run_span(run_id: &str) -> Span {
    info_span!("healthcheck.run", run_id = %run_id)
}

/// RAII guard that enters a run-scoped tracing span for the duration of a run.
///
/// # Example
///
/// ```ignore
/// let _span = RunSpan::enter("5f0c...");
/// // Now all tracing calls are automatically associated with run_id = "5f0c..."
/// ```
pub struct RunSpan {
    _span: tracing::span::EnteredSpan,
}

impl RunSpan {
    /// Create and enter a span tagged with the run_id.
    pub fn enter(run_id: &str) -> Self {
        Self {
            _span: run_span(run_id).entered(),
        }
    }
}

/// Emit event: run started with the size of its work set.
pub fn emit_run_started(run_id: &str, work_items: usize, max_threads: usize) {
    info!(
        event = "run.started",
        run_id = %run_id,
        work_items = work_items,
        max_threads = max_threads,
    );
}

/// Emit event: run finished with aggregate counts.
pub fn emit_run_finished(run_id: &str, duration_ms: u64, checks_run: usize, flagged: usize) {
    info!(
        event = "run.finished",
        run_id = %run_id,
        duration_ms = duration_ms,
        checks_run = checks_run,
        flagged = flagged,
    );
}

/// Emit event: a WorkItem was admitted and is about to run.
pub fn emit_item_started(check: &str, target: &str) {
    debug!(event = "item.started", check = %check, target = %target);
}

/// Emit event: a WorkItem reached a terminal result.
pub fn emit_item_finished(check: &str, target: &str, passed: bool, duration_ms: u64) {
    debug!(
        event = "item.finished",
        check = %check,
        target = %target,
        passed = passed,
        duration_ms = duration_ms,
    );
}

/// Emit event: a check broke while running (warning level).
pub fn emit_internal_error(check: &str, target: &str, error: &dyn std::fmt::Display) {
    warn!(event = "item.internal_error", check = %check, target = %target, error = %error);
}

/// Emit event: a schema was left out of the registry (warning level).
pub fn emit_target_excluded(target: &str, error: &dyn std::fmt::Display) {
    warn!(event = "registry.target_excluded", target = %target, error = %error);
}

/// Emit event: the run request has a configuration issue (warning level).
pub fn emit_configuration_issue(issue: &dyn std::fmt::Display) {
    warn!(event = "run.configuration_issue", issue = %issue);
}
