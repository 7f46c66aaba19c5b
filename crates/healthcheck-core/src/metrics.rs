//! Global atomic counters for healthcheck observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. at the end of a run).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters with no allocation or locking.
pub struct Metrics {
    items_run: AtomicU64,
    problems: AtomicU64,
    internal_errors: AtomicU64,
    targets_excluded: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            items_run: AtomicU64::new(0),
            problems: AtomicU64::new(0),
            internal_errors: AtomicU64::new(0),
            targets_excluded: AtomicU64::new(0),
        }
    }

    pub fn inc_items_run(&self) {
        self.items_run.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "items_run", "counter incremented");
    }

    pub fn inc_problems(&self) {
        self.problems.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "problems", "counter incremented");
    }

    pub fn inc_internal_errors(&self) {
        self.internal_errors.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "internal_errors", "counter incremented");
    }

    pub fn inc_targets_excluded(&self) {
        self.targets_excluded.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "targets_excluded", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            items_run = self.items_run(),
            problems = self.problems(),
            internal_errors = self.internal_errors(),
            targets_excluded = self.targets_excluded(),
        );
    }

    pub fn items_run(&self) -> u64 {
        self.items_run.load(Ordering::Relaxed)
    }

    pub fn problems(&self) -> u64 {
        self.problems.load(Ordering::Relaxed)
    }

    pub fn internal_errors(&self) -> u64 {
        self.internal_errors.load(Ordering::Relaxed)
    }

    pub fn targets_excluded(&self) -> u64 {
        self.targets_excluded.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.items_run.store(0, Ordering::Relaxed);
        self.problems.store(0, Ordering::Relaxed);
        self.internal_errors.store(0, Ordering::Relaxed);
        self.targets_excluded.store(0, Ordering::Relaxed);
    }
}
