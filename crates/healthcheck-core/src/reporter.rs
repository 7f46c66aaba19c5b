//! Result reporter: the single sink every running check writes through.
//!
//! [`Reporter`] accumulates [`OutcomeRecord`]s and WorkItem results behind one
//! mutex, so concurrent `accept` calls never lose or interleave records.
//! Observers are notified after the lock is released. For one WorkItem the
//! order is always `started`, its outcomes in emission order, then exactly one
//! `finished`.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::warn;

use crate::domain::{OutcomeRecord, Verdict, WorkItemId};
use crate::metrics::METRICS;

/// Terminal result of one WorkItem.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ItemResult {
    /// The check ran and returned `true`.
    Passed,
    /// The check ran and returned `false`.
    Failed,
    /// The check could not run to completion.
    Errored,
}

impl ItemResult {
    pub fn passed(self) -> bool {
        self == ItemResult::Passed
    }
}

/// Live notifications for a presentation layer.
///
/// All methods default to no-ops so observers implement only what they need.
pub trait ReportObserver: Send + Sync {
    fn on_message(&self, _outcome: &OutcomeRecord) {}

    fn on_check_started(&self, _check: &str, _target: &str) {}

    fn on_check_finished(&self, _check: &str, _target: &str, _passed: bool) {}
}

/// A reporter notification, as delivered through [`ChannelObserver`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReportEvent {
    Started { item: WorkItemId },
    Outcome { record: OutcomeRecord },
    Finished { item: WorkItemId, passed: bool },
}

/// Forwards every notification into an unbounded channel.
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<ReportEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ReportEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: ReportEvent) {
        // A dropped receiver just means nobody is watching any more.
        let _ = self.tx.send(event);
    }
}

impl ReportObserver for ChannelObserver {
    fn on_message(&self, outcome: &OutcomeRecord) {
        self.send(ReportEvent::Outcome {
            record: outcome.clone(),
        });
    }

    fn on_check_started(&self, check: &str, target: &str) {
        self.send(ReportEvent::Started {
            item: WorkItemId::new(check, target),
        });
    }

    fn on_check_finished(&self, check: &str, target: &str, passed: bool) {
        self.send(ReportEvent::Finished {
            item: WorkItemId::new(check, target),
            passed,
        });
    }
}

/// Per-check aggregate inside a [`Summary`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckTally {
    pub runs: usize,
    pub passed: usize,
    pub failed: usize,
    pub errored: usize,
    pub problems: usize,
}

/// Aggregate view over everything accepted so far.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// WorkItems that reached a terminal result.
    pub total_checks_run: usize,
    pub total_passed: usize,
    pub total_failed: usize,
    pub total_problems: usize,
    pub total_internal_errors: usize,
    pub per_check: BTreeMap<String, CheckTally>,
}

impl Summary {
    /// WorkItems that failed or could not be checked.
    pub fn flagged(&self) -> usize {
        self.total_failed + self.total_internal_errors
    }
}

#[derive(Default)]
struct ReporterState {
    outcomes: Vec<OutcomeRecord>,
    started: BTreeSet<WorkItemId>,
    results: BTreeMap<WorkItemId, ItemResult>,
}

/// Thread-safe outcome sink shared by all WorkItems of a run.
#[derive(Default)]
pub struct Reporter {
    state: Mutex<ReporterState>,
    observers: RwLock<Vec<Arc<dyn ReportObserver>>>,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ReporterState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn observers(&self) -> Vec<Arc<dyn ReportObserver>> {
        self.observers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Register an observer for all subsequent notifications.
    pub fn subscribe(&self, observer: Arc<dyn ReportObserver>) {
        self.observers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(observer);
    }

    /// Subscribe a [`ChannelObserver`] and return its receiving end.
    pub fn subscribe_channel(&self) -> mpsc::UnboundedReceiver<ReportEvent> {
        let (observer, rx) = ChannelObserver::new();
        self.subscribe(Arc::new(observer));
        rx
    }

    /// Forget everything accepted so far. Observers stay subscribed.
    pub fn reset(&self) {
        *self.state() = ReporterState::default();
    }

    /// Announce that a WorkItem has begun running.
    pub fn check_started(&self, item: &WorkItemId) {
        self.state().started.insert(item.clone());
        for o in self.observers() {
            o.on_check_started(&item.check, &item.target);
        }
    }

    /// Accept one outcome. Safe to call from any number of tasks at once.
    pub fn accept(&self, record: OutcomeRecord) {
        if record.verdict == Verdict::Problem {
            METRICS.inc_problems();
        }
        self.state().outcomes.push(record.clone());
        for o in self.observers() {
            o.on_message(&record);
        }
    }

    /// Record the terminal result of a WorkItem.
    ///
    /// Returns `false` and changes nothing if the item already finished.
    pub fn check_finished(&self, item: &WorkItemId, result: ItemResult) -> bool {
        {
            let mut state = self.state();
            if state.results.contains_key(item) {
                warn!(item = %item, "duplicate finish ignored");
                return false;
            }
            state.results.insert(item.clone(), result);
        }
        for o in self.observers() {
            o.on_check_finished(&item.check, &item.target, result.passed());
        }
        true
    }

    /// Aggregate everything accepted so far. Callable mid-run.
    pub fn summary(&self) -> Summary {
        let state = self.state();
        let mut summary = Summary::default();

        for (item, result) in &state.results {
            let tally = summary.per_check.entry(item.check.clone()).or_default();
            tally.runs += 1;
            summary.total_checks_run += 1;
            match result {
                ItemResult::Passed => {
                    tally.passed += 1;
                    summary.total_passed += 1;
                }
                ItemResult::Failed => {
                    tally.failed += 1;
                    summary.total_failed += 1;
                }
                ItemResult::Errored => {
                    tally.errored += 1;
                    summary.total_internal_errors += 1;
                }
            }
        }

        for record in state
            .outcomes
            .iter()
            .filter(|r| r.verdict == Verdict::Problem)
        {
            summary.total_problems += 1;
            summary
                .per_check
                .entry(record.check.clone())
                .or_default()
                .problems += 1;
        }

        summary
    }

    /// All accepted outcomes in acceptance order.
    pub fn outcomes(&self) -> Vec<OutcomeRecord> {
        self.state().outcomes.clone()
    }

    /// Outcomes emitted against `target`, in acceptance order.
    pub fn outcomes_for_target(&self, target: &str) -> Vec<OutcomeRecord> {
        self.state()
            .outcomes
            .iter()
            .filter(|r| r.target == target)
            .cloned()
            .collect()
    }

    /// Outcomes emitted by one WorkItem, in emission order.
    pub fn outcomes_for(&self, item: &WorkItemId) -> Vec<OutcomeRecord> {
        self.state()
            .outcomes
            .iter()
            .filter(|r| r.check == item.check && r.target == item.target)
            .cloned()
            .collect()
    }

    /// Terminal result of every finished WorkItem.
    pub fn results(&self) -> BTreeMap<WorkItemId, ItemResult> {
        self.state().results.clone()
    }

    pub fn started_count(&self) -> usize {
        self.state().started.len()
    }
}

/// Handle a running check uses to report findings for its own WorkItem.
pub struct CheckContext {
    reporter: Arc<Reporter>,
    item: WorkItemId,
    seq: AtomicU64,
    problems: AtomicU64,
}

impl CheckContext {
    pub fn new(reporter: Arc<Reporter>, item: WorkItemId) -> Self {
        Self {
            reporter,
            item,
            seq: AtomicU64::new(0),
            problems: AtomicU64::new(0),
        }
    }

    pub fn item(&self) -> &WorkItemId {
        &self.item
    }

    fn emit(&self, verdict: Verdict, message: String) {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        self.reporter.accept(OutcomeRecord::new(
            &self.item.check,
            &self.item.target,
            verdict,
            message,
            seq,
        ));
    }

    /// Report a violation found in the target's data.
    pub fn problem(&self, message: impl Into<String>) {
        self.problems.fetch_add(1, Ordering::SeqCst);
        self.emit(Verdict::Problem, message.into());
    }

    /// Report that an invariant holds.
    pub fn correct(&self, message: impl Into<String>) {
        self.emit(Verdict::Correct, message.into());
    }

    pub(crate) fn internal_error(&self, message: impl Into<String>) {
        self.emit(Verdict::InternalError, message.into());
    }

    /// Problems reported through this context so far.
    pub fn problems_reported(&self) -> u64 {
        self.problems.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(check: &str, target: &str) -> WorkItemId {
        WorkItemId::new(check, target)
    }

    #[test]
    fn test_context_sequences_outcomes() {
        let reporter = Arc::new(Reporter::new());
        let ctx = CheckContext::new(Arc::clone(&reporter), item("c1", "t1"));
        ctx.problem("first");
        ctx.correct("second");
        ctx.problem("third");

        let seqs: Vec<u64> = reporter.outcomes().iter().map(|r| r.seq).collect();
        assert_eq!(seqs, vec![0, 1, 2]);
        assert_eq!(ctx.problems_reported(), 2);
    }

    #[test]
    fn test_summary_breakdown() {
        let reporter = Arc::new(Reporter::new());
        let a = item("c1", "t1");
        let b = item("c1", "t2");
        let c = item("c2", "t1");

        let ctx = CheckContext::new(Arc::clone(&reporter), a.clone());
        ctx.problem("bad row");
        ctx.problem("another bad row");
        reporter.check_finished(&a, ItemResult::Failed);
        reporter.check_finished(&b, ItemResult::Passed);
        reporter.check_finished(&c, ItemResult::Errored);

        let summary = reporter.summary();
        assert_eq!(summary.total_checks_run, 3);
        assert_eq!(summary.total_passed, 1);
        assert_eq!(summary.total_failed, 1);
        assert_eq!(summary.total_internal_errors, 1);
        assert_eq!(summary.total_problems, 2);
        assert_eq!(summary.flagged(), 2);
        assert_eq!(
            summary.per_check["c1"],
            CheckTally {
                runs: 2,
                passed: 1,
                failed: 1,
                errored: 0,
                problems: 2
            }
        );
        assert_eq!(summary.per_check["c2"].errored, 1);
    }

    #[test]
    fn test_finish_is_recorded_once() {
        let reporter = Reporter::new();
        let a = item("c1", "t1");
        assert!(reporter.check_finished(&a, ItemResult::Passed));
        assert!(!reporter.check_finished(&a, ItemResult::Failed));
        assert_eq!(reporter.results()[&a], ItemResult::Passed);
    }

    #[tokio::test]
    async fn test_reset_clears_state_and_keeps_observers() {
        let reporter = Arc::new(Reporter::new());
        let mut rx = reporter.subscribe_channel();
        let a = item("c1", "t1");

        reporter.check_started(&a);
        CheckContext::new(Arc::clone(&reporter), a.clone()).problem("p");
        reporter.check_finished(&a, ItemResult::Failed);
        reporter.reset();

        assert_eq!(reporter.summary(), Summary::default());
        assert!(reporter.outcomes().is_empty());
        assert_eq!(reporter.started_count(), 0);

        while rx.try_recv().is_ok() {}
        assert!(reporter.check_finished(&a, ItemResult::Passed));
        assert_eq!(
            rx.recv().await,
            Some(ReportEvent::Finished {
                item: a,
                passed: true
            })
        );
    }

    #[test]
    fn test_empty_summary() {
        assert_eq!(Reporter::new().summary(), Summary::default());
    }

    #[tokio::test]
    async fn test_channel_observer_order() {
        let reporter = Arc::new(Reporter::new());
        let mut rx = reporter.subscribe_channel();
        let a = item("c1", "t1");

        reporter.check_started(&a);
        let ctx = CheckContext::new(Arc::clone(&reporter), a.clone());
        ctx.problem("p");
        reporter.check_finished(&a, ItemResult::Failed);

        assert_eq!(rx.recv().await, Some(ReportEvent::Started { item: a.clone() }));
        assert!(matches!(rx.recv().await, Some(ReportEvent::Outcome { record }) if record.message == "p"));
        assert_eq!(
            rx.recv().await,
            Some(ReportEvent::Finished {
                item: a,
                passed: false
            })
        );
    }
}
