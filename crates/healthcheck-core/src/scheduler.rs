//! Bounded-concurrency scheduler.
//!
//! [`Scheduler::plan`] turns a [`RunRequest`] into the applicable
//! (check x target) work set. [`Scheduler::execute`] runs that set under a
//! counting semaphore: a permit is acquired before each WorkItem's task is
//! spawned and dropped when the task ends, so at most `max_threads` items
//! execute at once. A check that errors, panics or times out is recorded as
//! an internal error for its own item and never disturbs its siblings.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::FutureExt;
use tokio::sync::{Mutex as AsyncMutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{instrument, warn, Instrument};
use uuid::Uuid;

use crate::catalog::CheckCatalog;
use crate::domain::{
    Check, CheckError, CheckExt, ConfigurationIssue, HealthcheckError, Result, RunRequest, Target,
    TargetSelection, WorkItemId, WorkItemState,
};
use crate::metrics::METRICS;
use crate::obs::{
    emit_configuration_issue, emit_internal_error, emit_item_finished, emit_item_started,
    emit_run_finished, emit_run_started, run_span,
};
use crate::registry::DatabaseRegistry;
use crate::report::RunReport;
use crate::reporter::{CheckContext, ItemResult, Reporter, Summary};

/// Default ceiling on concurrently running WorkItems.
pub const DEFAULT_MAX_THREADS: usize = 4;

/// Scheduler tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Maximum WorkItems executing at once. Must be at least 1.
    pub max_threads: usize,
    /// Optional per-WorkItem watchdog. `None` lets a check run indefinitely.
    pub check_timeout: Option<Duration>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_threads: DEFAULT_MAX_THREADS,
            check_timeout: None,
        }
    }
}

impl SchedulerConfig {
    pub fn with_max_threads(mut self, max_threads: usize) -> Self {
        self.max_threads = max_threads;
        self
    }

    pub fn with_check_timeout(mut self, timeout: Duration) -> Self {
        self.check_timeout = Some(timeout);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_threads == 0 {
            return Err(HealthcheckError::Configuration(
                "max_threads must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// One (check, target) execution unit.
#[derive(Clone)]
pub struct WorkItem {
    pub check: Arc<dyn Check>,
    pub target: Arc<Target>,
}

impl WorkItem {
    pub fn id(&self) -> WorkItemId {
        WorkItemId::new(self.check.name(), self.target.name())
    }
}

impl fmt::Debug for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WorkItem").field(&self.id()).finish()
    }
}

/// The filtered work set for a run, plus anything odd found while building it.
#[derive(Debug, Default)]
pub struct WorkPlan {
    pub items: Vec<WorkItem>,
    pub issues: Vec<ConfigurationIssue>,
}

impl WorkPlan {
    pub fn ids(&self) -> Vec<WorkItemId> {
        self.items.iter().map(WorkItem::id).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// What `execute` observed.
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub summary: Summary,
    /// Final state of every planned WorkItem.
    pub states: BTreeMap<WorkItemId, WorkItemState>,
    /// Highest number of WorkItems seen running at the same time.
    pub peak_concurrency: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Everything produced by [`Scheduler::run`].
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub issues: Vec<ConfigurationIssue>,
    pub execution: ExecutionReport,
    pub report: RunReport,
}

/// Per-execution bookkeeping for the WorkItem state machine.
#[derive(Default)]
struct Tracker {
    states: Mutex<BTreeMap<WorkItemId, WorkItemState>>,
    running: AtomicUsize,
    peak: AtomicUsize,
}

impl Tracker {
    fn new<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = WorkItemId>,
    {
        let states = ids
            .into_iter()
            .map(|id| (id, WorkItemState::Pending))
            .collect();
        Self {
            states: Mutex::new(states),
            ..Self::default()
        }
    }

    /// Move `id` to `next` if the state machine allows it.
    fn advance(&self, id: &WorkItemId, next: WorkItemState) -> bool {
        let mut states = self.states.lock().unwrap_or_else(|e| e.into_inner());
        match states.get_mut(id) {
            Some(state) if state.can_transition_to(next) => {
                *state = next;
                true
            }
            Some(state) => {
                warn!(item = %id, from = ?state, to = ?next, "illegal work item transition");
                false
            }
            None => false,
        }
    }

    fn enter(&self) {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.running.fetch_sub(1, Ordering::SeqCst);
    }

    fn snapshot(&self) -> BTreeMap<WorkItemId, WorkItemState> {
        self.states
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Run one admitted WorkItem to a terminal result.
async fn run_item(
    item: WorkItem,
    reporter: Arc<Reporter>,
    tracker: Arc<Tracker>,
    timeout: Option<Duration>,
) {
    let id = item.id();
    tracker.advance(&id, WorkItemState::Running);
    tracker.enter();
    reporter.check_started(&id);
    emit_item_started(&id.check, &id.target);

    let ctx = CheckContext::new(Arc::clone(&reporter), id.clone());
    let start = Instant::now();
    let guarded = AssertUnwindSafe(item.check.run(&item.target, &ctx)).catch_unwind();

    let caught = match timeout {
        Some(limit) => match tokio::time::timeout(limit, guarded).await {
            Ok(caught) => caught,
            Err(_) => Ok(Err(CheckError::TimedOut(limit))),
        },
        None => guarded.await,
    };
    let verdict = caught.unwrap_or_else(|payload| {
        Err(CheckError::Panicked(panic_message(payload.as_ref())))
    });

    let result = match verdict {
        Ok(true) => ItemResult::Passed,
        Ok(false) => ItemResult::Failed,
        Err(e) => {
            ctx.internal_error(e.to_string());
            METRICS.inc_internal_errors();
            emit_internal_error(&id.check, &id.target, &e);
            ItemResult::Errored
        }
    };

    tracker.exit();
    let terminal = match result {
        ItemResult::Errored => WorkItemState::Failed,
        _ => WorkItemState::Completed,
    };
    tracker.advance(&id, terminal);
    METRICS.inc_items_run();
    reporter.check_finished(&id, result);
    emit_item_finished(
        &id.check,
        &id.target,
        result.passed(),
        start.elapsed().as_millis() as u64,
    );
}

/// Plans and executes healthcheck runs.
///
/// Runs on one scheduler are serialised: each starts from an empty
/// [`Reporter`], and the reporter is left holding the latest run's results.
pub struct Scheduler {
    catalog: Arc<CheckCatalog>,
    registry: Arc<DatabaseRegistry>,
    reporter: Arc<Reporter>,
    config: SchedulerConfig,
    run_lock: AsyncMutex<()>,
}

impl Scheduler {
    pub fn new(
        catalog: Arc<CheckCatalog>,
        registry: Arc<DatabaseRegistry>,
        reporter: Arc<Reporter>,
        config: SchedulerConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            catalog,
            registry,
            reporter,
            config,
            run_lock: AsyncMutex::new(()),
        })
    }

    pub fn reporter(&self) -> &Arc<Reporter> {
        &self.reporter
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    fn resolve_targets(
        &self,
        selection: &TargetSelection,
        issues: &mut Vec<ConfigurationIssue>,
    ) -> Result<Vec<Arc<Target>>> {
        let targets = match selection {
            TargetSelection::All => self.registry.all(),
            TargetSelection::Names(names) => names
                .iter()
                .filter_map(|name| {
                    let found = self.registry.get_by_exact_name(name);
                    if found.is_none() {
                        issues.push(ConfigurationIssue::UnknownTarget { name: name.clone() });
                    }
                    found
                })
                .collect(),
            TargetSelection::Pattern(pattern) => self.registry.get_by_pattern(pattern)?,
        };
        Ok(targets)
    }

    /// Build the applicable work set for `request`.
    ///
    /// Applicability is decided here, once per pair; nothing outside the
    /// returned plan is ever scheduled. Fails only on an invalid target
    /// pattern.
    #[instrument(skip_all, fields(groups = ?request.groups, targets = %request.targets))]
    pub fn plan(&self, request: &RunRequest) -> Result<WorkPlan> {
        let mut issues = Vec::new();

        let targets = self.resolve_targets(&request.targets, &mut issues)?;
        if targets.is_empty() {
            issues.push(ConfigurationIssue::NoTargets {
                selection: request.targets.to_string(),
            });
        }

        let checks = self.catalog.select_by_groups(&request.groups);
        if checks.is_empty() {
            issues.push(ConfigurationIssue::NoChecks {
                groups: request.groups.iter().cloned().collect(),
            });
        }

        let mut items = Vec::new();
        for check in &checks {
            for target in &targets {
                if CheckCatalog::applies(check.as_ref(), target) {
                    items.push(WorkItem {
                        check: Arc::clone(check),
                        target: Arc::clone(target),
                    });
                }
            }
        }

        if items.is_empty() && !checks.is_empty() && !targets.is_empty() {
            issues.push(ConfigurationIssue::EmptyWorkSet);
        }
        for issue in &issues {
            emit_configuration_issue(issue);
        }

        Ok(WorkPlan { items, issues })
    }

    /// Execute every item in `plan`, returning once all have finished.
    ///
    /// Clears the reporter first; waits for any run already in progress.
    pub async fn execute(&self, plan: WorkPlan) -> ExecutionReport {
        let _run = self.run_lock.lock().await;
        self.execute_exclusive(plan).await
    }

    async fn execute_exclusive(&self, plan: WorkPlan) -> ExecutionReport {
        self.reporter.reset();
        let started_at = Utc::now();
        let tracker = Arc::new(Tracker::new(plan.ids()));
        let gate = Arc::new(Semaphore::new(self.config.max_threads));
        let mut join_set = JoinSet::new();

        for item in plan.items {
            let Ok(permit) = Arc::clone(&gate).acquire_owned().await else {
                warn!("admission gate closed; remaining work items not started");
                break;
            };
            let id = item.id();
            if !tracker.advance(&id, WorkItemState::Admitted) {
                warn!(item = %id, "work item already admitted; skipping duplicate");
                continue;
            }

            let reporter = Arc::clone(&self.reporter);
            let tracker = Arc::clone(&tracker);
            let timeout = self.config.check_timeout;
            join_set.spawn(
                async move {
                    let _permit = permit;
                    run_item(item, reporter, tracker, timeout).await;
                }
                .in_current_span(),
            );

            while let Some(joined) = join_set.try_join_next() {
                if let Err(e) = joined {
                    warn!(error = %e, "work item task aborted");
                }
            }
        }

        while let Some(joined) = join_set.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "work item task aborted");
            }
        }

        ExecutionReport {
            summary: self.reporter.summary(),
            states: tracker.snapshot(),
            peak_concurrency: tracker.peak.load(Ordering::SeqCst),
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// Plan, execute and report a full run.
    pub async fn run(&self, request: &RunRequest) -> Result<RunOutcome> {
        let run_id = Uuid::new_v4();
        self.run_with_id(run_id, request)
            .instrument(run_span(&run_id.to_string()))
            .await
    }

    async fn run_with_id(&self, run_id: Uuid, request: &RunRequest) -> Result<RunOutcome> {
        let plan = self.plan(request)?;
        let _run = self.run_lock.lock().await;
        let issues = plan.issues.clone();
        let planned = plan.ids();

        emit_run_started(&run_id.to_string(), plan.len(), self.config.max_threads);
        let start = Instant::now();
        let execution = self.execute_exclusive(plan).await;

        let report = RunReport::build(
            run_id,
            execution.started_at,
            execution.finished_at,
            &planned,
            &self.reporter.results(),
        );
        emit_run_finished(
            &run_id.to_string(),
            start.elapsed().as_millis() as u64,
            execution.summary.total_checks_run,
            execution.summary.flagged(),
        );
        METRICS.flush();

        Ok(RunOutcome {
            issues,
            execution,
            report,
        })
    }
}
