//! Healthcheck Core Library
//!
//! Orchestration engine for data-integrity checks across many database
//! schemas: a registry of targets classified by name, a catalog of pluggable
//! checks, a bounded-concurrency scheduler and a thread-safe result reporter.

pub mod catalog;
pub mod checks;
pub mod config;
pub mod domain;
pub mod metrics;
pub mod obs;
pub mod registry;
pub mod report;
pub mod reporter;
pub mod scheduler;
pub mod telemetry;

pub use domain::{
    Check, CheckDescriptor, CheckError, CheckExt, ConfigurationIssue, DatabaseType, HealthcheckError,
    OutcomeRecord, Result, RunRequest, SchemaInfo, Species, Target, TargetSelection, Verdict,
    WorkItemId, WorkItemState,
};

pub use catalog::{builtin_catalog, CatalogBuilder, CheckCatalog};
pub use config::{ReportFormat, RunConfig};
pub use registry::DatabaseRegistry;
pub use report::{RunReport, TargetReport};
pub use reporter::{
    ChannelObserver, CheckContext, CheckTally, ItemResult, ReportEvent, ReportObserver, Reporter,
    Summary,
};
pub use scheduler::{
    ExecutionReport, RunOutcome, Scheduler, SchedulerConfig, WorkItem, WorkPlan,
    DEFAULT_MAX_THREADS,
};

pub use healthcheck_state::{SchemaSource, StateError, TargetConnection};

pub use metrics::METRICS;
pub use obs::{emit_run_finished, emit_run_started, run_span, RunSpan};
pub use telemetry::init_tracing;

/// Healthcheck version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
