//! Observability tests for healthcheck run lifecycle tracing.

use std::sync::Arc;

use healthcheck_core::obs::{
    emit_configuration_issue, emit_internal_error, emit_item_finished, emit_item_started,
    emit_target_excluded,
};
use healthcheck_core::{
    builtin_catalog, emit_run_finished, emit_run_started, CheckCatalog, ConfigurationIssue, DatabaseRegistry,
    Reporter, RunRequest, RunSpan, Scheduler, SchedulerConfig, METRICS,
};
use healthcheck_state::fakes::{MemorySchema, MemorySchemaSource};
use tracing_test::traced_test;

#[traced_test]
#[test]
fn test_emit_run_started_logs_size() {
    emit_run_started("run-123", 12, 4);
    assert!(logs_contain("run.started"));
    assert!(logs_contain("work_items=12"));
}

#[traced_test]
#[test]
fn test_emit_run_finished_logs_counts() {
    emit_run_finished("run-456", 5000, 42, 3);
    assert!(logs_contain("run.finished"));
    assert!(logs_contain("flagged=3"));
}

#[traced_test]
#[test]
fn test_item_events_are_debug() {
    emit_item_started("assembly_coordinates", "homo_sapiens_core_110_38");
    emit_item_finished("assembly_coordinates", "homo_sapiens_core_110_38", true, 17);
    assert!(logs_contain("item.started"));
    assert!(logs_contain("item.finished"));
}

#[traced_test]
#[test]
fn test_warnings() {
    emit_internal_error("c1", "t1", &"connection reset");
    emit_target_excluded("t2", &"connection refused");
    emit_configuration_issue(&ConfigurationIssue::EmptyWorkSet);
    assert!(logs_contain("item.internal_error"));
    assert!(logs_contain("connection refused"));
    assert!(logs_contain("no applicable check/target pairs"));
}

#[traced_test]
#[test]
fn test_run_span_enter_creates_span() {
    let span = RunSpan::enter("test-span-run");
    tracing::info!("inside span");
    drop(span);
    assert!(logs_contain("test-span-run"));
}

#[traced_test]
#[tokio::test]
async fn test_registry_logs_excluded_target() {
    let source = MemorySchemaSource::with_schemas(["homo_sapiens_core_110_38"]);
    source.insert("broken_core_1_1", MemorySchema::new().unreachable());
    let before = METRICS.targets_excluded();

    let registry = DatabaseRegistry::build(Arc::new(source), ".*")
        .await
        .unwrap();

    assert_eq!(registry.len(), 1);
    assert!(METRICS.targets_excluded() > before);
    assert!(logs_contain("registry.target_excluded"));
    assert!(logs_contain("broken_core_1_1"));
}

#[traced_test]
#[tokio::test]
async fn test_empty_run_warns_and_finishes() {
    let registry = DatabaseRegistry::build(Arc::new(MemorySchemaSource::new()), ".*")
        .await
        .unwrap();
    let scheduler = Scheduler::new(
        Arc::new(CheckCatalog::builder().build()),
        Arc::new(registry),
        Arc::new(Reporter::new()),
        SchedulerConfig::default(),
    )
    .unwrap();

    let outcome = scheduler
        .run(&RunRequest::all_targets(["release"]))
        .await
        .unwrap();

    assert_eq!(outcome.issues.len(), 2);
    assert!(logs_contain("run.configuration_issue"));
    assert!(logs_contain("run.finished"));
}

#[traced_test]
#[tokio::test]
async fn test_run_events_carry_run_id() {
    let source = MemorySchemaSource::with_schemas(["homo_sapiens_core_110_38"]);
    let registry = DatabaseRegistry::build(Arc::new(source), ".*")
        .await
        .unwrap();
    let scheduler = Scheduler::new(
        Arc::new(builtin_catalog().unwrap()),
        Arc::new(registry),
        Arc::new(Reporter::new()),
        SchedulerConfig::default(),
    )
    .unwrap();

    let outcome = scheduler
        .run(&RunRequest::all_targets(["release"]))
        .await
        .unwrap();

    let tag = format!("run_id={}", outcome.report.run_id);
    logs_assert(|lines: &[&str]| {
        let started: Vec<_> = lines.iter().filter(|l| l.contains("item.started")).collect();
        if started.is_empty() {
            return Err("no item.started events".to_string());
        }
        match started.iter().find(|l| !l.contains(&tag)) {
            Some(line) => Err(format!("item event outside the run span: {line}")),
            None => Ok(()),
        }
    });
}
