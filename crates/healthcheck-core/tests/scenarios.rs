//! End-to-end runs over in-memory schemas.

use std::sync::Arc;

use async_trait::async_trait;
use healthcheck_core::{
    builtin_catalog, Check, CheckCatalog, CheckContext, CheckDescriptor, CheckError,
    ConfigurationIssue, DatabaseRegistry, DatabaseType, Reporter, RunRequest, Scheduler,
    SchedulerConfig, Summary, Target, TargetSelection, Verdict, WorkItemId,
};
use healthcheck_state::fakes::{MemorySchema, MemorySchemaSource};

/// Reports `problems` problems and passes when there are none.
struct Flagging {
    descriptor: CheckDescriptor,
    problems: usize,
}

impl Flagging {
    fn new(descriptor: CheckDescriptor, problems: usize) -> Arc<dyn Check> {
        Arc::new(Self {
            descriptor,
            problems,
        })
    }
}

#[async_trait]
impl Check for Flagging {
    fn descriptor(&self) -> &CheckDescriptor {
        &self.descriptor
    }

    async fn run(&self, _target: &Target, ctx: &CheckContext) -> Result<bool, CheckError> {
        for i in 0..self.problems {
            ctx.problem(format!("{} problem {i}", self.descriptor.name));
        }
        if self.problems == 0 {
            ctx.correct("ok");
        }
        Ok(self.problems == 0)
    }
}

fn catalog(checks: Vec<Arc<dyn Check>>) -> Arc<CheckCatalog> {
    Arc::new(CheckCatalog::builder().register_all(checks).unwrap().build())
}

async fn registry_of(source: MemorySchemaSource, pattern: &str) -> Arc<DatabaseRegistry> {
    Arc::new(
        DatabaseRegistry::build(Arc::new(source), pattern)
            .await
            .unwrap(),
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn scenario_a_exclusion_filters_work_set() {
    let source = MemorySchemaSource::with_schemas(["corea_core_110_1", "coreb_core_110_1"]);
    let registry = registry_of(source, ".*").await;
    assert!(registry.all().iter().all(|t| t.db_type() == DatabaseType::Core));

    let catalog = catalog(vec![
        Flagging::new(CheckDescriptor::new("c1").in_group("release"), 0),
        Flagging::new(
            CheckDescriptor::new("c2")
                .in_group("release")
                .excluding(DatabaseType::Core),
            0,
        ),
    ]);
    let scheduler = Scheduler::new(
        catalog,
        registry,
        Arc::new(Reporter::new()),
        SchedulerConfig::default().with_max_threads(2),
    )
    .unwrap();

    let request = RunRequest::all_targets(["release"]);
    let mut planned = scheduler.plan(&request).unwrap().ids();
    planned.sort();
    assert_eq!(
        planned,
        vec![
            WorkItemId::new("c1", "corea_core_110_1"),
            WorkItemId::new("c1", "coreb_core_110_1"),
        ]
    );

    let outcome = scheduler.run(&request).await.unwrap();
    let summary = outcome.execution.summary;
    assert_eq!(summary.total_checks_run, 2);
    assert_eq!(summary.per_check["c1"].runs, 2);
    assert!(!summary.per_check.contains_key("c2"));
    assert!(outcome.issues.is_empty());
    assert!(outcome.report.success());
}

#[tokio::test]
async fn scenario_b_problems_accumulate_in_order() {
    let target = "homo_sapiens_core_110_38";
    let registry = registry_of(MemorySchemaSource::with_schemas([target]), ".*").await;
    let checks = (1..=5)
        .map(|i| Flagging::new(CheckDescriptor::new(format!("c{i}")).in_group("release"), 1))
        .collect();
    let scheduler = Scheduler::new(
        catalog(checks),
        registry,
        Arc::new(Reporter::new()),
        SchedulerConfig::default().with_max_threads(1),
    )
    .unwrap();

    let outcome = scheduler
        .run(&RunRequest::all_targets(["release"]))
        .await
        .unwrap();

    let records = scheduler.reporter().outcomes_for_target(target);
    assert_eq!(records.len(), 5);
    assert!(records.iter().all(|r| r.verdict == Verdict::Problem));
    let messages: Vec<&str> = records.iter().map(|r| r.message.as_str()).collect();
    assert_eq!(
        messages,
        vec![
            "c1 problem 0",
            "c2 problem 0",
            "c3 problem 0",
            "c4 problem 0",
            "c5 problem 0"
        ]
    );

    let summary = outcome.execution.summary;
    assert_eq!(summary.total_checks_run, 5);
    assert_eq!(summary.flagged(), 5);
    assert_eq!(summary.total_problems, 5);
    assert_eq!(outcome.report.targets[0].failed_checks.len(), 5);
}

#[tokio::test]
async fn empty_group_selection_is_not_an_error() {
    let registry = registry_of(
        MemorySchemaSource::with_schemas(["homo_sapiens_core_110_38"]),
        ".*",
    )
    .await;
    let scheduler = Scheduler::new(
        catalog(vec![Flagging::new(
            CheckDescriptor::new("c1").in_group("release"),
            1,
        )]),
        registry,
        Arc::new(Reporter::new()),
        SchedulerConfig::default(),
    )
    .unwrap();

    let outcome = scheduler
        .run(&RunRequest::all_targets(Vec::<String>::new()))
        .await
        .unwrap();

    assert_eq!(outcome.execution.summary, Summary::default());
    assert!(outcome.execution.states.is_empty());
    assert_eq!(
        outcome.issues,
        vec![ConfigurationIssue::NoChecks { groups: vec![] }]
    );
    assert!(outcome.report.success());
}

#[tokio::test]
async fn unmatched_pattern_yields_no_targets_issue() {
    let registry = registry_of(
        MemorySchemaSource::with_schemas(["homo_sapiens_core_110_38"]),
        "nothing_.*",
    )
    .await;
    assert!(registry.is_empty());

    let scheduler = Scheduler::new(
        catalog(vec![Flagging::new(
            CheckDescriptor::new("c1").in_group("release"),
            0,
        )]),
        registry,
        Arc::new(Reporter::new()),
        SchedulerConfig::default(),
    )
    .unwrap();
    let outcome = scheduler
        .run(&RunRequest::all_targets(["release"]))
        .await
        .unwrap();

    assert!(matches!(
        outcome.issues.as_slice(),
        [ConfigurationIssue::NoTargets { .. }]
    ));
    assert_eq!(outcome.execution.summary.total_checks_run, 0);
}

#[tokio::test]
async fn unknown_named_target_is_reported() {
    let registry = registry_of(
        MemorySchemaSource::with_schemas(["homo_sapiens_core_110_38"]),
        ".*",
    )
    .await;
    let scheduler = Scheduler::new(
        catalog(vec![Flagging::new(
            CheckDescriptor::new("c1").in_group("release"),
            0,
        )]),
        registry,
        Arc::new(Reporter::new()),
        SchedulerConfig::default(),
    )
    .unwrap();

    let request = RunRequest::new(
        ["release"],
        TargetSelection::Names(
            ["homo_sapiens_core_110_38", "missing_core_1_1"]
                .into_iter()
                .map(String::from)
                .collect(),
        ),
    );
    let plan = scheduler.plan(&request).unwrap();
    assert_eq!(plan.len(), 1);
    assert_eq!(
        plan.issues,
        vec![ConfigurationIssue::UnknownTarget {
            name: "missing_core_1_1".to_string()
        }]
    );
}

#[tokio::test]
async fn invalid_target_pattern_fails_planning() {
    let registry = registry_of(MemorySchemaSource::with_schemas(["a_core_1_1"]), ".*").await;
    let scheduler = Scheduler::new(
        catalog(vec![]),
        registry,
        Arc::new(Reporter::new()),
        SchedulerConfig::default(),
    )
    .unwrap();

    let request = RunRequest::new(["release"], TargetSelection::Pattern("(".to_string()));
    assert!(scheduler.plan(&request).is_err());
}

#[tokio::test]
async fn unreachable_schema_is_never_scheduled() {
    let source = MemorySchemaSource::with_schemas(["homo_sapiens_core_110_38"]);
    source.insert("mus_musculus_core_110_39", MemorySchema::new().unreachable());
    let registry = registry_of(source, ".*").await;
    assert_eq!(registry.len(), 1);
    assert!(registry.get_by_exact_name("mus_musculus_core_110_39").is_none());

    let scheduler = Scheduler::new(
        catalog(vec![Flagging::new(
            CheckDescriptor::new("c1").in_group("release"),
            0,
        )]),
        registry,
        Arc::new(Reporter::new()),
        SchedulerConfig::default(),
    )
    .unwrap();
    let outcome = scheduler
        .run(&RunRequest::all_targets(["release"]))
        .await
        .unwrap();
    assert_eq!(outcome.execution.summary.total_checks_run, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn builtin_checks_over_memory_schemas() {
    let source = MemorySchemaSource::new();
    source.insert("homo_sapiens_core_110_38", MemorySchema::new());
    source.insert(
        "mus_musculus_core_110_39",
        MemorySchema::new().with_count(
            "assembly",
            Some("asm_end < asm_start OR cmp_end < cmp_start"),
            3,
        ),
    );
    source.insert(
        "homo_sapiens_otherfeatures_110_38",
        MemorySchema::new().failing_table("assembly"),
    );
    let registry = registry_of(source, ".*").await;

    let scheduler = Scheduler::new(
        Arc::new(builtin_catalog().unwrap()),
        registry,
        Arc::new(Reporter::new()),
        SchedulerConfig::default(),
    )
    .unwrap();
    let outcome = scheduler
        .run(&RunRequest::all_targets(["post_genebuild"]))
        .await
        .unwrap();

    // translation_start_end skips otherfeatures.
    assert_eq!(outcome.execution.states.len(), 5);

    let report = &outcome.report;
    assert_eq!(report.passed, 3);
    assert_eq!(report.failed, 1);
    assert_eq!(report.errored, 1);

    let mouse = report
        .targets
        .iter()
        .find(|t| t.target == "mus_musculus_core_110_39")
        .unwrap();
    assert_eq!(mouse.failed_checks, vec!["assembly_coordinates"]);

    let other = report
        .targets
        .iter()
        .find(|t| t.target == "homo_sapiens_otherfeatures_110_38")
        .unwrap();
    assert_eq!(other.errored_checks, vec!["assembly_coordinates"]);
    assert!(scheduler
        .reporter()
        .outcomes_for_target("mus_musculus_core_110_39")
        .iter()
        .any(|r| r.message == "3 assembly rows have end < start"));
}
