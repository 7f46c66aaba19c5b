//! healthcheckd - run the builtin checks against a SurrealDB namespace
//!
//! Configuration comes entirely from the environment; see
//! `healthcheck_core::config` and `healthcheck_state::SourceConfig`.
//!
//! Exit codes: `0` all checks passed, `1` problems found or checks could not
//! run, `2` the run request was misconfigured.

use std::sync::Arc;

use anyhow::{Context, Result};
use healthcheck_core::{
    builtin_catalog, DatabaseRegistry, ReportFormat, Reporter, RunConfig, RunOutcome, Scheduler,
};
use healthcheck_state::{SchemaSource, SourceConfig, SurrealSchemaSource};
use tracing::{info, warn, Level};

const EXIT_OK: i32 = 0;
const EXIT_FINDINGS: i32 = 1;
const EXIT_MISCONFIGURED: i32 = 2;

fn exit_code(outcome: &RunOutcome) -> i32 {
    if !outcome.issues.is_empty() {
        EXIT_MISCONFIGURED
    } else if outcome.report.success() {
        EXIT_OK
    } else {
        EXIT_FINDINGS
    }
}

async fn run(config: &RunConfig) -> Result<i32> {
    let source_config = SourceConfig::from_env();
    let source = SurrealSchemaSource::connect(source_config.clone())
        .await
        .with_context(|| format!("Failed to connect to {}", source_config.endpoint))?;
    let source: Arc<dyn SchemaSource> = Arc::new(source);

    let registry = DatabaseRegistry::build(source, &config.target_pattern)
        .await
        .context("Failed to build the database registry")?;
    let catalog = builtin_catalog().context("Failed to register builtin checks")?;

    if config.groups.is_empty() {
        let groups: Vec<String> = catalog.groups().into_iter().collect();
        warn!(available = %groups.join(","), "HEALTHCHECK_GROUPS is empty");
    }

    let scheduler = Scheduler::new(
        Arc::new(catalog),
        Arc::new(registry),
        Arc::new(Reporter::new()),
        config.scheduler_config(),
    )?;
    let outcome = scheduler.run(&config.run_request()).await?;

    match config.report_format {
        ReportFormat::Text => print!("{}", outcome.report.render_text()),
        ReportFormat::Json => println!("{}", outcome.report.to_json()?),
    }

    let code = exit_code(&outcome);
    info!(run_id = %outcome.report.run_id, exit_code = code, "healthcheck run complete");
    Ok(code)
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = RunConfig::from_env().context("Invalid healthcheck configuration")?;
    healthcheck_core::init_tracing(config.log_json, Level::INFO);

    let code = run(&config).await?;
    if code != EXIT_OK {
        std::process::exit(code);
    }
    Ok(())
}
