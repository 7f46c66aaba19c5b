//! Tracing setup for healthcheck binaries.
//!
//! Without `RUST_LOG`, the healthcheck crates log at the requested level and
//! everything else (SurrealDB, its transport stack) is held at `warn`, so a
//! `debug` run shows per-item events without drowning them in driver noise.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Crates whose events follow the requested level.
const OWN_TARGETS: [&str; 3] = ["healthcheck_core", "healthcheck_state", "healthcheckd"];

/// Filter directives used when `RUST_LOG` is unset.
pub fn default_directives(level: Level) -> String {
    let level = level.as_str().to_ascii_lowercase();
    let mut directives = vec!["warn".to_string()];
    directives.extend(OWN_TARGETS.iter().map(|t| format!("{t}={level}")));
    directives.join(",")
}

fn filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(level)))
}

/// Install the global subscriber. Only the first call in a process wins.
///
/// `json` switches to newline-delimited JSON; event targets are kept there
/// so aggregated logs can be split by crate.
pub fn init_tracing(json: bool, level: Level) {
    let text = (!json).then(|| fmt::layer().with_target(false));
    let structured = json.then(|| fmt::layer().json().with_current_span(true));

    tracing_subscriber::registry()
        .with(filter(level))
        .with(text)
        .with(structured)
        .try_init()
        .ok();
}
