//! Run configuration read from the environment.
//!
//! | Variable | Default |
//! |---|---|
//! | `HEALTHCHECK_TARGET_PATTERN` | `.*` |
//! | `HEALTHCHECK_GROUPS` | empty (comma-separated) |
//! | `HEALTHCHECK_MAX_THREADS` | `4` |
//! | `HEALTHCHECK_CHECK_TIMEOUT_SECS` | unset |
//! | `HEALTHCHECK_REPORT_FORMAT` | `text` |
//! | `HEALTHCHECK_LOG_JSON` | `false` |

use std::collections::BTreeSet;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{HealthcheckError, Result, RunRequest};
use crate::scheduler::{SchedulerConfig, DEFAULT_MAX_THREADS};

/// How the final report is printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for ReportFormat {
    type Err = HealthcheckError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            other => Err(HealthcheckError::Configuration(format!(
                "unknown report format '{other}' (expected text or json)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Registry pattern; only matching schemas become targets.
    pub target_pattern: String,
    pub groups: BTreeSet<String>,
    pub max_threads: usize,
    pub check_timeout: Option<Duration>,
    pub report_format: ReportFormat,
    pub log_json: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            target_pattern: ".*".to_string(),
            groups: BTreeSet::new(),
            max_threads: DEFAULT_MAX_THREADS,
            check_timeout: None,
            report_format: ReportFormat::Text,
            log_json: false,
        }
    }
}

impl RunConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`RunConfig::from_env`] with an injectable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(pattern) = lookup("HEALTHCHECK_TARGET_PATTERN") {
            if !pattern.trim().is_empty() {
                config.target_pattern = pattern.trim().to_string();
            }
        }
        if let Some(groups) = lookup("HEALTHCHECK_GROUPS") {
            config.groups = parse_list(&groups);
        }
        if let Some(raw) = lookup("HEALTHCHECK_MAX_THREADS") {
            config.max_threads = parse_number("HEALTHCHECK_MAX_THREADS", &raw)?;
            if config.max_threads == 0 {
                return Err(HealthcheckError::Configuration(
                    "HEALTHCHECK_MAX_THREADS must be >= 1".to_string(),
                ));
            }
        }
        if let Some(raw) = lookup("HEALTHCHECK_CHECK_TIMEOUT_SECS") {
            let secs: u64 = parse_number("HEALTHCHECK_CHECK_TIMEOUT_SECS", &raw)?;
            config.check_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(raw) = lookup("HEALTHCHECK_REPORT_FORMAT") {
            config.report_format = raw.parse()?;
        }
        if let Some(raw) = lookup("HEALTHCHECK_LOG_JSON") {
            config.log_json = parse_bool("HEALTHCHECK_LOG_JSON", &raw)?;
        }

        Ok(config)
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            max_threads: self.max_threads,
            check_timeout: self.check_timeout,
        }
    }

    /// The request to run against a registry already filtered by
    /// `target_pattern`.
    pub fn run_request(&self) -> RunRequest {
        RunRequest::all_targets(self.groups.iter().cloned())
    }
}

fn parse_list(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_number<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim().parse().map_err(|_| {
        HealthcheckError::Configuration(format!("{key} must be a non-negative integer, got '{raw}'"))
    })
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(HealthcheckError::Configuration(format!(
            "{key} must be a boolean, got '{raw}'"
        ))),
    }
}
