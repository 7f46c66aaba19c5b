//! Builtin checks.
//!
//! Each builtin is a list of [`Rule`]s: a row count that must be zero for
//! the target to be healthy. Every rule reports exactly one message, a
//! problem when rows match and a correct otherwise.

use std::sync::Arc;

use crate::domain::{Check, CheckError, Target};
use crate::reporter::CheckContext;

mod assembly;
mod translation;

pub use assembly::AssemblyCoordinates;
pub use translation::TranslationStartEnd;

/// A "no rows should match" query against one table.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub table: &'static str,
    pub condition: &'static str,
    /// Appended to the offending row count in the problem message.
    pub problem: &'static str,
    pub correct: &'static str,
}

impl Rule {
    pub const fn new(
        table: &'static str,
        condition: &'static str,
        problem: &'static str,
        correct: &'static str,
    ) -> Self {
        Self {
            table,
            condition,
            problem,
            correct,
        }
    }
}

/// Run every rule against `target`, reporting through `ctx`.
///
/// Returns `Ok(true)` only when all rules found zero rows. A storage error
/// aborts the remaining rules.
pub async fn run_rules(
    rules: &[Rule],
    target: &Target,
    ctx: &CheckContext,
) -> Result<bool, CheckError> {
    let conn = target.connection().await?;
    let mut healthy = true;
    for rule in rules {
        let rows = conn.count(rule.table, Some(rule.condition)).await?;
        if rows > 0 {
            healthy = false;
            ctx.problem(format!("{rows} {}", rule.problem));
        } else {
            ctx.correct(rule.correct);
        }
    }
    Ok(healthy)
}

/// All builtin checks, in registration order.
pub fn builtin() -> Vec<Arc<dyn Check>> {
    vec![
        Arc::new(AssemblyCoordinates::new()),
        Arc::new(TranslationStartEnd::new()),
    ]
}
