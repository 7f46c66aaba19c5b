//! Assembly mapping sanity.

use async_trait::async_trait;
use healthcheck_state::TargetConnection;

use super::{run_rules, Rule};
use crate::domain::{Check, CheckDescriptor, CheckError, Target};
use crate::reporter::CheckContext;

/// Selects seq_regions that end before the furthest assembly row mapped onto them.
pub const SHORTER_THAN_ASSEMBLY: &str = "length < math::max((SELECT VALUE asm_end FROM assembly \
     WHERE asm_seq_region = $parent.id))";

/// Cap on the seq_regions named individually in problem messages.
pub const MAX_REPORTED_REGIONS: usize = 50;

pub const SPAN_MISMATCH: &str = "(asm_end - asm_start + 1) != (cmp_end - cmp_start + 1)";
pub const NON_POSITIVE: &str = "asm_start < 1 OR asm_end < 1 OR cmp_start < 1 OR cmp_end < 1";
pub const END_BEFORE_START: &str = "asm_end < asm_start OR cmp_end < cmp_start";

const RULES: [Rule; 3] = [
    Rule::new(
        "assembly",
        SPAN_MISMATCH,
        "assembly rows have assembled and component spans of different length",
        "Assembled and component spans agree",
    ),
    Rule::new(
        "assembly",
        NON_POSITIVE,
        "assembly rows have start or end coordinates < 1",
        "All assembly coordinates are >= 1",
    ),
    Rule::new(
        "assembly",
        END_BEFORE_START,
        "assembly rows have end < start",
        "No assembly row ends before it starts",
    ),
];

/// Flags seq_regions shorter than their assembly mapping, and assembly rows
/// whose coordinates cannot describe a real mapping.
pub struct AssemblyCoordinates {
    descriptor: CheckDescriptor,
}

impl AssemblyCoordinates {
    pub fn new() -> Self {
        Self {
            descriptor: CheckDescriptor::new("assembly_coordinates")
                .in_group("post_genebuild")
                .in_group("release")
                .in_group("compara-ancestral")
                .team("genebuild")
                .description(
                    "Check that seq_region lengths cover the assembly and that assembly \
                     rows have matching spans and sane coordinates",
                ),
        }
    }
}

impl Default for AssemblyCoordinates {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Check for AssemblyCoordinates {
    fn descriptor(&self) -> &CheckDescriptor {
        &self.descriptor
    }

    async fn run(&self, target: &Target, ctx: &CheckContext) -> Result<bool, CheckError> {
        let conn = target.connection().await?;
        let lengths_ok = check_seq_region_lengths(conn.as_ref(), ctx).await?;
        let rules_ok = run_rules(&RULES, target, ctx).await?;
        Ok(lengths_ok && rules_ok)
    }
}

/// One problem per seq_region shorter than its assembly, else a single correct.
async fn check_seq_region_lengths(
    conn: &dyn TargetConnection,
    ctx: &CheckContext,
) -> Result<bool, CheckError> {
    let short = conn
        .select(
            "seq_region",
            &["name", "coord_system.name"],
            Some(SHORTER_THAN_ASSEMBLY),
            MAX_REPORTED_REGIONS,
        )
        .await?;
    if short.is_empty() {
        ctx.correct("Sequence region lengths are equal or greater in seq_region than in assembly");
        return Ok(true);
    }
    for row in &short {
        let name = row.get("name").map(String::as_str).unwrap_or_default();
        let coord_system = row
            .get("coord_system_name")
            .map(String::as_str)
            .unwrap_or_default();
        ctx.problem(format!(
            "{coord_system} {name} is shorter in seq_region than in assembly"
        ));
    }
    Ok(false)
}
