//! Translation boundaries against their exons.

use async_trait::async_trait;

use super::{run_rules, Rule};
use crate::domain::{Check, CheckDescriptor, CheckError, DatabaseType, Target};
use crate::reporter::CheckContext;

pub const START_AFTER_END: &str = "start_exon = end_exon AND seq_start > seq_end";
pub const OVERRUNS_EXON: &str =
    "end_exon.seq_region_end - end_exon.seq_region_start + 1 < seq_end";
pub const START_EXON_PHASE: &str = "start_exon != end_exon AND start_exon.end_phase = -1";
pub const END_EXON_PHASE: &str = "start_exon != end_exon AND end_exon.phase = -1";

const RULES: [Rule; 4] = [
    Rule::new(
        "translation",
        START_AFTER_END,
        "translations have start > end",
        "No translations have start > end",
    ),
    Rule::new(
        "translation",
        OVERRUNS_EXON,
        "translations end beyond the end of their exons",
        "No translations overrun exons",
    ),
    Rule::new(
        "translation",
        START_EXON_PHASE,
        "translations have start exon with a -1 end phase",
        "Start exons for translations have correct end phase",
    ),
    Rule::new(
        "translation",
        END_EXON_PHASE,
        "translations have end exon with -1 phase",
        "End exons for translations have correct phase",
    ),
];

/// Checks translation start/end positions and exon phases.
pub struct TranslationStartEnd {
    descriptor: CheckDescriptor,
}

impl TranslationStartEnd {
    pub fn new() -> Self {
        Self {
            descriptor: CheckDescriptor::new("translation_start_end")
                .in_group("post_genebuild")
                .in_group("pre-compara-handover")
                .in_group("post-compara-handover")
                .excluding(DatabaseType::OtherFeatures)
                .excluding(DatabaseType::RnaSeq)
                .team("genebuild")
                .description(
                    "Check that translations start before they end and stay inside their exons",
                ),
        }
    }
}

impl Default for TranslationStartEnd {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Check for TranslationStartEnd {
    fn descriptor(&self) -> &CheckDescriptor {
        &self.descriptor
    }

    async fn run(&self, target: &Target, ctx: &CheckContext) -> Result<bool, CheckError> {
        run_rules(&RULES, target, ctx).await
    }
}
