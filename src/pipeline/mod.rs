//! Aggregation pipeline
//!
//! raw text → descriptors → deduplicated → probed → ranked/capped → encoded.
//! Each stage consumes the previous stage's output; nothing is kept between runs.

pub mod dedup;
pub mod rank;
pub mod render;

pub use dedup::deduplicate;
pub use rank::rank_and_select;
pub use render::{encode_subscription, remark, EMPTY_SELECTION_NOTICE};

use tracing::{info, instrument, warn};

use crate::codec::{parse_block, ParsedBlock};
use crate::models::{NodeDescriptor, PipelineSettings, RunReport};
use crate::probe::HealthProber;

/// Result of one pipeline run
#[derive(Debug)]
pub struct PipelineOutput {
    /// Base64 subscription text, never empty
    pub artifact: String,
    /// Emitted nodes in output order, relabeled
    pub selected: Vec<NodeDescriptor>,
    pub report: RunReport,
}

pub struct Pipeline {
    settings: PipelineSettings,
    health: HealthProber,
}

impl Pipeline {
    pub fn new(settings: PipelineSettings, health: HealthProber) -> Self {
        Self { settings, health }
    }

    /// Run every stage over the fetched subscription blocks.
    ///
    /// `report` arrives with the source counters filled in; the remaining
    /// counters are filled here.
    #[instrument(skip_all, fields(blocks = blocks.len()))]
    pub async fn run(&self, blocks: &[String], mut report: RunReport) -> PipelineOutput {
        let mut parsed = ParsedBlock::default();
        for block in blocks {
            parsed.merge(parse_block(block));
        }
        report.links_seen = parsed.links_seen;
        report.malformed_links = parsed.malformed;
        info!(
            "Parsed {} nodes from {} links ({} malformed)",
            parsed.nodes.len(),
            parsed.links_seen,
            parsed.malformed
        );

        let unique = deduplicate(parsed.nodes);
        report.unique_nodes = unique.len();
        info!("{} unique nodes after deduplication", unique.len());

        let outcome = self.health.probe_all(unique).await;
        report.probes_passed = outcome.healthy.len();
        report.probes_failed = outcome.failed;
        report.probes_over_threshold = outcome.over_threshold;

        let ranked = rank_and_select(outcome.healthy, self.settings.max_output_nodes);
        let remarked = remark(ranked, &self.settings.display_label);

        let (selected, links): (Vec<_>, Vec<_>) = remarked.into_iter().unzip();
        report.emitted = selected.len();

        if selected.is_empty() {
            warn!("No nodes survived probing; emitting the empty-selection notice");
        } else {
            info!("Selected {} nodes", selected.len());
        }

        PipelineOutput {
            artifact: encode_subscription(&links),
            selected,
            report,
        }
    }
}
