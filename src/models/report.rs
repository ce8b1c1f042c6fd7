use chrono::{DateTime, Utc};
use serde::Serialize;

use super::ProbeStrategy;

/// Counters collected over one run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub sources_total: usize,
    pub sources_failed: usize,
    pub links_seen: usize,
    pub malformed_links: usize,
    pub unique_nodes: usize,
    pub probes_passed: usize,
    pub probes_failed: usize,
    pub probes_over_threshold: usize,
    pub emitted: usize,
    pub probe_strategy: ProbeStrategy,
    pub generated_at: DateTime<Utc>,
}

impl RunReport {
    pub fn new(probe_strategy: ProbeStrategy) -> Self {
        Self {
            sources_total: 0,
            sources_failed: 0,
            links_seen: 0,
            malformed_links: 0,
            unique_nodes: 0,
            probes_passed: 0,
            probes_failed: 0,
            probes_over_threshold: 0,
            emitted: 0,
            probe_strategy,
            generated_at: Utc::now(),
        }
    }

    /// True when nothing survived to the output stage
    pub fn is_empty_selection(&self) -> bool {
        self.emitted == 0
    }

    /// Share of probed nodes that passed, as a percentage
    pub fn pass_rate(&self) -> f64 {
        let probed = self.probes_passed + self.probes_failed + self.probes_over_threshold;
        if probed == 0 {
            0.0
        } else {
            (self.probes_passed as f64 / probed as f64) * 100.0
        }
    }
}
