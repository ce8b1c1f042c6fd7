//! Node health probing
//!
//! This module decides which nodes are alive and how fast they answer:
//! - raw TCP connect probes
//! - application probes (HTTP over the node's websocket/grpc path)
//! - verified TLS/SNI probes
//! - a bounded worker pool running one probe per node with a hard timeout

pub mod dial;
pub mod http;
pub mod tcp;
pub mod tls;

pub use dial::Dialer;
pub use http::ApplicationProber;
pub use tcp::TcpProber;
pub use tls::TlsProber;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, SubsiftError};
use crate::models::{NodeDescriptor, ProbeSettings, ProbeStrategy};

/// A single reachability/latency check
///
/// Implementations measure one node and return the latency they observed.
/// Timeouts and the latency ceiling are enforced by [`HealthProber`].
#[async_trait]
pub trait Prober: Send + Sync {
    /// Probe one node
    async fn probe(&self, node: &NodeDescriptor) -> Result<Duration>;

    /// Get the strategy name
    fn strategy_name(&self) -> &'static str;
}

/// Create a prober for the configured strategy
pub fn create_prober(strategy: ProbeStrategy, dialer: Dialer) -> Result<Arc<dyn Prober>> {
    let prober: Arc<dyn Prober> = match strategy {
        ProbeStrategy::Raw => Arc::new(TcpProber::new(dialer)),
        ProbeStrategy::Application => {
            Arc::new(ApplicationProber::new(dialer, tls::verified_connector()?))
        }
        ProbeStrategy::Tls => Arc::new(TlsProber::new(dialer, tls::verified_connector()?)),
    };
    Ok(prober)
}

/// Nodes that passed probing, plus drop counts
#[derive(Debug, Default)]
pub struct ProbeOutcome {
    /// Passing nodes, each carrying its latency. Order is completion order.
    pub healthy: Vec<NodeDescriptor>,
    /// Connect/DNS/TLS/status failures and timeouts
    pub failed: usize,
    /// Reachable but at or above the latency threshold
    pub over_threshold: usize,
}

enum Verdict {
    Healthy(NodeDescriptor),
    OverThreshold,
    Failed,
}

/// Runs one probe per node on a bounded pool of tasks
pub struct HealthProber {
    prober: Arc<dyn Prober>,
    settings: ProbeSettings,
}

impl HealthProber {
    pub fn new(prober: Arc<dyn Prober>, settings: ProbeSettings) -> Self {
        Self { prober, settings }
    }

    pub fn strategy_name(&self) -> &'static str {
        self.prober.strategy_name()
    }

    /// Probe every node; failures are dropped, never retried
    #[instrument(skip_all, fields(strategy = self.strategy_name(), nodes = nodes.len()))]
    pub async fn probe_all(&self, nodes: Vec<NodeDescriptor>) -> ProbeOutcome {
        info!(
            "Probing {} nodes ({} workers, {}ms threshold)",
            nodes.len(),
            self.settings.worker_pool_size,
            self.settings.latency_threshold_ms
        );

        let worker_count = self.settings.worker_pool_size.max(1);
        let probe_timeout = self.settings.timeout();
        let threshold_ms = self.settings.latency_threshold_ms;

        let verdicts = futures::stream::iter(nodes)
            .map(|node| {
                let prober = Arc::clone(&self.prober);
                tokio::spawn(async move {
                    check_node(prober.as_ref(), node, probe_timeout, threshold_ms).await
                })
            })
            .buffer_unordered(worker_count)
            .collect::<Vec<_>>()
            .await;

        let mut outcome = ProbeOutcome::default();
        for verdict in verdicts {
            match verdict {
                Ok(Verdict::Healthy(node)) => outcome.healthy.push(node),
                Ok(Verdict::OverThreshold) => outcome.over_threshold += 1,
                Ok(Verdict::Failed) => outcome.failed += 1,
                Err(e) => {
                    warn!("Probe task aborted: {}", e);
                    outcome.failed += 1;
                }
            }
        }

        info!(
            "Probing complete: {} healthy, {} failed, {} over threshold",
            outcome.healthy.len(),
            outcome.failed,
            outcome.over_threshold
        );

        outcome
    }
}

async fn check_node(
    prober: &dyn Prober,
    node: NodeDescriptor,
    probe_timeout: Duration,
    threshold_ms: u64,
) -> Verdict {
    let result = match timeout(probe_timeout, prober.probe(&node)).await {
        Ok(result) => result,
        Err(_) => Err(SubsiftError::Timeout),
    };

    let latency = match result {
        Ok(latency) => latency,
        Err(e) => {
            debug!(
                category = e.category().as_str(),
                "Node {} failed: {}",
                node.address(),
                e
            );
            return Verdict::Failed;
        }
    };

    let latency_ms = latency.as_secs_f64() * 1000.0;
    if latency_ms >= threshold_ms as f64 {
        debug!(
            "Node {} dropped: {}",
            node.address(),
            SubsiftError::LatencyExceeded {
                latency_ms,
                threshold_ms
            }
        );
        return Verdict::OverThreshold;
    }

    debug!("Node {} healthy: {:.0}ms", node.address(), latency_ms);
    Verdict::Healthy(node.with_latency(latency_ms))
}
