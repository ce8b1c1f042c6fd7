use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which probe decides whether a node is alive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStrategy {
    /// TCP connect only
    #[default]
    Raw,
    /// HTTP request over the node's websocket/grpc path
    Application,
    /// Verified TLS handshake using the node's SNI
    Tls,
}

impl ProbeStrategy {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "raw" | "tcp" | "connect" => Some(Self::Raw),
            "application" | "app" | "http" => Some(Self::Application),
            "tls" | "sni" | "tls_sni" | "tls-sni" => Some(Self::Tls),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Application => "application",
            Self::Tls => "tls",
        }
    }
}

impl std::fmt::Display for ProbeStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Ranking and output settings for one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Maximum number of nodes in the output list
    pub max_output_nodes: usize,
    /// Label written into every emitted node
    pub display_label: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_output_nodes: 150,
            display_label: "subsift".to_string(),
        }
    }
}

/// Health probe settings for one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeSettings {
    pub strategy: ProbeStrategy,
    /// Nodes at or above this latency are discarded
    pub latency_threshold_ms: u64,
    /// Maximum probes in flight
    pub worker_pool_size: usize,
    /// Hard limit for a single probe, in seconds
    pub timeout: u64,
}

impl ProbeSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout.max(1))
    }
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            strategy: ProbeStrategy::Raw,
            latency_threshold_ms: 400,
            worker_pool_size: 100,
            timeout: 3,
        }
    }
}
