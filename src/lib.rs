//! Subsift - Proxy Subscription Aggregator
//!
//! Collects `vless://` and `vmess://` node links from many subscription
//! sources and publishes a single ranked subscription.
//!
//! ## Features
//!
//! - Plain and base64-wrapped subscription parsing
//! - Identity-based deduplication preferring websocket/gRPC transports
//! - Concurrent health probing (raw connect, application HTTP, TLS/SNI)
//! - Tier + latency ranking capped to a configured size
//! - Uniform relabeling and lossless re-encoding of each link

pub mod codec;
pub mod config;
pub mod error;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod probe;
pub mod source;

pub use config::Config;
pub use error::{Result, SubsiftError};
pub use pipeline::{Pipeline, PipelineOutput};
