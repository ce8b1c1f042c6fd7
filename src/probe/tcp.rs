use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::instrument;

use super::dial::Dialer;
use super::Prober;
use crate::error::Result;
use crate::models::NodeDescriptor;

/// Connect-only probe: latency is the time to establish the TCP connection
pub struct TcpProber {
    dialer: Dialer,
}

impl TcpProber {
    pub fn new(dialer: Dialer) -> Self {
        Self { dialer }
    }

    pub(crate) async fn connect_latency(dialer: &Dialer, node: &NodeDescriptor) -> Result<Duration> {
        let start = Instant::now();
        let stream = dialer.connect(&node.host, node.port).await?;
        let elapsed = start.elapsed();
        drop(stream);
        Ok(elapsed)
    }
}

#[async_trait]
impl Prober for TcpProber {
    #[instrument(skip(self, node), fields(node = %node.address()))]
    async fn probe(&self, node: &NodeDescriptor) -> Result<Duration> {
        Self::connect_latency(&self.dialer, node).await
    }

    fn strategy_name(&self) -> &'static str {
        "raw"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::parse_link;
    use crate::error::SubsiftError;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_tcp_probe_open_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let node = parse_link(&format!("vless://id@127.0.0.1:{}", port)).unwrap();

        let latency = TcpProber::new(Dialer::direct()).probe(&node).await.unwrap();
        assert!(latency < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_tcp_probe_closed_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let node = parse_link(&format!("vless://id@127.0.0.1:{}", port)).unwrap();

        let err = TcpProber::new(Dialer::direct()).probe(&node).await.unwrap_err();
        assert!(matches!(err, SubsiftError::ConnectionFailed(_)));
    }
}
