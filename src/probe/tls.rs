use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use http::Method;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::crypto::ring;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;
use tracing::{debug, instrument};

use super::dial::Dialer;
use super::http::round_trip;
use super::Prober;
use crate::error::{Result, SubsiftError};
use crate::models::NodeDescriptor;

/// Build a connector that verifies certificates against the webpki roots
pub fn verified_connector() -> Result<TlsConnector> {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let config = ClientConfig::builder_with_provider(Arc::new(ring::default_provider()))
        .with_safe_default_protocol_versions()
        .map_err(|e| SubsiftError::Internal(format!("TLS config: {}", e)))?
        .with_root_certificates(roots)
        .with_no_client_auth();

    Ok(TlsConnector::from(Arc::new(config)))
}

/// Complete a TLS handshake using `server_name` as SNI
pub async fn handshake<S>(
    connector: &TlsConnector,
    server_name: &str,
    stream: S,
) -> Result<TlsStream<S>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let domain = ServerName::try_from(server_name.to_string())
        .map_err(|e| SubsiftError::TlsHandshake(format!("invalid SNI {}: {}", server_name, e)))?;

    connector
        .connect(domain, stream)
        .await
        .map_err(|e| SubsiftError::TlsHandshake(e.to_string()))
}

/// Verified TLS handshake with the node's SNI, then one trivial request
pub struct TlsProber {
    dialer: Dialer,
    connector: TlsConnector,
}

impl TlsProber {
    pub fn new(dialer: Dialer, connector: TlsConnector) -> Self {
        Self { dialer, connector }
    }
}

#[async_trait]
impl Prober for TlsProber {
    #[instrument(skip(self, node), fields(node = %node.address(), sni = %node.server_name))]
    async fn probe(&self, node: &NodeDescriptor) -> Result<Duration> {
        let start = Instant::now();
        let stream = self.dialer.connect(&node.host, node.port).await?;
        let tls = handshake(&self.connector, &node.server_name, stream).await?;
        debug!("TLS handshake with {} done after {:?}", node.server_name, start.elapsed());

        // Any status proves the session carries traffic
        round_trip(tls, Method::HEAD, "/", &node.server_name, false).await?;
        Ok(start.elapsed())
    }

    fn strategy_name(&self) -> &'static str {
        "tls"
    }
}
