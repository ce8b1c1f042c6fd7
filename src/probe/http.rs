use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{CONNECTION, HOST, UPGRADE, USER_AGENT};
use http::{Method, Request, StatusCode};
use http_body_util::Empty;
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_rustls::TlsConnector;
use tracing::{debug, instrument};

use super::dial::{resolve, Dialer};
use super::tcp::TcpProber;
use super::tls::handshake;
use super::Prober;
use crate::error::{Result, SubsiftError};
use crate::models::{NodeDescriptor, Transport};

const PROBE_USER_AGENT: &str = concat!("subsift/", env!("CARGO_PKG_VERSION"));

/// Fixed handshake key; the probe never completes the upgrade
const WEBSOCKET_KEY: &str = "dGhlIHNhbXBsZSBub25jZQ==";

/// Statuses that count as a live application endpoint
pub fn is_accepted_status(status: StatusCode) -> bool {
    status == StatusCode::SWITCHING_PROTOCOLS || status.is_success() || status.is_redirection()
}

/// Send one HTTP/1.1 request over `io` and return the response status.
///
/// The connection task is torn down before returning.
pub(crate) async fn round_trip<S>(
    io: S,
    method: Method,
    path: &str,
    host: &str,
    websocket_upgrade: bool,
) -> Result<StatusCode>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(io)).await?;
    let conn_task = tokio::spawn(async move {
        if let Err(e) = conn.await {
            debug!("Probe connection closed: {}", e);
        }
    });

    let mut builder = Request::builder()
        .method(method)
        .uri(request_path(path))
        .header(HOST, host)
        .header(USER_AGENT, PROBE_USER_AGENT);
    builder = if websocket_upgrade {
        builder
            .header(CONNECTION, "Upgrade")
            .header(UPGRADE, "websocket")
            .header("Sec-WebSocket-Version", "13")
            .header("Sec-WebSocket-Key", WEBSOCKET_KEY)
    } else {
        builder.header(CONNECTION, "close")
    };

    let request = builder
        .body(Empty::<Bytes>::new())
        .map_err(|e| SubsiftError::MalformedLink(format!("probe request: {}", e)))?;

    let result = sender.send_request(request).await;
    conn_task.abort();

    Ok(result?.status())
}

fn request_path(path: &str) -> String {
    let path = path.trim();
    if path.is_empty() {
        "/".to_string()
    } else if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

/// HTTP check against the node's websocket/grpc endpoint.
///
/// Resolves the host first. Nodes on other transports only get the connect check.
pub struct ApplicationProber {
    dialer: Dialer,
    connector: TlsConnector,
}

impl ApplicationProber {
    pub fn new(dialer: Dialer, connector: TlsConnector) -> Self {
        Self { dialer, connector }
    }
}

#[async_trait]
impl Prober for ApplicationProber {
    #[instrument(skip(self, node), fields(node = %node.address(), transport = %node.transport))]
    async fn probe(&self, node: &NodeDescriptor) -> Result<Duration> {
        if !self.dialer.uses_egress() {
            resolve(&node.host, node.port).await?;
        }

        if !node.transport.is_priority() {
            return TcpProber::connect_latency(&self.dialer, node).await;
        }

        let websocket = node.transport == Transport::WebSocket;
        let start = Instant::now();
        let stream = self.dialer.connect(&node.host, node.port).await?;

        let status = if node.tls_enabled {
            let tls = handshake(&self.connector, &node.server_name, stream).await?;
            round_trip(tls, Method::GET, &node.path, &node.server_name, websocket).await?
        } else {
            round_trip(stream, Method::GET, &node.path, &node.server_name, websocket).await?
        };
        let elapsed = start.elapsed();

        if !is_accepted_status(status) {
            return Err(SubsiftError::UnexpectedStatus {
                status: status.as_u16(),
                target: node.address(),
            });
        }

        Ok(elapsed)
    }

    fn strategy_name(&self) -> &'static str {
        "application"
    }
}
