//! Socket dialing for probes, direct or through an egress proxy

use std::net::SocketAddr;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{lookup_host, TcpStream};
use tokio_socks::tcp::Socks5Stream;
use tracing::debug;

use crate::config::{EgressProxyConfig, EgressProxyProtocol};
use crate::error::{Result, SubsiftError};

/// Opens TCP connections to nodes
#[derive(Debug, Clone, Default)]
pub struct Dialer {
    egress_proxy: Option<EgressProxyConfig>,
}

impl Dialer {
    pub fn new(egress_proxy: Option<EgressProxyConfig>) -> Self {
        Self { egress_proxy }
    }

    pub fn direct() -> Self {
        Self::default()
    }

    /// Name resolution happens at the egress when one is configured
    pub fn uses_egress(&self) -> bool {
        self.egress_proxy.is_some()
    }

    pub async fn connect(&self, host: &str, port: u16) -> Result<TcpStream> {
        let direct_addr = format_tcp_addr(host, port);

        let Some(egress_proxy) = &self.egress_proxy else {
            return TcpStream::connect((host, port)).await.map_err(|e| {
                SubsiftError::ConnectionFailed(format!("{}: {}", direct_addr, e))
            });
        };

        let proxy_addr = format_tcp_addr(&egress_proxy.host, egress_proxy.port);
        debug!("Dialing {} via egress {}", direct_addr, proxy_addr);

        let result = match egress_proxy.protocol {
            EgressProxyProtocol::Http => {
                connect_via_http_proxy(egress_proxy, &proxy_addr, host, port).await
            }
            EgressProxyProtocol::Socks5 => {
                connect_via_socks5_proxy(egress_proxy, &proxy_addr, host, port).await
            }
        };

        result.map_err(|e| {
            SubsiftError::ConnectionFailed(format!(
                "egress {} -> {}: {}",
                proxy_addr, direct_addr, e
            ))
        })
    }
}

/// Resolve a host, failing if it has no addresses
pub async fn resolve(host: &str, port: u16) -> Result<Vec<SocketAddr>> {
    let addrs: Vec<SocketAddr> = lookup_host((host, port))
        .await
        .map_err(|_| SubsiftError::DnsResolution {
            host: host.to_string(),
        })?
        .collect();

    if addrs.is_empty() {
        return Err(SubsiftError::DnsResolution {
            host: host.to_string(),
        });
    }

    Ok(addrs)
}

async fn connect_via_http_proxy(
    proxy: &EgressProxyConfig,
    proxy_addr: &str,
    target_host: &str,
    target_port: u16,
) -> std::result::Result<TcpStream, anyhow::Error> {
    let mut stream = TcpStream::connect(proxy_addr).await?;

    let authority = format_tcp_addr(target_host, target_port);
    let mut request = format!("CONNECT {} HTTP/1.1\r\nHost: {}\r\n", authority, authority);

    if let Some(username) = &proxy.username {
        let credentials = format!("{}:{}", username, proxy.password.as_deref().unwrap_or(""));
        request.push_str(&format!(
            "Proxy-Authorization: Basic {}\r\n",
            BASE64.encode(credentials.as_bytes())
        ));
    }

    request.push_str("\r\n");
    stream.write_all(request.as_bytes()).await?;

    let mut response = vec![0u8; 1024];
    let n = stream.read(&mut response).await?;
    if n == 0 {
        anyhow::bail!("empty CONNECT response");
    }

    let response_str = String::from_utf8_lossy(&response[..n]);
    let status_line = response_str.lines().next().unwrap_or_default();
    if status_line.split_whitespace().nth(1) != Some("200") {
        anyhow::bail!("CONNECT refused: {}", status_line);
    }

    Ok(stream)
}

async fn connect_via_socks5_proxy(
    proxy: &EgressProxyConfig,
    proxy_addr: &str,
    target_host: &str,
    target_port: u16,
) -> std::result::Result<TcpStream, anyhow::Error> {
    let socket = TcpStream::connect(proxy_addr).await?;

    let stream = match (&proxy.username, &proxy.password) {
        (Some(username), Some(password)) => {
            Socks5Stream::connect_with_password_and_socket(
                socket,
                (target_host, target_port),
                username,
                password,
            )
            .await?
        }
        _ => Socks5Stream::connect_with_socket(socket, (target_host, target_port)).await?,
    };

    Ok(stream.into_inner())
}

fn format_tcp_addr(host: &str, port: u16) -> String {
    if host.contains(':') && !(host.starts_with('[') && host.ends_with(']')) {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}
