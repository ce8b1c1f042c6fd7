use serde::{Deserialize, Serialize};

/// Wire encoding a node link arrived in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolFamily {
    /// `vless://credential@host:port?query#label`
    Vless,
    /// `vmess://<base64 json record>`
    Vmess,
}

impl ProtocolFamily {
    pub fn scheme(&self) -> &'static str {
        match self {
            ProtocolFamily::Vless => "vless://",
            ProtocolFamily::Vmess => "vmess://",
        }
    }

    /// Detect the family from a link's prefix
    pub fn detect(link: &str) -> Option<Self> {
        if link.starts_with(ProtocolFamily::Vless.scheme()) {
            Some(ProtocolFamily::Vless)
        } else if link.starts_with(ProtocolFamily::Vmess.scheme()) {
            Some(ProtocolFamily::Vmess)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolFamily::Vless => "vless",
            ProtocolFamily::Vmess => "vmess",
        }
    }
}

impl std::fmt::Display for ProtocolFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Transport carried by a node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Tcp,
    WebSocket,
    Grpc,
    Other(String),
}

impl Transport {
    /// Parse the transport field of either encoding. Empty means tcp.
    pub fn from_field(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "" | "tcp" | "raw" => Transport::Tcp,
            "ws" | "websocket" => Transport::WebSocket,
            "grpc" | "gun" => Transport::Grpc,
            other => Transport::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Transport::Tcp => "tcp",
            Transport::WebSocket => "ws",
            Transport::Grpc => "grpc",
            Transport::Other(name) => name.as_str(),
        }
    }

    /// Websocket and gRPC transports rank ahead of everything else
    pub fn is_priority(&self) -> bool {
        matches!(self, Transport::WebSocket | Transport::Grpc)
    }

    /// Ranking bucket: 0 for priority transports, 1 otherwise
    pub fn tier(&self) -> u8 {
        if self.is_priority() {
            0
        } else {
            1
        }
    }
}

impl std::fmt::Display for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One parsed proxy endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeDescriptor {
    pub protocol_family: ProtocolFamily,
    pub host: String,
    pub port: u16,
    pub transport: Transport,
    pub tls_enabled: bool,
    /// SNI / Host header override, defaults to `host`
    pub server_name: String,
    pub path: String,
    pub display_label: String,
    /// The link exactly as it was received
    pub raw_form: String,
    latency_ms: Option<f64>,
}

impl NodeDescriptor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        protocol_family: ProtocolFamily,
        host: String,
        port: u16,
        transport: Transport,
        tls_enabled: bool,
        server_name: Option<String>,
        path: String,
        display_label: String,
        raw_form: String,
    ) -> Self {
        let server_name = server_name
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| host.clone());
        Self {
            protocol_family,
            host,
            port,
            transport,
            tls_enabled,
            server_name,
            path,
            display_label,
            raw_form,
            latency_ms: None,
        }
    }

    /// Deduplication key
    pub fn identity_key(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }

    /// `host:port`, with IPv6 hosts bracketed
    pub fn address(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    pub fn tier(&self) -> u8 {
        self.transport.tier()
    }

    pub fn latency_ms(&self) -> Option<f64> {
        self.latency_ms
    }

    /// Attach the measured latency. Only the health prober calls this, once per node.
    pub fn with_latency(mut self, latency_ms: f64) -> Self {
        debug_assert!(self.latency_ms.is_none(), "latency recorded twice");
        self.latency_ms = Some(latency_ms);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(host: &str, transport: Transport) -> NodeDescriptor {
        NodeDescriptor::new(
            ProtocolFamily::Vless,
            host.to_string(),
            443,
            transport,
            false,
            None,
            String::new(),
            String::new(),
            format!("vless://id@{}:443", host),
        )
    }

    #[test]
    fn test_transport_from_field() {
        assert_eq!(Transport::from_field(""), Transport::Tcp);
        assert_eq!(Transport::from_field("WS"), Transport::WebSocket);
        assert_eq!(Transport::from_field("grpc"), Transport::Grpc);
        assert_eq!(
            Transport::from_field("h2"),
            Transport::Other("h2".to_string())
        );
    }

    #[test]
    fn test_transport_tier() {
        assert_eq!(Transport::WebSocket.tier(), 0);
        assert_eq!(Transport::Grpc.tier(), 0);
        assert_eq!(Transport::Tcp.tier(), 1);
        assert_eq!(Transport::Other("kcp".to_string()).tier(), 1);
    }

    #[test]
    fn test_protocol_family_detect() {
        assert_eq!(
            ProtocolFamily::detect("vless://abc"),
            Some(ProtocolFamily::Vless)
        );
        assert_eq!(
            ProtocolFamily::detect("vmess://abc"),
            Some(ProtocolFamily::Vmess)
        );
        assert_eq!(ProtocolFamily::detect("trojan://abc"), None);
    }

    #[test]
    fn test_server_name_defaults_to_host() {
        let n = node("edge.example.com", Transport::Tcp);
        assert_eq!(n.server_name, "edge.example.com");
    }

    #[test]
    fn test_address_brackets_ipv6() {
        assert_eq!(node("2001:db8::1", Transport::Tcp).address(), "[2001:db8::1]:443");
        assert_eq!(node("10.0.0.1", Transport::Tcp).address(), "10.0.0.1:443");
    }

    #[test]
    fn test_with_latency() {
        let n = node("a.example", Transport::Tcp);
        assert_eq!(n.latency_ms(), None);
        let n = n.with_latency(42.5);
        assert_eq!(n.latency_ms(), Some(42.5));
    }
}
