//! `vmess://` links
//!
//! The payload is base64 of a JSON object. The record is parsed strictly: a
//! field of the wrong JSON type rejects the whole link.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use super::{decode_base64_text, encode_base64, normalize_host};
use crate::error::{Result, SubsiftError};
use crate::models::{NodeDescriptor, ProtocolFamily, Transport};

#[derive(Debug, Deserialize)]
struct VmessRecord {
    add: String,
    #[serde(deserialize_with = "deserialize_port")]
    port: u16,
    #[serde(default)]
    net: Option<String>,
    #[serde(default)]
    tls: Option<String>,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    sni: Option<String>,
    #[serde(default)]
    host: Option<String>,
    #[serde(default)]
    ps: Option<String>,
}

/// Publishers write the port both as a number and as a string
#[derive(Deserialize)]
#[serde(untagged)]
enum PortField {
    Number(u64),
    Text(String),
}

fn deserialize_port<'de, D>(deserializer: D) -> std::result::Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match PortField::deserialize(deserializer)? {
        PortField::Number(n) => n,
        PortField::Text(s) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| D::Error::custom(format!("non-numeric port: {:?}", s)))?,
    };

    match u16::try_from(value) {
        Ok(port) if port != 0 => Ok(port),
        _ => Err(D::Error::custom(format!("port out of range: {}", value))),
    }
}

pub fn parse(link: &str) -> Result<NodeDescriptor> {
    let text = decode_payload(link)?;
    let record: VmessRecord = serde_json::from_str(&text)
        .map_err(|e| SubsiftError::MalformedLink(format!("vmess record: {}", e)))?;

    if record.add.trim().is_empty() {
        return Err(SubsiftError::MalformedLink(
            "vmess record has an empty host".to_string(),
        ));
    }

    let transport = Transport::from_field(record.net.as_deref().unwrap_or(""));
    let tls_enabled = matches!(
        record.tls.as_deref().map(str::to_lowercase).as_deref(),
        Some("tls") | Some("reality") | Some("xtls")
    );
    let server_name = [record.sni.as_deref(), record.host.as_deref()]
        .into_iter()
        .flatten()
        .find(|v| !v.trim().is_empty())
        .map(normalize_host);

    Ok(NodeDescriptor::new(
        ProtocolFamily::Vmess,
        normalize_host(record.add.trim()),
        record.port,
        transport,
        tls_enabled,
        server_name,
        record.path.unwrap_or_default(),
        record.ps.unwrap_or_default(),
        link.to_string(),
    ))
}

/// Set `ps` inside the decoded record and re-encode the whole record.
///
/// Field order and unknown fields are preserved.
pub fn with_label(raw: &str, label: &str) -> Result<String> {
    let text = decode_payload(raw)?;
    let mut record: Map<String, Value> = serde_json::from_str(&text)
        .map_err(|e| SubsiftError::MalformedLink(format!("vmess record: {}", e)))?;

    record.insert("ps".to_string(), Value::String(label.to_string()));
    let json = serde_json::to_string(&record)?;

    Ok(format!(
        "{}{}",
        ProtocolFamily::Vmess.scheme(),
        encode_base64(&json)
    ))
}

fn decode_payload(link: &str) -> Result<String> {
    let payload = link
        .strip_prefix(ProtocolFamily::Vmess.scheme())
        .ok_or_else(|| SubsiftError::MalformedLink("missing vmess:// prefix".to_string()))?;

    decode_base64_text(payload)
        .ok_or_else(|| SubsiftError::MalformedLink("vmess payload is not base64".to_string()))
}
