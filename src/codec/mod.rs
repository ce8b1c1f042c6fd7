//! Link codecs
//!
//! Turns raw subscription text into [`NodeDescriptor`]s and back:
//! - `vless://` links (credential@host:port with query parameters)
//! - `vmess://` links (base64-wrapped JSON record)
//! - whole subscription blocks, plain or base64 wrapped

pub mod block;
pub mod vless;
pub mod vmess;

pub use block::{parse_block, unwrap_block, ParsedBlock, BLOCK_MARKER};

use std::net::Ipv6Addr;

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use base64::Engine;

use crate::error::{Result, SubsiftError};
use crate::models::{NodeDescriptor, ProtocolFamily};

const LENIENT_CONFIG: GeneralPurposeConfig = GeneralPurposeConfig::new()
    .with_decode_padding_mode(DecodePaddingMode::Indifferent)
    .with_decode_allow_trailing_bits(true);

/// Standard alphabet, padding optional
const LENIENT_STANDARD: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT_CONFIG);

/// URL-safe alphabet, padding optional
const LENIENT_URL_SAFE: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT_CONFIG);

/// Decode base64 that may be unpadded, URL-safe, or wrapped across lines
pub fn decode_base64(input: &str) -> Option<Vec<u8>> {
    let compact: String = input.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if compact.is_empty() {
        return None;
    }

    LENIENT_STANDARD
        .decode(&compact)
        .or_else(|_| LENIENT_URL_SAFE.decode(&compact))
        .ok()
}

/// Decode base64 into UTF-8 text
pub fn decode_base64_text(input: &str) -> Option<String> {
    decode_base64(input).and_then(|bytes| String::from_utf8(bytes).ok())
}

/// Padded standard base64, the encoding subscription clients expect
pub fn encode_base64(input: &str) -> String {
    STANDARD.encode(input.as_bytes())
}

/// Normalize a host to its ASCII-compatible form.
///
/// Internationalized names become punycode, IP literals are canonicalized.
/// Anything the IDNA step rejects is returned unchanged.
pub fn normalize_host(host: &str) -> String {
    let trimmed = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);

    if trimmed.contains(':') {
        return match trimmed.parse::<Ipv6Addr>() {
            Ok(ip) => ip.to_string(),
            Err(_) => trimmed.to_string(),
        };
    }

    match url::Host::parse(trimmed) {
        Ok(url::Host::Domain(domain)) => domain,
        Ok(url::Host::Ipv4(ip)) => ip.to_string(),
        Ok(url::Host::Ipv6(ip)) => ip.to_string(),
        Err(_) => trimmed.to_string(),
    }
}

/// Parse a single link of either family
pub fn parse_link(link: &str) -> Result<NodeDescriptor> {
    match ProtocolFamily::detect(link) {
        Some(ProtocolFamily::Vless) => vless::parse(link),
        Some(ProtocolFamily::Vmess) => vmess::parse(link),
        None => Err(SubsiftError::UnsupportedScheme(
            link.split("://").next().unwrap_or_default().to_string(),
        )),
    }
}

/// Re-encode a node's raw form with a new display label
pub fn relabel(node: &NodeDescriptor, label: &str) -> Result<String> {
    match node.protocol_family {
        ProtocolFamily::Vless => Ok(vless::with_label(&node.raw_form, label)),
        ProtocolFamily::Vmess => vmess::with_label(&node.raw_form, label),
    }
}
