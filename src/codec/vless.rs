//! `vless://` links
//!
//! Form: `vless://credential@host:port?type=ws&security=tls&path=/x&sni=y#label`.
//! Some publishers base64 the `credential@host:port` part, or the whole payload
//! up to the fragment including its query; every shape parses.

use std::borrow::Cow;
use std::collections::HashMap;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

use super::{decode_base64_text, normalize_host};
use crate::error::{Result, SubsiftError};
use crate::models::{NodeDescriptor, ProtocolFamily, Transport};

/// Characters escaped when writing a label into the fragment
const FRAGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'#')
    .add(b'%');

pub fn parse(link: &str) -> Result<NodeDescriptor> {
    let body = link
        .strip_prefix(ProtocolFamily::Vless.scheme())
        .ok_or_else(|| SubsiftError::MalformedLink("missing vless:// prefix".to_string()))?;

    let (body, fragment) = match body.split_once('#') {
        Some((body, fragment)) => (body, Some(fragment)),
        None => (body, None),
    };
    let (authority, query) = split_payload(body);

    let (credential, host_port) = authority
        .rsplit_once('@')
        .ok_or_else(|| SubsiftError::MalformedLink("vless link is missing '@'".to_string()))?;
    if credential.is_empty() {
        return Err(SubsiftError::MalformedLink(
            "vless link has an empty credential".to_string(),
        ));
    }

    let (host, port) = split_host_port(host_port)?;

    let params: HashMap<String, String> = url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect();
    let param = |key: &str| params.get(key).map(String::as_str).unwrap_or("");

    let transport = Transport::from_field(param("type"));
    let tls_enabled = matches!(
        param("security").to_lowercase().as_str(),
        "tls" | "reality" | "xtls"
    );
    let path = match transport {
        Transport::Grpc if param("path").is_empty() => param("serviceName").to_string(),
        _ => param("path").to_string(),
    };
    let server_name = [param("sni"), param("host")]
        .into_iter()
        .find(|v| !v.is_empty())
        .map(normalize_host);

    let display_label = fragment
        .map(|f| percent_decode_str(f).decode_utf8_lossy().into_owned())
        .unwrap_or_default();

    Ok(NodeDescriptor::new(
        ProtocolFamily::Vless,
        normalize_host(host),
        port,
        transport,
        tls_enabled,
        server_name,
        path,
        display_label,
        link.to_string(),
    ))
}

/// Replace only the `#label` fragment; everything before it is kept byte-for-byte
pub fn with_label(raw: &str, label: &str) -> String {
    let base = raw.split_once('#').map(|(base, _)| base).unwrap_or(raw);
    format!("{}#{}", base, utf8_percent_encode(label, FRAGMENT))
}

/// Split the payload before `#` into authority and query.
///
/// A payload without a literal `@` is tried as base64, first whole and then
/// just the part before `?`. Only a decode containing `@` is used.
fn split_payload(body: &str) -> (Cow<'_, str>, Cow<'_, str>) {
    let (authority, query) = body.split_once('?').unwrap_or((body, ""));
    if authority.contains('@') {
        return (
            Cow::Borrowed(authority.trim_end_matches('/')),
            Cow::Borrowed(query),
        );
    }

    if let Some(decoded) = decode_base64_text(body).filter(|d| d.contains('@')) {
        return split_decoded(&decoded, "");
    }
    if let Some(decoded) = decode_base64_text(authority).filter(|d| d.contains('@')) {
        return split_decoded(&decoded, query);
    }

    (
        Cow::Borrowed(authority.trim_end_matches('/')),
        Cow::Borrowed(query),
    )
}

/// Outer query parameters follow the decoded ones
fn split_decoded(decoded: &str, outer_query: &str) -> (Cow<'static, str>, Cow<'static, str>) {
    let decoded = decoded.trim();
    let (authority, inner_query) = decoded.split_once('?').unwrap_or((decoded, ""));
    let query = match (inner_query.is_empty(), outer_query.is_empty()) {
        (true, _) => outer_query.to_string(),
        (false, true) => inner_query.to_string(),
        (false, false) => format!("{}&{}", inner_query, outer_query),
    };

    (
        Cow::Owned(authority.trim_end_matches('/').to_string()),
        Cow::Owned(query),
    )
}

fn split_host_port(host_port: &str) -> Result<(&str, u16)> {
    let (host, port) = if let Some(rest) = host_port.strip_prefix('[') {
        let (host, rest) = rest.split_once(']').ok_or_else(|| {
            SubsiftError::MalformedLink(format!("unterminated IPv6 host: {}", host_port))
        })?;
        let port = rest.strip_prefix(':').ok_or_else(|| {
            SubsiftError::MalformedLink(format!("missing ':' in {}", host_port))
        })?;
        (host, port)
    } else {
        host_port
            .rsplit_once(':')
            .ok_or_else(|| SubsiftError::MalformedLink(format!("missing ':' in {}", host_port)))?
    };

    if host.is_empty() {
        return Err(SubsiftError::MalformedLink("empty host".to_string()));
    }

    let port = port
        .parse::<u16>()
        .ok()
        .filter(|p| *p != 0)
        .ok_or_else(|| SubsiftError::MalformedLink(format!("invalid port: {}", port)))?;

    Ok((host, port))
}
