//! Whole-subscription blocks
//!
//! A fetched subscription is either newline-delimited links or one base64 blob
//! wrapping such a list.

use std::borrow::Cow;

use tracing::debug;

use super::{decode_base64_text, parse_link};
use crate::models::{NodeDescriptor, ProtocolFamily};

/// Literal prefix marking a block as base64 encoded
pub const BLOCK_MARKER: &str = "base64:";

/// Nodes decoded from one block, plus reject counts
#[derive(Debug, Default)]
pub struct ParsedBlock {
    pub nodes: Vec<NodeDescriptor>,
    /// Lines carrying a known link prefix
    pub links_seen: usize,
    /// Known-prefix lines that failed to decode
    pub malformed: usize,
}

impl ParsedBlock {
    /// Fold another block's results into this one, keeping order
    pub fn merge(&mut self, other: ParsedBlock) {
        self.nodes.extend(other.nodes);
        self.links_seen += other.links_seen;
        self.malformed += other.malformed;
    }
}

/// Return the plain-text form of a block.
///
/// Decoding is attempted when the block carries [`BLOCK_MARKER`] or doesn't
/// start with a known link prefix. A failed decode keeps the original text.
pub fn unwrap_block(content: &str) -> Cow<'_, str> {
    let trimmed = content.trim();

    if let Some(rest) = trimmed.strip_prefix(BLOCK_MARKER) {
        return match decode_base64_text(rest) {
            Some(decoded) => Cow::Owned(decoded),
            None => Cow::Borrowed(content),
        };
    }

    if ProtocolFamily::detect(trimmed).is_some() {
        return Cow::Borrowed(content);
    }

    match decode_base64_text(trimmed) {
        Some(decoded) => Cow::Owned(decoded),
        None => Cow::Borrowed(content),
    }
}

/// Decode a block and parse every link line in it.
///
/// Lines without a known prefix are skipped silently; malformed links are
/// counted and dropped.
pub fn parse_block(content: &str) -> ParsedBlock {
    let text = unwrap_block(content);
    let mut parsed = ParsedBlock::default();

    for line in text.lines().map(str::trim) {
        if ProtocolFamily::detect(line).is_none() {
            continue;
        }

        parsed.links_seen += 1;
        match parse_link(line) {
            Ok(node) => parsed.nodes.push(node),
            Err(e) => {
                debug!(
                    category = e.category().as_str(),
                    "Skipping link {:.48}: {}",
                    line,
                    e
                );
                parsed.malformed += 1;
            }
        }
    }

    parsed
}
