use tracing::warn;

use crate::codec::{encode_base64, relabel};
use crate::models::NodeDescriptor;

/// Written instead of an empty list so consumers always get a decodable artifact
pub const EMPTY_SELECTION_NOTICE: &str =
    "# No healthy nodes passed the latency check in this run.\n# The list will refresh on the next run.";

/// Overwrite every node's label and re-encode it into its own link family.
///
/// A node whose raw form can no longer be re-encoded is dropped with a warning.
pub fn remark(nodes: Vec<NodeDescriptor>, label: &str) -> Vec<(NodeDescriptor, String)> {
    nodes
        .into_iter()
        .filter_map(|mut node| match relabel(&node, label) {
            Ok(link) => {
                node.display_label = label.to_string();
                Some((node, link))
            }
            Err(e) => {
                warn!("Dropping {} at re-encode: {}", node.address(), e);
                None
            }
        })
        .collect()
}

/// Newline-join the links and base64 the whole text
pub fn encode_subscription<S: AsRef<str>>(links: &[S]) -> String {
    if links.is_empty() {
        return encode_base64(EMPTY_SELECTION_NOTICE);
    }

    let joined = links
        .iter()
        .map(|l| l.as_ref())
        .collect::<Vec<_>>()
        .join("\n");
    encode_base64(&joined)
}
