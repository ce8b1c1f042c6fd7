use std::collections::HashMap;

use crate::models::NodeDescriptor;

/// Keep one node per `host:port`.
///
/// The first node seen for a key wins, unless a later one carries a priority
/// transport (websocket/grpc) and the kept one doesn't. A replacement takes
/// over the original's position. The lookup table lives only for this call.
pub fn deduplicate(nodes: Vec<NodeDescriptor>) -> Vec<NodeDescriptor> {
    let mut kept: Vec<NodeDescriptor> = Vec::with_capacity(nodes.len());
    let mut index: HashMap<(String, u16), usize> = HashMap::with_capacity(nodes.len());

    for node in nodes {
        match index.get(&node.identity_key()) {
            Some(&slot) => {
                if node.transport.is_priority() && !kept[slot].transport.is_priority() {
                    kept[slot] = node;
                }
            }
            None => {
                index.insert(node.identity_key(), kept.len());
                kept.push(node);
            }
        }
    }

    kept
}
