use crate::models::NodeDescriptor;

/// Order probed nodes by `(tier, latency)` and keep the first `cap`.
///
/// The sort is stable, so equal latencies keep their input order. Nodes without
/// a recorded latency sort last within their tier.
pub fn rank_and_select(mut nodes: Vec<NodeDescriptor>, cap: usize) -> Vec<NodeDescriptor> {
    nodes.sort_by(|a, b| {
        a.tier().cmp(&b.tier()).then_with(|| {
            let a = a.latency_ms().unwrap_or(f64::INFINITY);
            let b = b.latency_ms().unwrap_or(f64::INFINITY);
            a.total_cmp(&b)
        })
    });
    nodes.truncate(cap);
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::parse_link;

    fn probed(host: &str, transport: &str, latency_ms: f64) -> NodeDescriptor {
        parse_link(&format!("vless://id@{}:443?type={}", host, transport))
            .unwrap()
            .with_latency(latency_ms)
    }

    fn hosts(nodes: &[NodeDescriptor]) -> Vec<&str> {
        nodes.iter().map(|n| n.host.as_str()).collect()
    }

    #[test]
    fn test_priority_tier_first_then_latency() {
        let ranked = rank_and_select(
            vec![
                probed("tcp-fast", "tcp", 10.0),
                probed("ws-slow", "ws", 300.0),
                probed("grpc-mid", "grpc", 120.0),
                probed("tcp-mid", "tcp", 90.0),
            ],
            10,
        );
        assert_eq!(
            hosts(&ranked),
            vec!["grpc-mid", "ws-slow", "tcp-fast", "tcp-mid"]
        );
    }

    #[test]
    fn test_latency_ties_keep_input_order() {
        let ranked = rank_and_select(
            vec![
                probed("b", "ws", 50.0),
                probed("a", "ws", 50.0),
                probed("c", "ws", 50.0),
            ],
            10,
        );
        assert_eq!(hosts(&ranked), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_cap_applied() {
        let nodes: Vec<_> = (0..10)
            .map(|i| probed(&format!("h{}", i), "tcp", 100.0 - i as f64))
            .collect();

        let ranked = rank_and_select(nodes.clone(), 3);
        assert_eq!(hosts(&ranked), vec!["h9", "h8", "h7"]);

        assert_eq!(rank_and_select(nodes, 50).len(), 10);
    }

    #[test]
    fn test_adjacent_pairs_ordered() {
        let nodes = vec![
            probed("a", "tcp", 31.0),
            probed("b", "ws", 250.0),
            probed("c", "tcp", 5.0),
            probed("d", "grpc", 12.0),
            probed("e", "ws", 12.0),
        ];
        let ranked = rank_and_select(nodes, 5);
        for pair in ranked.windows(2) {
            let (x, y) = (&pair[0], &pair[1]);
            assert!(
                x.tier() < y.tier()
                    || (x.tier() == y.tier() && x.latency_ms() <= y.latency_ms())
            );
        }
    }
}
