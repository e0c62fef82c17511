//! Reachability matrix reconstruction from published annotations.
//!
//! Each node publishes its own observation row onto its peers' annotation
//! sets; any agent can rebuild the full observer x target matrix from one
//! node-list snapshot, with no rendezvous between agents.

use tracing::debug;

use super::graph::ReachabilityGraph;
use crate::registry::{annotation_key, NodeRecord, AVAILABLE_METRIC};

#[derive(Debug, Default)]
pub struct ReachabilityAggregator;

impl ReachabilityAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Build the directed matrix for one node-list snapshot.
    ///
    /// For each ordered pair `(i, j)` the edge exists iff node `j` carries the
    /// annotation `available-<name_i>` with the value `true`. A missing or
    /// malformed value reads as unavailable: a node that has never published
    /// stays biased toward quarantine until it reports in.
    pub fn aggregate(&self, nodes: &[NodeRecord]) -> ReachabilityGraph {
        let mut graph =
            ReachabilityGraph::new(nodes.iter().map(|n| n.name.clone()).collect());
        let observers = graph.names().to_vec();

        for target in nodes {
            let Some(target_idx) = graph.index_of(&target.name) else {
                continue;
            };
            for (observer_idx, observer_name) in observers.iter().enumerate() {
                if observer_idx == target_idx {
                    continue;
                }
                if observed_available(target, observer_name) {
                    graph.set_edge(observer_idx, target_idx);
                }
            }
        }

        graph
    }
}

fn observed_available(target: &NodeRecord, observer: &str) -> bool {
    match target.annotation(&annotation_key(AVAILABLE_METRIC, observer)) {
        None => false,
        Some(raw) => match raw.trim().parse::<bool>() {
            Ok(value) => value,
            Err(_) => {
                debug!(
                    node = %target.name,
                    observer,
                    value = raw,
                    "Malformed availability annotation, treating as unavailable"
                );
                false
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::annotation_key;

    fn node_with(name: &str, observations: &[(&str, &str)]) -> NodeRecord {
        let mut record = NodeRecord::new(name, format!("10.0.0.{}", name.len()));
        for (observer, value) in observations {
            record.annotations.insert(
                annotation_key(AVAILABLE_METRIC, observer),
                value.to_string(),
            );
        }
        record
    }

    #[test]
    fn edges_follow_published_verdicts() {
        let nodes = vec![
            node_with("node-a", &[("node-b", "true")]),
            node_with("node-b", &[("node-a", "true")]),
        ];
        let graph = ReachabilityAggregator::new().aggregate(&nodes);
        assert!(graph.mutual(0, 1));
    }

    #[test]
    fn missing_annotations_read_as_unavailable() {
        let nodes = vec![
            node_with("node-a", &[]),
            node_with("node-b", &[("node-a", "true")]),
        ];
        let graph = ReachabilityAggregator::new().aggregate(&nodes);
        // a -> b exists, b -> a was never published
        assert!(graph.edge(0, 1));
        assert!(!graph.edge(1, 0));
        assert!(!graph.mutual(0, 1));
    }

    #[test]
    fn malformed_annotations_read_as_unavailable() {
        let nodes = vec![
            node_with("node-a", &[("node-b", "yes"), ("node-c", "TRUE")]),
            node_with("node-b", &[("node-a", "true")]),
            node_with("node-c", &[("node-a", "true")]),
        ];
        let graph = ReachabilityAggregator::new().aggregate(&nodes);
        // "yes" and "TRUE" both fail bool parsing and must not panic
        assert!(!graph.edge(1, 0));
        assert!(!graph.edge(2, 0));
    }

    #[test]
    fn indices_are_stable_across_listing_orders() {
        let forward = vec![
            node_with("node-a", &[("node-b", "true")]),
            node_with("node-b", &[("node-a", "true")]),
        ];
        let reversed: Vec<NodeRecord> = forward.iter().rev().cloned().collect();

        let g1 = ReachabilityAggregator::new().aggregate(&forward);
        let g2 = ReachabilityAggregator::new().aggregate(&reversed);
        assert_eq!(g1.names(), g2.names());
        assert_eq!(g1.mutual(0, 1), g2.mutual(0, 1));
    }
}
