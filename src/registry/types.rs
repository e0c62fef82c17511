use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metric name for the boolean availability verdict
pub const AVAILABLE_METRIC: &str = "available";
/// Metric name for the raw packet-loss percentage measurement
pub const PACKET_LOSS_METRIC: &str = "packet-loss";
/// Metric name for the raw mean round-trip delay measurement
pub const DELAY_METRIC: &str = "delay";

/// Annotation key for one metric as published by one observer.
/// Write ownership is partitioned by the observer segment: only the node
/// named `observer` ever writes keys carrying its name.
pub fn annotation_key(metric: &str, observer: &str) -> String {
    format!("{metric}-{observer}")
}

/// One addressable cluster member as seen through the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Stable unique name
    pub name: String,
    /// Primary address peers probe to reach this node
    pub address: String,
    /// Generic key-value annotations; reachability observations live here
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    /// Whether the scheduling-blocking marker is present
    #[serde(default)]
    pub blocked: bool,
}

impl NodeRecord {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            annotations: BTreeMap::new(),
            blocked: false,
        }
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations.get(key).map(|v| v.as_str())
    }
}
