//! Registry trait seam - the cluster object API the agent runs against.
//!
//! Everything the monitoring pipeline needs from the surrounding cluster is
//! expressed here, enabling dependency injection for testing and alternative
//! store backends.

use async_trait::async_trait;
use std::collections::BTreeMap;

use super::{NodeRecord, RegistryError};

/// Node registry and annotation store interface.
///
/// Reads are unsynchronized snapshots; the store is assumed read-after-write
/// consistent from the writer's own perspective only. Cross-agent staleness
/// is tolerated - the monitoring loop self-corrects every cycle.
#[async_trait]
pub trait NodeRegistry: Send + Sync {
    /// List every node currently in the cluster
    async fn list_nodes(&self) -> Result<Vec<NodeRecord>, RegistryError>;

    /// Read one annotation from a node, if present
    async fn get_annotation(
        &self,
        node: &str,
        key: &str,
    ) -> Result<Option<String>, RegistryError>;

    /// Merge the given annotations into a node's annotation set.
    /// Existing keys are overwritten; keys owned by other observers are untouched.
    async fn set_annotations(
        &self,
        node: &str,
        annotations: BTreeMap<String, String>,
    ) -> Result<(), RegistryError>;

    /// Idempotently set or clear the scheduling-blocking marker on a node
    async fn set_blocking_marker(&self, node: &str, present: bool) -> Result<(), RegistryError>;
}
