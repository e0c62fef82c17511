//! In-process registry backend for tests and single-process simulation.
//!
//! Multiple agents sharing one `InMemoryRegistry` behind an `Arc` see each
//! other's writes immediately, which makes it a convenient stand-in for the
//! eventually-consistent shared store in integration tests.

use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::{NodeRecord, NodeRegistry, RegistryError};

#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    nodes: RwLock<BTreeMap<String, NodeRecord>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a node record
    pub async fn register(&self, record: NodeRecord) {
        self.nodes.write().await.insert(record.name.clone(), record);
    }

    /// Remove a node from the cluster
    pub async fn remove(&self, name: &str) {
        self.nodes.write().await.remove(name);
    }

    /// Fetch a single record, mainly useful for test assertions
    pub async fn node(&self, name: &str) -> Option<NodeRecord> {
        self.nodes.read().await.get(name).cloned()
    }
}

#[async_trait]
impl NodeRegistry for InMemoryRegistry {
    async fn list_nodes(&self) -> Result<Vec<NodeRecord>, RegistryError> {
        Ok(self.nodes.read().await.values().cloned().collect())
    }

    async fn get_annotation(
        &self,
        node: &str,
        key: &str,
    ) -> Result<Option<String>, RegistryError> {
        let nodes = self.nodes.read().await;
        let record = nodes.get(node).ok_or_else(|| RegistryError::NodeNotFound {
            name: node.to_string(),
        })?;
        Ok(record.annotations.get(key).cloned())
    }

    async fn set_annotations(
        &self,
        node: &str,
        annotations: BTreeMap<String, String>,
    ) -> Result<(), RegistryError> {
        let mut nodes = self.nodes.write().await;
        let record = nodes
            .get_mut(node)
            .ok_or_else(|| RegistryError::NodeNotFound {
                name: node.to_string(),
            })?;
        record.annotations.extend(annotations);
        Ok(())
    }

    async fn set_blocking_marker(&self, node: &str, present: bool) -> Result<(), RegistryError> {
        let mut nodes = self.nodes.write().await;
        let record = nodes
            .get_mut(node)
            .ok_or_else(|| RegistryError::NodeNotFound {
                name: node.to_string(),
            })?;
        record.blocked = present;
        Ok(())
    }
}
