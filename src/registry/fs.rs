//! File-backed registry for standalone deployments.
//!
//! Each node is one JSON document in a shared directory (typically a network
//! mount all agents can reach). Writers use read-modify-write with no locking;
//! the observer-keyed annotation scheme keeps concurrent agents on disjoint
//! keys, and the rare lost update is overwritten again on the next cycle.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::warn;

use super::{NodeRecord, NodeRegistry, RegistryError};

#[derive(Debug)]
pub struct FileRegistry {
    dir: PathBuf,
}

/// On-disk shape of one node document
#[derive(Debug, Serialize, Deserialize)]
struct StoredRecord {
    #[serde(flatten)]
    record: NodeRecord,
    /// Freshness stamp, refreshed on every write
    updated_at: DateTime<Utc>,
}

fn validate_name(name: &str) -> Result<(), RegistryError> {
    if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(RegistryError::InvalidName {
            name: name.to_string(),
            message: "node names must be non-empty and free of path separators".to_string(),
        });
    }
    Ok(())
}

impl FileRegistry {
    /// Open a registry rooted at `dir`, creating the directory if needed
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, RegistryError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(RegistryError::io)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn node_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    /// Register the local node, preserving annotations and the blocking
    /// marker across agent restarts
    pub async fn register(&self, mut record: NodeRecord) -> Result<(), RegistryError> {
        validate_name(&record.name)?;
        if let Some(existing) = self.read_record(&record.name).await? {
            record.annotations = existing.annotations;
            record.blocked = existing.blocked;
        }
        self.write_record(record).await
    }

    async fn read_record(&self, name: &str) -> Result<Option<NodeRecord>, RegistryError> {
        let path = self.node_path(name);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(RegistryError::io(e)),
        };
        let stored: StoredRecord =
            serde_json::from_slice(&bytes).map_err(|e| RegistryError::MalformedRecord {
                name: name.to_string(),
                message: e.to_string(),
            })?;
        Ok(Some(stored.record))
    }

    async fn write_record(&self, record: NodeRecord) -> Result<(), RegistryError> {
        let path = self.node_path(&record.name);
        let tmp = self.dir.join(format!("{}.json.tmp", record.name));
        let stored = StoredRecord {
            record,
            updated_at: Utc::now(),
        };
        let bytes = serde_json::to_vec_pretty(&stored).map_err(|e| RegistryError::Io {
            message: e.to_string(),
        })?;
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(RegistryError::io)?;
        // Rename so readers never observe a half-written document
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(RegistryError::io)?;
        Ok(())
    }

    async fn require_record(&self, name: &str) -> Result<NodeRecord, RegistryError> {
        validate_name(name)?;
        self.read_record(name)
            .await?
            .ok_or_else(|| RegistryError::NodeNotFound {
                name: name.to_string(),
            })
    }
}

#[async_trait]
impl NodeRegistry for FileRegistry {
    async fn list_nodes(&self) -> Result<Vec<NodeRecord>, RegistryError> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(RegistryError::io)?;
        let mut nodes = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(RegistryError::io)? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match self.read_record(name).await {
                Ok(Some(record)) => nodes.push(record),
                Ok(None) => {}
                Err(e) => {
                    // A corrupt document must not take the whole cycle down
                    warn!(node = name, error = %e, "Skipping unreadable node record");
                }
            }
        }
        nodes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(nodes)
    }

    async fn get_annotation(
        &self,
        node: &str,
        key: &str,
    ) -> Result<Option<String>, RegistryError> {
        let record = self.require_record(node).await?;
        Ok(record.annotations.get(key).cloned())
    }

    async fn set_annotations(
        &self,
        node: &str,
        annotations: BTreeMap<String, String>,
    ) -> Result<(), RegistryError> {
        let mut record = self.require_record(node).await?;
        record.annotations.extend(annotations);
        self.write_record(record).await
    }

    async fn set_blocking_marker(&self, node: &str, present: bool) -> Result<(), RegistryError> {
        let mut record = self.require_record(node).await?;
        record.blocked = present;
        self.write_record(record).await
    }
}
