//! Blocking-marker reconciliation.
//!
//! Stateless and idempotent: the desired marker state is recomputed from the
//! resolved clique every cycle and written for every node, whatever the
//! previous state was. Write failures are skipped and corrected on the next
//! cycle.

use tracing::{debug, info, warn};

use crate::registry::{NodeRecord, NodeRegistry};

#[derive(Debug, Default)]
pub struct QuarantineEnforcer;

impl QuarantineEnforcer {
    pub fn new() -> Self {
        Self
    }

    /// Reconcile blocking markers against the resolved clique.
    ///
    /// With no clique (`None`) nothing is written at all: during total
    /// disconnection or a resolver cutoff the cluster keeps whatever marker
    /// state it already had rather than quarantining everything.
    pub async fn enforce(
        &self,
        registry: &dyn NodeRegistry,
        nodes: &[NodeRecord],
        clique: Option<&[String]>,
    ) {
        let Some(clique) = clique else {
            info!("No partition decision this cycle, leaving blocking markers untouched");
            return;
        };

        let mut quarantined = 0_usize;
        for node in nodes {
            let blocked = !clique.iter().any(|member| member == &node.name);
            if blocked {
                quarantined += 1;
            }
            if let Err(e) = registry.set_blocking_marker(&node.name, blocked).await {
                warn!(
                    node = %node.name,
                    error = %e,
                    "Failed to reconcile blocking marker, correcting next cycle"
                );
                continue;
            }
            debug!(node = %node.name, blocked, "Reconciled blocking marker");
        }

        info!(
            active = clique.len(),
            quarantined,
            "Quarantine enforcement completed"
        );
    }
}
