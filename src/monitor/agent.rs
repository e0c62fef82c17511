//! The per-node monitoring agent.
//!
//! Runs the full pipeline on its own timer, with no coordination between
//! agents beyond the shared store:
//! probe peers -> publish this agent's row -> aggregate all rows ->
//! resolve the largest mutually-reachable set -> reconcile blocking markers.

use anyhow::{Context, Result};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::aggregator::ReachabilityAggregator;
use super::enforcer::QuarantineEnforcer;
use super::publisher::ReachabilityPublisher;
use super::resolver::PartitionResolver;
use crate::config::SentryConfig;
use crate::probe::Prober;
use crate::registry::NodeRegistry;
use crate::telemetry::generate_cycle_id;

/// Result of one monitoring cycle, returned for inspection by the CLI
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    /// Nodes visible in the registry snapshot
    pub node_count: usize,
    /// Peers probed this cycle
    pub probed: usize,
    /// Names allowed to keep running workloads, if a decision was reached
    pub clique: Option<Vec<String>>,
}

pub struct MonitorAgent {
    identity: String,
    registry: Arc<dyn NodeRegistry>,
    prober: Arc<dyn Prober>,
    publisher: ReachabilityPublisher,
    aggregator: ReachabilityAggregator,
    resolver: PartitionResolver,
    enforcer: QuarantineEnforcer,
    probe_concurrency: usize,
    interval: Duration,
    jitter_ms: u64,
    cycle_timeout: Duration,
}

impl MonitorAgent {
    pub fn new(
        identity: impl Into<String>,
        registry: Arc<dyn NodeRegistry>,
        prober: Arc<dyn Prober>,
        config: &SentryConfig,
    ) -> Self {
        let identity = identity.into();
        Self {
            publisher: ReachabilityPublisher::new(identity.clone(), config.thresholds.clone()),
            aggregator: ReachabilityAggregator::new(),
            resolver: PartitionResolver::new(config.monitor.max_expansions),
            enforcer: QuarantineEnforcer::new(),
            probe_concurrency: config.probe.max_concurrent.max(1),
            interval: Duration::from_secs(config.monitor.interval_secs),
            jitter_ms: config.monitor.jitter_ms,
            cycle_timeout: Duration::from_secs(config.monitor.cycle_timeout_secs),
            identity,
            registry,
            prober,
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Run the monitoring loop until the surrounding task is cancelled.
    /// No error inside a cycle is fatal; the loop always reaches the next tick.
    pub async fn run(&self) {
        info!(identity = %self.identity, "Starting partition sentry monitoring loop");
        loop {
            // Desynchronize agents so their store writes do not arrive in lockstep
            let jitter = {
                let mut rng = rand::rng();
                Duration::from_millis(rng.random_range(0..=self.jitter_ms))
            };
            tokio::time::sleep(jitter).await;

            let cycle_id = generate_cycle_id();
            match tokio::time::timeout(self.cycle_timeout, self.run_cycle(&cycle_id, true)).await
            {
                Ok(Ok(outcome)) => {
                    debug!(
                        cycle = %cycle_id,
                        nodes = outcome.node_count,
                        probed = outcome.probed,
                        decided = outcome.clique.is_some(),
                        "Monitoring cycle completed"
                    );
                }
                Ok(Err(e)) => {
                    warn!(cycle = %cycle_id, error = %e, "Monitoring cycle failed, continuing");
                }
                Err(_) => {
                    warn!(
                        cycle = %cycle_id,
                        timeout_secs = self.cycle_timeout.as_secs(),
                        "Monitoring cycle exceeded its deadline, abandoning until next tick"
                    );
                }
            }

            tokio::time::sleep(self.interval).await;
        }
    }

    /// Execute exactly one cycle. With `enforce` false the decision is
    /// computed and returned but no blocking marker is written.
    pub async fn run_cycle(&self, cycle_id: &str, enforce: bool) -> Result<CycleOutcome> {
        let nodes = self
            .registry
            .list_nodes()
            .await
            .context("listing cluster nodes")?;
        if nodes.is_empty() {
            info!(cycle = %cycle_id, "No nodes in registry, nothing to monitor");
            return Ok(CycleOutcome {
                node_count: 0,
                probed: 0,
                clique: None,
            });
        }

        let probed = self.probe_and_publish(&nodes).await;

        // Re-list so this agent's freshly published row is part of the snapshot
        let nodes = self
            .registry
            .list_nodes()
            .await
            .context("listing cluster nodes after publishing")?;
        let graph = self.aggregator.aggregate(&nodes);
        let clique = self.resolver.resolve(&graph);

        if enforce {
            self.enforcer
                .enforce(self.registry.as_ref(), &nodes, clique.as_deref())
                .await;
        }

        Ok(CycleOutcome {
            node_count: nodes.len(),
            probed,
            clique,
        })
    }

    /// Probe every peer with bounded fan-out and publish each verdict as its
    /// probe completes. Returns once every probe has finished (the cycle's
    /// barrier point).
    async fn probe_and_publish(&self, nodes: &[crate::registry::NodeRecord]) -> usize {
        let semaphore = Arc::new(Semaphore::new(self.probe_concurrency));
        let mut probes: JoinSet<()> = JoinSet::new();
        let mut probed = 0_usize;

        for node in nodes.iter().filter(|n| n.name != self.identity) {
            probed += 1;
            let semaphore = Arc::clone(&semaphore);
            let prober = Arc::clone(&self.prober);
            let registry = Arc::clone(&self.registry);
            let publisher = self.publisher.clone();
            let target = node.name.clone();
            let address = node.address.clone();

            probes.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return,
                };
                let report = prober.probe(&address).await;
                publisher.publish(registry.as_ref(), &target, &report).await;
            });
        }

        while let Some(joined) = probes.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "Probe task aborted");
            }
        }
        probed
    }
}
