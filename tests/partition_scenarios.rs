//! End-to-end partition scenarios: several simulated agents sharing one
//! in-memory store, each running its own monitoring cycles.
//! Testing library/framework: Rust built-in test framework with Tokio async
//! runtime (#[tokio::test]).

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use partition_sentry::config::SentryConfig;
use partition_sentry::monitor::MonitorAgent;
use partition_sentry::probe::{ProbeReport, Prober};
use partition_sentry::registry::{InMemoryRegistry, NodeRecord, NodeRegistry};

const HEALTHY: ProbeReport = ProbeReport {
    loss_percent: 0.0,
    mean_delay_ms: 1.0,
};

/// Prober returning scripted reports per target address; unknown targets
/// resolve to total loss, like a live probe against a dead address
struct ScriptedProber {
    reports: RwLock<HashMap<String, ProbeReport>>,
}

impl ScriptedProber {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            reports: RwLock::new(HashMap::new()),
        })
    }

    fn set(&self, address: &str, report: ProbeReport) {
        self.reports
            .write()
            .unwrap()
            .insert(address.to_string(), report);
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, address: &str) -> ProbeReport {
        self.reports
            .read()
            .unwrap()
            .get(address)
            .copied()
            .unwrap_or(ProbeReport::WORST)
    }
}

fn test_config() -> SentryConfig {
    let mut config = SentryConfig::default();
    config.monitor.jitter_ms = 0;
    config
}

fn address_of(name: &str) -> String {
    format!("192.0.2.{}", (name.as_bytes()[name.len() - 1] - b'a') + 1)
}

/// One simulated node: its agent plus the prober scripting its view of the net
struct SimNode {
    name: String,
    agent: MonitorAgent,
    prober: Arc<ScriptedProber>,
}

struct SimCluster {
    registry: Arc<InMemoryRegistry>,
    nodes: Vec<SimNode>,
}

impl SimCluster {
    async fn new(names: &[&str]) -> Self {
        let registry = Arc::new(InMemoryRegistry::new());
        let mut nodes = Vec::new();
        for name in names {
            registry
                .register(NodeRecord::new(*name, address_of(name)))
                .await;
        }
        for name in names {
            nodes.push(Self::build_node(&registry, name));
        }
        Self { registry, nodes }
    }

    fn build_node(registry: &Arc<InMemoryRegistry>, name: &str) -> SimNode {
        let prober = ScriptedProber::new();
        let agent = MonitorAgent::new(
            name,
            Arc::clone(registry) as Arc<dyn NodeRegistry>,
            Arc::clone(&prober) as Arc<dyn Prober>,
            &test_config(),
        );
        SimNode {
            name: name.to_string(),
            agent,
            prober,
        }
    }

    /// Add a node to the registry without giving it a running agent yet
    async fn add_silent_node(&self, name: &str) {
        self.registry
            .register(NodeRecord::new(name, address_of(name)))
            .await;
    }

    /// Start an agent for a node that was previously silent
    fn start_agent(&mut self, name: &str) {
        self.nodes.push(Self::build_node(&self.registry, name));
    }

    fn prober_of(&self, name: &str) -> &Arc<ScriptedProber> {
        &self
            .nodes
            .iter()
            .find(|n| n.name == name)
            .expect("unknown sim node")
            .prober
    }

    /// Script a healthy link from every running agent toward `target`
    fn all_see_healthy(&self, target: &str) {
        for node in &self.nodes {
            node.prober.set(&address_of(target), HEALTHY);
        }
    }

    /// Script total loss from every running agent toward `target`
    fn all_see_dead(&self, target: &str) {
        for node in &self.nodes {
            node.prober.set(&address_of(target), ProbeReport::WORST);
        }
    }

    /// Run one cycle on every agent, in name order
    async fn run_pass(&self) {
        for node in &self.nodes {
            node.agent
                .run_cycle("sim-pass", true)
                .await
                .expect("cycle failed");
        }
    }

    async fn blocked(&self, name: &str) -> bool {
        self.registry.node(name).await.expect("missing node").blocked
    }
}

/// Pairwise-healthy cluster where every agent sees every peer
async fn healthy_cluster(names: &[&str]) -> SimCluster {
    let cluster = SimCluster::new(names).await;
    for name in names {
        cluster.all_see_healthy(name);
    }
    cluster
}

#[tokio::test]
async fn healthy_cluster_keeps_every_node_active() {
    let cluster = healthy_cluster(&["node-a", "node-b", "node-c"]).await;

    cluster.run_pass().await;
    cluster.run_pass().await;

    for name in ["node-a", "node-b", "node-c"] {
        assert!(!cluster.blocked(name).await, "{name} should stay active");
    }
}

#[tokio::test]
async fn isolated_node_is_quarantined_by_the_majority() {
    let cluster = healthy_cluster(&["node-a", "node-b", "node-c", "node-d"]).await;

    // Cut node-d off in both directions
    cluster.all_see_dead("node-d");
    for peer in ["node-a", "node-b", "node-c"] {
        cluster
            .prober_of("node-d")
            .set(&address_of(peer), ProbeReport::WORST);
    }

    cluster.run_pass().await;
    cluster.run_pass().await;

    assert!(cluster.blocked("node-d").await);
    for name in ["node-a", "node-b", "node-c"] {
        assert!(!cluster.blocked(name).await, "{name} should stay active");
    }
}

#[tokio::test]
async fn recovered_node_rejoins_without_restart() {
    let cluster = healthy_cluster(&["node-a", "node-b", "node-c", "node-d"]).await;

    cluster.all_see_dead("node-d");
    for peer in ["node-a", "node-b", "node-c"] {
        cluster
            .prober_of("node-d")
            .set(&address_of(peer), ProbeReport::WORST);
    }
    cluster.run_pass().await;
    cluster.run_pass().await;
    assert!(cluster.blocked("node-d").await);

    // The partition heals
    cluster.all_see_healthy("node-d");
    for peer in ["node-a", "node-b", "node-c"] {
        cluster.prober_of("node-d").set(&address_of(peer), HEALTHY);
    }

    cluster.run_pass().await;
    cluster.run_pass().await;

    for name in ["node-a", "node-b", "node-c", "node-d"] {
        assert!(!cluster.blocked(name).await, "{name} should be active again");
    }
}

#[tokio::test]
async fn asymmetric_link_quarantines_one_side() {
    let cluster = healthy_cluster(&["node-a", "node-b", "node-c"]).await;

    // node-a stops hearing node-b; node-b still hears node-a
    cluster
        .prober_of("node-a")
        .set(&address_of("node-b"), ProbeReport::WORST);

    cluster.run_pass().await;
    cluster.run_pass().await;

    // Mutual edges are a-c and b-c only; {a,c} wins the size tie by node
    // ordering, so node-b is the one quarantined
    assert!(!cluster.blocked("node-a").await);
    assert!(cluster.blocked("node-b").await);
    assert!(!cluster.blocked("node-c").await);
}

#[tokio::test]
async fn lossy_link_above_threshold_counts_as_unreachable() {
    let cluster = healthy_cluster(&["node-a", "node-b", "node-c"]).await;

    // Both directions of the a<->b link degrade past the loss threshold
    let lossy = ProbeReport {
        loss_percent: 40.0,
        mean_delay_ms: 5.0,
    };
    cluster.prober_of("node-a").set(&address_of("node-b"), lossy);
    cluster.prober_of("node-b").set(&address_of("node-a"), lossy);

    cluster.run_pass().await;
    cluster.run_pass().await;

    assert!(!cluster.blocked("node-a").await);
    assert!(cluster.blocked("node-b").await);
    assert!(!cluster.blocked("node-c").await);
}

#[tokio::test]
async fn published_verdict_reads_back_as_the_same_edge() {
    let cluster = healthy_cluster(&["node-a", "node-b"]).await;
    cluster.run_pass().await;

    // node-a's verdict about node-b, read back through the store
    let value = cluster
        .registry
        .get_annotation("node-b", "available-node-a")
        .await
        .unwrap();
    assert_eq!(value.as_deref(), Some("true"));

    // and the raw measurements land alongside it
    let loss = cluster
        .registry
        .get_annotation("node-b", "packet-loss-node-a")
        .await
        .unwrap();
    assert_eq!(loss.as_deref(), Some("0.0"));
}

#[tokio::test]
async fn node_that_never_published_is_biased_toward_quarantine() {
    let mut cluster = healthy_cluster(&["node-a", "node-b", "node-c"]).await;
    cluster.run_pass().await;

    // node-e joins the registry and is reachable on the wire, but runs no
    // agent yet, so its observation row stays missing
    cluster.add_silent_node("node-e").await;
    cluster.all_see_healthy("node-e");

    cluster.run_pass().await;
    cluster.run_pass().await;
    assert!(cluster.blocked("node-e").await);

    // Once its agent starts publishing, the next cycles let it back in
    cluster.start_agent("node-e");
    for peer in ["node-a", "node-b", "node-c"] {
        cluster.prober_of("node-e").set(&address_of(peer), HEALTHY);
    }
    cluster.run_pass().await;
    cluster.run_pass().await;

    assert!(!cluster.blocked("node-e").await);
}

#[tokio::test]
async fn total_disconnection_fails_open() {
    let cluster = SimCluster::new(&["node-a", "node-b", "node-c"]).await;
    // No links scripted at all: every probe resolves to total loss

    cluster.run_pass().await;
    cluster.run_pass().await;

    // No mutual edges anywhere, so nobody is quarantined
    for name in ["node-a", "node-b", "node-c"] {
        assert!(!cluster.blocked(name).await, "{name} must not be quarantined");
    }
}
