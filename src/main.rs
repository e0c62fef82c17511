use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::info;

use partition_sentry::config::{config, init_config, SentryConfig};
use partition_sentry::monitor::{MonitorAgent, ReachabilityAggregator};
use partition_sentry::probe::{PingProber, Prober, TokioCommandExecutor};
use partition_sentry::registry::{FileRegistry, NodeRecord, NodeRegistry};
use partition_sentry::telemetry::{generate_cycle_id, init_telemetry};

#[derive(Parser)]
#[command(name = "partition-sentry")]
#[command(about = "Distributed partial-partition detection and node quarantine")]
#[command(long_about = "Partition Sentry runs one monitoring agent per cluster node. Agents \
                       publish reachability observations into a shared node store, rebuild the \
                       cluster's reachability graph independently, and quarantine nodes that \
                       fall outside the largest mutually-reachable set.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the monitoring agent loop on this node
    Run,
    /// Execute a single monitoring cycle and print the decision
    Resolve {
        /// Compute the decision without reconciling blocking markers
        #[arg(long, help = "Print the resolved clique without writing blocking markers")]
        dry_run: bool,
    },
    /// Print nodes, markers, and the mutual reachability matrix from the store
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    SentryConfig::load_env_file()?;
    init_config()?;
    let config = config()?;
    init_telemetry(&config.observability)?;

    match cli.command {
        Commands::Run => run_agent(config).await,
        Commands::Resolve { dry_run } => resolve_once(config, dry_run).await,
        Commands::Status => status(config).await,
    }
}

fn open_registry(config: &SentryConfig) -> Result<Arc<FileRegistry>> {
    let registry = FileRegistry::open(&config.store.path)
        .with_context(|| format!("opening node store at {}", config.store.path))?;
    Ok(Arc::new(registry))
}

/// Build the agent for this node, registering it in the store first so
/// peers can see and probe it
async fn bootstrap_agent(config: &SentryConfig) -> Result<(MonitorAgent, Arc<FileRegistry>)> {
    let identity = config.identity.resolve_node_name()?;
    let address = config
        .identity
        .address
        .clone()
        .context("identity.address must be configured so peers can probe this node")?;

    let registry = open_registry(config)?;
    registry
        .register(NodeRecord::new(identity.clone(), address))
        .await
        .context("registering this node in the store")?;

    let prober: Arc<dyn Prober> = Arc::new(PingProber::new(
        &config.probe,
        Arc::new(TokioCommandExecutor),
    ));
    let agent = MonitorAgent::new(
        identity,
        Arc::clone(&registry) as Arc<dyn NodeRegistry>,
        prober,
        config,
    );
    Ok((agent, registry))
}

async fn run_agent(config: &SentryConfig) -> Result<()> {
    let (agent, _registry) = bootstrap_agent(config).await?;

    tokio::select! {
        _ = agent.run() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal, stopping monitoring loop");
        }
    }
    Ok(())
}

async fn resolve_once(config: &SentryConfig, dry_run: bool) -> Result<()> {
    let (agent, _registry) = bootstrap_agent(config).await?;

    let cycle_id = generate_cycle_id();
    let outcome = agent.run_cycle(&cycle_id, !dry_run).await?;

    println!("Nodes in store: {}", outcome.node_count);
    println!("Peers probed:   {}", outcome.probed);
    match &outcome.clique {
        Some(clique) => {
            println!("Active set:     {}", clique.join(", "));
            if dry_run {
                println!("(dry run - blocking markers untouched)");
            }
        }
        None => println!("No partition decision (fail-open, markers untouched)"),
    }
    Ok(())
}

async fn status(config: &SentryConfig) -> Result<()> {
    let registry = open_registry(config)?;
    let nodes = registry.list_nodes().await?;
    if nodes.is_empty() {
        println!("Node store at {} is empty", config.store.path);
        return Ok(());
    }

    println!("{:<24} {:<20} {}", "NODE", "ADDRESS", "BLOCKED");
    for node in &nodes {
        println!(
            "{:<24} {:<20} {}",
            node.name,
            node.address,
            if node.blocked { "yes" } else { "no" }
        );
    }

    let graph = ReachabilityAggregator::new().aggregate(&nodes);
    println!();
    println!("Mutual reachability ('+' = both directions observed available):");
    for (i, name) in graph.names().iter().enumerate() {
        let row: String = (0..graph.len())
            .map(|j| {
                if i == j {
                    '.'
                } else if graph.mutual(i, j) {
                    '+'
                } else {
                    ' '
                }
            })
            .collect();
        println!("{:<24} |{row}|", name);
    }
    Ok(())
}
