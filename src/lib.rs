// Partition Sentry - distributed partial-partition detection and quarantine
// This exposes the core components for testing and integration

pub mod config;
pub mod monitor;
pub mod probe;
pub mod registry;
pub mod telemetry;

// Re-export key types for easy access
pub use config::{config, init_config, SentryConfig, ThresholdConfig};
pub use monitor::{
    CycleOutcome, MonitorAgent, PartitionResolver, QuarantineEnforcer, ReachabilityAggregator,
    ReachabilityGraph, ReachabilityPublisher,
};
pub use probe::{
    CommandError, CommandExecutor, CommandOutput, PingProber, ProbeReport, Prober,
    TokioCommandExecutor,
};
pub use registry::{
    annotation_key, FileRegistry, InMemoryRegistry, NodeRecord, NodeRegistry, RegistryError,
    AVAILABLE_METRIC, DELAY_METRIC, PACKET_LOSS_METRIC,
};
pub use telemetry::{generate_cycle_id, init_telemetry};
