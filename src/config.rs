use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for Partition Sentry
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SentryConfig {
    /// Identity of the agent within the cluster
    pub identity: IdentityConfig,
    /// Shared node store settings
    pub store: StoreConfig,
    /// Reachability probing settings
    pub probe: ProbeConfig,
    /// Availability verdict thresholds
    pub thresholds: ThresholdConfig,
    /// Monitoring loop settings
    pub monitor: MonitorConfig,
    /// Observability settings
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IdentityConfig {
    /// Node name this agent publishes observations under.
    /// Must match this node's name in the registry.
    pub node_name: Option<String>,
    /// Address peers should probe to reach this node
    pub address: Option<String>,
}

impl IdentityConfig {
    /// Resolve the agent's node name, falling back to the machine hostname
    pub fn resolve_node_name(&self) -> Result<String> {
        if let Some(name) = &self.node_name {
            return Ok(name.clone());
        }
        let host = hostname::get()
            .map_err(|e| anyhow::anyhow!("Failed to determine hostname for agent identity: {e}"))?;
        Ok(host.to_string_lossy().to_string())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Directory holding one record file per node (file-backed registry)
    pub path: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProbeConfig {
    /// Number of ping packets sent per probe
    pub ping_count: u32,
    /// Wall-clock window the ping packets are spread across, in seconds
    pub window_secs: u64,
    /// Per-packet reply timeout passed to ping, in seconds
    pub ping_timeout_secs: u64,
    /// Hard timeout for one whole probe, in seconds
    pub probe_timeout_secs: u64,
    /// Maximum probes in flight at once
    pub max_concurrent: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ThresholdConfig {
    /// Packet loss above this percentage marks the target unavailable
    pub loss_percent: f64,
    /// Mean round-trip delay above this many milliseconds marks the target unavailable
    pub delay_ms: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MonitorConfig {
    /// Pause between monitoring cycles, in seconds
    pub interval_secs: u64,
    /// Upper bound for the random delay before each cycle, in milliseconds
    pub jitter_ms: u64,
    /// Deadline for one full cycle (probe, publish, resolve, enforce), in seconds
    pub cycle_timeout_secs: u64,
    /// Safety cutoff for clique enumeration; past this many expansions the
    /// resolver yields no decision for the cycle
    pub max_expansions: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level
    pub log_level: String,
    /// Emit logs as JSON for structured collection
    pub json_logs: bool,
}

impl Default for SentryConfig {
    fn default() -> Self {
        Self {
            identity: IdentityConfig {
                node_name: None, // Will be read from env var or fall back to hostname
                address: None,
            },
            store: StoreConfig {
                path: "./sentry-store".to_string(),
            },
            probe: ProbeConfig {
                ping_count: 100,
                window_secs: 5,
                ping_timeout_secs: 1,
                probe_timeout_secs: 15,
                max_concurrent: 8,
            },
            thresholds: ThresholdConfig {
                loss_percent: 3.0,
                delay_ms: 100.0,
            },
            monitor: MonitorConfig {
                interval_secs: 5,
                jitter_ms: 1000,
                cycle_timeout_secs: 60,
                max_expansions: 100_000,
            },
            observability: ObservabilityConfig {
                log_level: "info".to_string(),
                json_logs: false,
            },
        }
    }
}

impl SentryConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration file (partition-sentry.toml)
    /// 3. Environment variables (prefixed with PARTITION_SENTRY_)
    pub fn load() -> Result<Self> {
        let defaults = Config::try_from(&SentryConfig::default())?;
        let mut builder = Config::builder().add_source(defaults);

        if Path::new("partition-sentry.toml").exists() {
            builder = builder.add_source(File::with_name("partition-sentry"));
        }

        // Override with environment variables
        builder = builder.add_source(
            Environment::with_prefix("PARTITION_SENTRY")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        let mut sentry_config: SentryConfig = config.try_deserialize()?;

        // Special handling for the agent identity - cluster schedulers commonly
        // inject the node name as a plain NODE_NAME variable
        if sentry_config.identity.node_name.is_none() {
            if let Ok(name) = std::env::var("NODE_NAME") {
                sentry_config.identity.node_name = Some(name);
            }
        }

        Ok(sentry_config)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

/// Global configuration instance
static CONFIG: std::sync::LazyLock<Result<SentryConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        let _ = SentryConfig::load_env_file();
        SentryConfig::load()
    });

/// Get the global configuration
pub fn config() -> Result<&'static SentryConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}

/// Initialize configuration (called at startup)
pub fn init_config() -> Result<()> {
    let _config = config()?;
    tracing::info!("Configuration loaded successfully");
    Ok(())
}
