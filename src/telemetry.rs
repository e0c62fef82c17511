use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use crate::config::ObservabilityConfig;

/// Initialize structured logging for the agent.
/// RUST_LOG takes precedence over the configured level when set.
pub fn init_telemetry(observability: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(observability.log_level.clone()));

    if observability.json_logs {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true),
            )
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer())
            .with(filter)
            .init();
    }

    tracing::info!("Partition sentry telemetry initialized");
    Ok(())
}

/// Generate a correlation ID for linking the log records of one monitoring cycle
pub fn generate_cycle_id() -> String {
    Uuid::new_v4().to_string()
}
