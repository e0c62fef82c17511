//! Reachability probing over the system `ping` binary.
//!
//! A probe sends a burst of ICMP echoes spread across the probe window and
//! reduces the replies to a packet-loss percentage and a mean round-trip
//! delay. Any failure - missing binary, timeout, unparseable output - resolves
//! to the worst-case report rather than an error, so a broken prober biases
//! its targets toward quarantine instead of crashing the cycle.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::command::{CommandError, CommandExecutor};
use crate::config::ProbeConfig;

/// One directed reachability measurement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeReport {
    pub loss_percent: f64,
    pub mean_delay_ms: f64,
}

impl ProbeReport {
    /// The verdict assigned when a probe cannot complete: total loss
    pub const WORST: ProbeReport = ProbeReport {
        loss_percent: 100.0,
        mean_delay_ms: 0.0,
    };
}

/// Reachability prober interface
#[async_trait]
pub trait Prober: Send + Sync {
    /// Measure reachability of one target address. Must resolve within the
    /// prober's configured deadline and never error - failures map to
    /// `ProbeReport::WORST`.
    async fn probe(&self, address: &str) -> ProbeReport;
}

pub struct PingProber {
    executor: Arc<dyn CommandExecutor>,
    ping_count: u32,
    packet_interval_secs: f64,
    ping_timeout_secs: u64,
    probe_timeout: Duration,
}

impl PingProber {
    pub fn new(config: &ProbeConfig, executor: Arc<dyn CommandExecutor>) -> Self {
        // Spread the packets across the probe window, like `-i window/count`
        let packet_interval_secs = config.window_secs as f64 / config.ping_count.max(1) as f64;
        Self {
            executor,
            ping_count: config.ping_count,
            packet_interval_secs,
            ping_timeout_secs: config.ping_timeout_secs,
            probe_timeout: Duration::from_secs(config.probe_timeout_secs),
        }
    }

    async fn run_ping(&self, address: &str) -> Result<ProbeReport, CommandError> {
        let count = self.ping_count.to_string();
        let interval = format!("{:.3}", self.packet_interval_secs);
        let timeout = self.ping_timeout_secs.to_string();
        let args = [
            "-c",
            count.as_str(),
            "-i",
            interval.as_str(),
            "-W",
            timeout.as_str(),
            address,
        ];

        // ping exits nonzero on total loss but still prints the summary line,
        // so the exit status is deliberately ignored here
        let output = self
            .executor
            .execute("ping", &args, self.probe_timeout)
            .await?;

        parse_ping_output(&output.stdout).ok_or_else(|| CommandError::ExecutionFailed {
            message: "no packet loss summary in ping output".to_string(),
        })
    }
}

#[async_trait]
impl Prober for PingProber {
    async fn probe(&self, address: &str) -> ProbeReport {
        match self.run_ping(address).await {
            Ok(report) => {
                debug!(
                    address,
                    loss_percent = report.loss_percent,
                    mean_delay_ms = report.mean_delay_ms,
                    "Probe completed"
                );
                report
            }
            Err(e) => {
                warn!(address, error = %e, "Probe failed, assuming total loss");
                ProbeReport::WORST
            }
        }
    }
}

/// Extract loss percentage and mean round-trip delay from ping output.
/// Returns None when the summary line is missing entirely.
fn parse_ping_output(stdout: &str) -> Option<ProbeReport> {
    let mut time_sum = 0.0_f64;
    let mut received = 0_u32;
    let mut loss_percent = None;

    for line in stdout.lines() {
        if let Some(rest) = line.split("time=").nth(1) {
            if let Some(value) = rest.split("ms").next() {
                if let Ok(ms) = value.trim().parse::<f64>() {
                    received += 1;
                    time_sum += ms;
                }
            }
        }
        if let Some(part) = line.split(',').find(|p| p.contains("packet loss")) {
            if let Some(value) = part.trim().split('%').next() {
                if let Ok(pct) = value.trim().parse::<f64>() {
                    loss_percent = Some(pct);
                }
            }
        }
    }

    let mean_delay_ms = if received > 0 {
        time_sum / received as f64
    } else {
        0.0
    };

    loss_percent.map(|loss_percent| ProbeReport {
        loss_percent,
        mean_delay_ms,
    })
}
