//! Publishes this agent's reachability verdicts onto its peers.
//!
//! Every cycle the agent overwrites the annotations it owns on each target
//! node: the boolean availability verdict plus the raw loss and delay
//! measurements behind it. Only keys carrying this agent's name are ever
//! written, so concurrent observers never conflict.

use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::config::ThresholdConfig;
use crate::probe::ProbeReport;
use crate::registry::{
    annotation_key, NodeRegistry, AVAILABLE_METRIC, DELAY_METRIC, PACKET_LOSS_METRIC,
};

#[derive(Debug, Clone)]
pub struct ReachabilityPublisher {
    observer: String,
    thresholds: ThresholdConfig,
}

impl ReachabilityPublisher {
    pub fn new(observer: impl Into<String>, thresholds: ThresholdConfig) -> Self {
        Self {
            observer: observer.into(),
            thresholds,
        }
    }

    pub fn observer(&self) -> &str {
        &self.observer
    }

    /// Availability verdict for one measurement. Both thresholds are
    /// inclusive: a reading exactly at the limit still counts as available.
    pub fn verdict(&self, report: &ProbeReport) -> bool {
        report.loss_percent <= self.thresholds.loss_percent
            && report.mean_delay_ms <= self.thresholds.delay_ms
    }

    /// Write the verdict and raw measurements onto the target node.
    /// A failed write is logged and dropped; the next cycle overwrites it
    /// anyway, so there is no in-cycle retry.
    pub async fn publish(
        &self,
        registry: &dyn NodeRegistry,
        target: &str,
        report: &ProbeReport,
    ) {
        let available = self.verdict(report);
        let mut annotations = BTreeMap::new();
        annotations.insert(
            annotation_key(AVAILABLE_METRIC, &self.observer),
            available.to_string(),
        );
        annotations.insert(
            annotation_key(PACKET_LOSS_METRIC, &self.observer),
            format!("{:.1}", report.loss_percent),
        );
        annotations.insert(
            annotation_key(DELAY_METRIC, &self.observer),
            format!("{:.1}", report.mean_delay_ms),
        );

        match registry.set_annotations(target, annotations).await {
            Ok(()) => debug!(
                target,
                observer = %self.observer,
                available,
                loss_percent = report.loss_percent,
                mean_delay_ms = report.mean_delay_ms,
                "Published reachability verdict"
            ),
            Err(e) => warn!(
                target,
                observer = %self.observer,
                error = %e,
                "Failed to publish reachability verdict, skipping until next cycle"
            ),
        }
    }
}
