//! Prometheus gauges reporting monitor progress and alarm state.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use serde::Serialize;

const HIGHEST_OUTPUT_INDEX: &str = "monitorism_highestOutputIndex";
const IS_CURRENTLY_MISMATCHED: &str = "monitorism_isCurrentlyMismatched";

/// Install the global Prometheus recorder and register metric descriptions
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    metrics::describe_gauge!(
        HIGHEST_OUTPUT_INDEX,
        "Highest output indices (checked and known)"
    );
    metrics::describe_gauge!(
        IS_CURRENTLY_MISMATCHED,
        "0 if state is ok, 1 if state is mismatched"
    );
    Ok(handle)
}

/// Gauge values owned by the output verifier.
/// Every setter mirrors the value into the global recorder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MonitorMetrics {
    highest_known_index: Option<u64>,
    highest_checked_index: Option<u64>,
    is_mismatched: bool,
}

impl MonitorMetrics {
    pub fn highest_known_index(&self) -> Option<u64> {
        self.highest_known_index
    }

    pub fn highest_checked_index(&self) -> Option<u64> {
        self.highest_checked_index
    }

    pub fn is_mismatched(&self) -> bool {
        self.is_mismatched
    }

    pub(crate) fn set_highest_known_index(&mut self, index: u64) {
        self.highest_known_index = Some(index);
        metrics::gauge!(HIGHEST_OUTPUT_INDEX, index as f64, "type" => "known");
    }

    pub(crate) fn set_highest_checked_index(&mut self, index: u64) {
        self.highest_checked_index = Some(index);
        metrics::gauge!(HIGHEST_OUTPUT_INDEX, index as f64, "type" => "checked");
    }

    pub(crate) fn set_mismatched(&mut self, mismatched: bool) {
        self.is_mismatched = mismatched;
        metrics::gauge!(IS_CURRENTLY_MISMATCHED, if mismatched { 1.0 } else { 0.0 });
    }
}
