//! Output verifier: walks the posted outputs one by one, reconstructs each output root from L2
//! chain data and compares it against the posted value.

use std::sync::Arc;

use alloy_primitives::B256;
use anyhow::Context;
use chrono::DateTime;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::{
    error::MonitorError,
    l2_chain::{L2Chain, L2_TO_L1_MESSAGE_PASSER},
    locator::find_first_unfinalized_output_index,
    oracle::OutputOracle,
    output_root::OutputV0,
    telemetry::MonitorMetrics,
};

/// Result of a single verification step that completed all of its reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The cursor already points past the last posted output
    WaitingForOutput { next_output_index: u64 },
    /// The L2 node has not synced up to the block the output commits to
    L2Behind { l2_height: u64, l2_block_number: u64 },
    /// The reconstructed root matches the posted one
    Validated {
        index: u64,
        output_root: B256,
        finalization_time: u64,
    },
    /// The reconstructed root differs from the posted one
    Mismatch {
        index: u64,
        expected_output_root: B256,
        actual_output_root: B256,
        finalization_time: u64,
    },
}

/// Snapshot of the verifier state published after every tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MonitorStatus {
    /// Index of the next output to be checked
    pub current_output_index: u64,
    #[serde(flatten)]
    pub metrics: MonitorMetrics,
}

pub struct OutputVerifier {
    oracle: Arc<dyn OutputOracle>,
    l2_chain: Arc<dyn L2Chain>,
    fault_proof_window: u64,
    curr_output_index: u64,
    latch_mismatch: bool,
    metrics: MonitorMetrics,
}

impl OutputVerifier {
    pub fn new(
        oracle: Arc<dyn OutputOracle>,
        l2_chain: Arc<dyn L2Chain>,
        fault_proof_window: u64,
        start_output_index: u64,
        latch_mismatch: bool,
    ) -> Self {
        Self {
            oracle,
            l2_chain,
            fault_proof_window,
            curr_output_index: start_output_index,
            latch_mismatch,
            metrics: MonitorMetrics::default(),
        }
    }

    /// Read the finalization window and seed the cursor, either from `start_output_index` or
    /// by locating the first output still inside its fault proof window.
    pub async fn init(
        oracle: Arc<dyn OutputOracle>,
        l2_chain: Arc<dyn L2Chain>,
        start_output_index: Option<u64>,
        latch_mismatch: bool,
    ) -> Result<Self, MonitorError> {
        let fault_proof_window = oracle.finalization_period_seconds().await?;
        info!("Fault proof window: {}s", fault_proof_window);

        let start_output_index = match start_output_index {
            Some(index) => index,
            None => {
                let latest_block = l2_chain.latest_block().await?;
                let total_outputs = oracle.next_output_index().await?;
                find_first_unfinalized_output_index(
                    oracle.as_ref(),
                    total_outputs,
                    fault_proof_window,
                    latest_block.timestamp,
                )
                .await?
            }
        };
        info!("Configured starting output index: {}", start_output_index);

        Ok(Self::new(
            oracle,
            l2_chain,
            fault_proof_window,
            start_output_index,
            latch_mismatch,
        ))
    }

    pub fn current_output_index(&self) -> u64 {
        self.curr_output_index
    }

    pub fn fault_proof_window(&self) -> u64 {
        self.fault_proof_window
    }

    pub fn metrics(&self) -> &MonitorMetrics {
        &self.metrics
    }

    pub fn status(&self) -> MonitorStatus {
        MonitorStatus {
            current_output_index: self.curr_output_index,
            metrics: self.metrics,
        }
    }

    /// Check the output at the cursor.
    ///
    /// All reads happen before any state is touched, so a failed, dropped or L2-behind tick
    /// leaves the cursor, the alarm and both gauges as they were.
    pub async fn tick(&mut self) -> Result<TickOutcome, anyhow::Error> {
        let next_output_index = self
            .oracle
            .next_output_index()
            .await
            .context("Failed to query next output index")?;

        if self.curr_output_index >= next_output_index {
            self.metrics.set_highest_known_index(next_output_index);
            return Ok(TickOutcome::WaitingForOutput { next_output_index });
        }

        let index = self.curr_output_index;
        info!("Checking output #{}", index);

        let output = self
            .oracle
            .get_l2_output(index)
            .await
            .with_context(|| format!("Failed to query output #{index}"))?;

        let l2_height = self
            .l2_chain
            .latest_block_number()
            .await
            .context("Failed to query latest L2 height")?;
        if l2_height < output.l2_block_number {
            return Ok(TickOutcome::L2Behind {
                l2_height,
                l2_block_number: output.l2_block_number,
            });
        }

        // Fetch the pre-image of the output root at the claimed height
        let block = self
            .l2_chain
            .block_at(output.l2_block_number)
            .await
            .with_context(|| format!("Failed to query L2 block #{}", output.l2_block_number))?;
        let message_passer_storage_root = self
            .l2_chain
            .storage_root(L2_TO_L1_MESSAGE_PASSER, block.number)
            .await
            .context("Failed to query storage proof of L2ToL1MessagePasser")?;

        let expected_output_root = OutputV0 {
            state_root: block.state_root,
            message_passer_storage_root,
            block_hash: block.hash,
        }
        .output_root();
        let finalization_time = block.timestamp.saturating_add(self.fault_proof_window);

        self.metrics.set_highest_known_index(next_output_index);
        if expected_output_root != output.output_root {
            self.metrics.set_mismatched(true);
            return Ok(TickOutcome::Mismatch {
                index,
                expected_output_root,
                actual_output_root: output.output_root,
                finalization_time,
            });
        }

        self.metrics.set_highest_checked_index(index);
        self.curr_output_index += 1;
        if !(self.latch_mismatch && self.metrics.is_mismatched()) {
            self.metrics.set_mismatched(false);
        }

        Ok(TickOutcome::Validated {
            index,
            output_root: expected_output_root,
            finalization_time,
        })
    }

    /// Run one tick and report its outcome; errors are logged and never propagated
    pub async fn tick_logged(&mut self) {
        match self.tick().await {
            Ok(TickOutcome::WaitingForOutput { next_output_index }) => {
                info!(
                    "Waiting for next output: index {}, next index {}",
                    self.curr_output_index, next_output_index
                );
            }
            Ok(TickOutcome::L2Behind {
                l2_height,
                l2_block_number,
            }) => {
                warn!(
                    "L2 node is behind (height {} < {}), waiting for sync...",
                    l2_height, l2_block_number
                );
            }
            Ok(TickOutcome::Validated {
                index,
                output_root,
                finalization_time,
            }) => {
                info!(
                    "Validated output #{} {} (finalization time {})",
                    index,
                    output_root,
                    format_unix_timestamp(finalization_time)
                );
            }
            Ok(TickOutcome::Mismatch {
                index,
                expected_output_root,
                actual_output_root,
                finalization_time,
            }) => {
                error!(
                    index,
                    %expected_output_root,
                    %actual_output_root,
                    finalization_time = %format_unix_timestamp(finalization_time),
                    "Output root mismatch!!!"
                );
            }
            Err(err) => {
                error!("{:#}", err);
            }
        }
    }
}

/// Format Unix timestamp to human-readable string
fn format_unix_timestamp(timestamp: u64) -> String {
    match i64::try_from(timestamp)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
    {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => format!("{timestamp}s"),
    }
}
