//! Fault monitor service that drives the output verifier on a fixed interval.

use std::{sync::Arc, time::Duration};

use alloy_primitives::Address;
use anyhow::Context;
use tokio::{
    sync::{broadcast, watch},
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::{error, info};

use eth_rpc_client::EthClient;

use crate::{
    oracle::L2OutputOracle,
    verifier::{MonitorStatus, OutputVerifier},
};

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// L1 RPC URL
    pub l1_node_url: String,
    /// L2 RPC URL
    pub l2_node_url: String,
    /// OptimismPortal contract address on L1
    pub optimism_portal_address: Address,
    /// Delay between two consecutive ticks
    pub loop_interval: Duration,
    /// First output index to check; the first unfinalized output is used when absent
    pub start_output_index: Option<u64>,
    /// Keep the mismatch alarm raised once set
    pub latch_mismatch: bool,
}

/// Output root fault monitor
pub struct Monitor {
    /// Monitor configuration
    config: MonitorConfig,
    /// Status snapshot sender
    tx_status: watch::Sender<MonitorStatus>,
    /// Shutdown signal receiver
    rx_shutdown: broadcast::Receiver<()>,
}

impl Monitor {
    pub fn new(
        config: MonitorConfig,
        tx_status: watch::Sender<MonitorStatus>,
        rx_shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            config,
            tx_status,
            rx_shutdown,
        }
    }

    /// Connect to both chains and seed the verifier; any failure here is fatal
    async fn connect(config: &MonitorConfig) -> Result<OutputVerifier, anyhow::Error> {
        let l1_client =
            EthClient::new(config.l1_node_url.clone()).context("Failed to dial L1")?;
        let l2_client =
            EthClient::new(config.l2_node_url.clone()).context("Failed to dial L2")?;

        let l2_chain_id = l2_client
            .chain_id()
            .await
            .context("Failed to query L2 chain id")?;
        info!("L2 RPC client initialized, chain id {}", l2_chain_id);

        let oracle = L2OutputOracle::from_portal(l1_client, config.optimism_portal_address)
            .await
            .context("Failed to query L2OutputOracle address")?;
        info!("Configured L2OutputOracle at {}", oracle.address());

        OutputVerifier::init(
            Arc::new(oracle),
            Arc::new(l2_client),
            config.start_output_index,
            config.latch_mismatch,
        )
        .await
        .context("Failed to initialize output verifier")
    }

    /// Tick immediately, then once per loop interval, until shutdown.
    /// A tick in flight when shutdown arrives is dropped without touching the verifier state.
    async fn run_loop(&mut self, mut verifier: OutputVerifier) -> Result<(), anyhow::Error> {
        let mut interval = interval_at(Instant::now(), self.config.loop_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = async {
                    interval.tick().await;
                    verifier.tick_logged().await;
                } => {
                    self.tx_status.send_replace(verifier.status());
                },
                _ = self.rx_shutdown.recv() => {
                    return Ok(())
                }
            }
        }
    }

    async fn run_inner(&mut self) -> Result<(), anyhow::Error> {
        info!(
            "Fault monitor started, loop interval {}ms",
            self.config.loop_interval.as_millis()
        );

        let verifier = tokio::select! {
            res = Self::connect(&self.config) => res?,
            _ = self.rx_shutdown.recv() => return Ok(()),
        };
        info!(
            "Output verifier initialized at output #{}, fault proof window {}s",
            verifier.current_output_index(),
            verifier.fault_proof_window()
        );
        self.tx_status.send_replace(verifier.status());

        self.run_loop(verifier).await
    }

    pub async fn run(&mut self) -> Result<(), ()> {
        match self.run_inner().await {
            Err(err) => {
                error!("Fault monitor exited: {:#}", err);
                Err(())
            }
            Ok(()) => {
                info!("Fault monitor terminated");
                Ok(())
            }
        }
    }
}
