#![doc = include_str!("../README.md")]

use std::time::Duration;

use alloy_primitives::Address;
use clap::Parser;
use tokio::{sync::watch, task::JoinHandle};
use tracing::{error, info, subscriber::set_global_default};
use tracing_subscriber::filter::EnvFilter;

use crate::{
    http::{HttpConfig, HttpServer},
    monitor::{Monitor, MonitorConfig},
    shutdown::Shutdown,
    verifier::MonitorStatus,
};

mod error;
mod http;
mod l2_chain;
mod locator;
mod monitor;
mod oracle;
mod output_root;
mod shutdown;
mod telemetry;
mod verifier;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// L1 RPC URL
    #[arg(long, env = "L1_NODE_URL")]
    l1_node_url: String,
    /// L2 RPC URL
    #[arg(long, env = "L2_NODE_URL")]
    l2_node_url: String,
    /// Address of the OptimismPortal contract on L1
    #[arg(long, env = "OPTIMISM_PORTAL_ADDRESS")]
    optimism_portal_address: Address,
    /// Loop interval in milliseconds
    #[arg(
        long,
        env = "LOOP_INTERVAL_MSEC",
        default_value = "60000",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    loop_interval_msec: u64,
    /// Output index to start from; a negative value starts from the first unfinalized output
    #[arg(
        long,
        env = "START_OUTPUT_INDEX",
        default_value = "-1",
        allow_negative_numbers = true
    )]
    start_output_index: i64,
    /// Keep the mismatch alarm raised after a later output matches
    #[arg(long, env = "LATCH_MISMATCH")]
    latch_mismatch: bool,
    /// Metrics and status server host
    #[arg(long, env = "METRICS_HOST", default_value = "127.0.0.1:7300")]
    metrics_host: String,
    /// Logging level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn init_tracing(log_level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber_builder =
        tracing_subscriber::fmt::Subscriber::builder().with_env_filter(env_filter);

    let subscriber = subscriber_builder.with_writer(std::io::stderr).finish();
    set_global_default(subscriber).expect("Failed to set subscriber");
}

#[tokio::main]
async fn main() {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    info!("Fault monitor is launching...");

    let prometheus = match telemetry::install_recorder() {
        Ok(handle) => handle,
        Err(err) => {
            error!("Failed to install Prometheus recorder: {}", err);
            std::process::exit(1);
        }
    };

    // Instantiating components and wiring them together
    let shutdown = Shutdown::default();
    let (tx_status, rx_status) = watch::channel(MonitorStatus::default());

    let monitor_config = MonitorConfig {
        l1_node_url: cli.l1_node_url,
        l2_node_url: cli.l2_node_url,
        optimism_portal_address: cli.optimism_portal_address,
        loop_interval: Duration::from_millis(cli.loop_interval_msec),
        start_output_index: u64::try_from(cli.start_output_index).ok(),
        latch_mismatch: cli.latch_mismatch,
    };
    let mut monitor = Monitor::new(monitor_config, tx_status, shutdown.subscribe());

    let http_config = HttpConfig {
        metrics_host: cli.metrics_host,
    };
    let http_server = HttpServer::new(http_config, prometheus, rx_status, shutdown.subscribe());

    // Launching threads for each component
    let monitor_handle = tokio::spawn(async move { monitor.run().await });
    let http_handle = tokio::spawn(async move { http_server.run().await });
    let shutdown_handle = tokio::spawn(async move { shutdown.run().await });

    // If at least one component exits with an error, the monitor will exit with an error
    match tokio::try_join!(
        flatten(monitor_handle),
        flatten(http_handle),
        flatten(shutdown_handle)
    ) {
        Ok(_) => {
            info!("Fault monitor has shut down");
            std::process::exit(0);
        }
        Err(_) => {
            error!("Fault monitor has exited with error");
            std::process::exit(1);
        }
    }
}

async fn flatten<T>(handle: JoinHandle<Result<T, ()>>) -> Result<T, ()> {
    match handle.await {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(err)) => Err(err),
        Err(_) => Err(()),
    }
}
