//! Graceful shutdown for the monitor and the HTTP server.
//!
//! The first SIGTERM or SIGINT is turned into exactly one `()` on a broadcast channel. The
//! monitor loop drops its timer and any in-flight tick on receipt; the HTTP server drains
//! open connections. Later signals are not observed since `run` returns after the first one.

use tokio::{
    signal::unix::{signal, SignalKind},
    sync::broadcast,
};
use tracing::{error, info};

/// Owner of the shutdown broadcast channel
pub struct Shutdown {
    tx_shutdown: broadcast::Sender<()>,
}

impl Default for Shutdown {
    fn default() -> Self {
        let (tx_shutdown, _) = broadcast::channel(1);
        Self { tx_shutdown }
    }
}

impl Shutdown {
    /// Receivers must be created before `run` is spawned to see the notification
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx_shutdown.subscribe()
    }

    /// Deliver the shutdown notification to every current subscriber
    fn notify(&self) -> Result<usize, ()> {
        self.tx_shutdown.send(()).map_err(|_| {
            error!("No component is listening for shutdown");
        })
    }

    /// Wait for the first termination signal, then notify all components once
    pub async fn run(&self) -> Result<(), ()> {
        let mut sigterm = signal(SignalKind::terminate())
            .map_err(|err| error!("Failed to install SIGTERM handler: {}", err))?;
        let mut sigint = signal(SignalKind::interrupt())
            .map_err(|err| error!("Failed to install SIGINT handler: {}", err))?;

        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM, initiating shutdown..."),
            _ = sigint.recv() => info!("Received SIGINT, initiating shutdown..."),
        };

        let receivers = self.notify()?;
        info!("Shutdown delivered to {} components", receivers);
        Ok(())
    }
}
