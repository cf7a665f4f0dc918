//! Periodic cache sweeping
//!
//! The store only expires entries lazily on read. A [`SweepHandle`] runs
//! `sweep_expired` on a timer in the background and reports each run over a
//! tokio channel, so disk usage stays bounded without callers polling.

use std::time::Duration;
use tokio::sync::mpsc;
use tracing::warn;

use crate::cache::CacheStore;

/// Messages sent from the background sweeper
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepMessage {
    /// A sweep finished
    SweepCompleted {
        /// Number of entries removed
        removed: usize,
    },
    /// The sweep task failed to run
    SweepFailed(String),
}

/// Configuration for the sweep timer
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Time between sweeps
    pub interval: Duration,
    /// Whether periodic sweeping is enabled
    pub enabled: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3600), // 1 hour
            enabled: true,
        }
    }
}

/// Handle for controlling the background sweeper
pub struct SweepHandle {
    /// Channel for receiving sweep results
    pub receiver: mpsc::Receiver<SweepMessage>,
    /// Requests an out-of-schedule sweep
    trigger_tx: mpsc::Sender<()>,
    /// Signals shutdown
    shutdown_tx: mpsc::Sender<()>,
}

impl SweepHandle {
    /// Spawns the background sweep task
    ///
    /// # Arguments
    /// * `store` - The store to sweep
    /// * `config` - Interval and enablement
    ///
    /// # Returns
    /// A SweepHandle that receives results via the `receiver` channel
    pub fn spawn(store: CacheStore, config: SweepConfig) -> Self {
        let (msg_tx, msg_rx) = mpsc::channel(32);
        let (trigger_tx, mut trigger_rx) = mpsc::channel::<()>(1);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        if config.enabled {
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(config.interval);
                // Skip the first tick (immediate)
                interval.tick().await;

                loop {
                    tokio::select! {
                        _ = interval.tick() => {}
                        Some(()) = trigger_rx.recv() => {}
                        _ = shutdown_rx.recv() => break,
                    }

                    let sweeping = store.clone();
                    let message = match tokio::task::spawn_blocking(move || sweeping.sweep_expired()).await {
                        Ok(removed) => SweepMessage::SweepCompleted { removed },
                        Err(e) => {
                            warn!(error = %e, "cache sweep task failed");
                            SweepMessage::SweepFailed(e.to_string())
                        }
                    };
                    if msg_tx.send(message).await.is_err() {
                        // Receiver dropped; nobody is listening
                        break;
                    }
                }
            });
        }

        Self {
            receiver: msg_rx,
            trigger_tx,
            shutdown_tx,
        }
    }

    /// Requests an immediate sweep; coalesces with one already pending
    pub fn request_sweep(&self) {
        let _ = self.trigger_tx.try_send(());
    }

    /// Shuts down the background sweep task
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}
