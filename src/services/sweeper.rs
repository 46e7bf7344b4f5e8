use crate::services::paste_service::PasteService;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Periodically reclaims expired pastes, rows and backing files alike.
pub struct ExpirationSweeper {
    pastes: Arc<PasteService>,
    interval: Duration,
}

/// Stops a spawned sweeper and waits for its current pass to finish.
pub struct SweeperHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            tracing::warn!("Expiration sweeper ended abnormally: {}", e);
        }
    }
}

impl ExpirationSweeper {
    pub fn new(pastes: Arc<PasteService>, interval: Duration) -> Self {
        Self { pastes, interval }
    }

    /// One pass against the current time.
    pub async fn run_once(&self) -> usize {
        self.sweep_at(Utc::now()).await
    }

    /// Purges every paste that expired before `now` and returns how many rows
    /// this pass removed. A failing item is logged and skipped.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let expired = match self.pastes.find_expired(now).await {
            Ok(expired) => expired,
            Err(e) => {
                tracing::error!("Expiration sweep could not list expired pastes: {}", e);
                return 0;
            }
        };

        let mut reclaimed = 0;
        for paste in expired {
            match self.pastes.purge(&paste).await {
                Ok(true) => reclaimed += 1,
                Ok(false) => {} // removed concurrently
                Err(e) => tracing::error!("Failed to purge expired paste {}: {}", paste.id, e),
            }
        }

        if reclaimed > 0 {
            tracing::info!("🧹 Reclaimed {} expired paste(s)", reclaimed);
        }
        reclaimed
    }

    /// Sweeps immediately, then once per interval until `shutdown` flips.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!("🚀 Expiration sweeper started (every {:?})", self.interval);

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    tracing::info!("🛑 Expiration sweeper shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    self.run_once().await;
                }
            }
        }
    }

    pub fn spawn(self) -> SweeperHandle {
        let (shutdown, rx) = watch::channel(false);
        let task = tokio::spawn(self.run(rx));
        SweeperHandle { shutdown, task }
    }
}
