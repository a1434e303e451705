// Polling loop driving the engine
//
// One tick (cleanup, then dispatch) per interval. Shutdown interrupts the
// sleep between ticks but never a tick in progress.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use encounter_alerts_core::Engine;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Handle to the running loop.
pub struct Scheduler {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Scheduler {
    /// Spawn the loop; the first tick runs immediately.
    pub fn spawn(engine: Arc<Engine>, interval: Duration) -> Self {
        let (shutdown, rx) = watch::channel(false);
        let handle = tokio::spawn(run_ticks(engine, interval, rx));
        Self { shutdown, handle }
    }

    /// Ask the loop to stop and wait for the current tick to finish.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.handle.await {
            tracing::error!(error = %e, "Scheduler task failed");
        }
    }
}

async fn run_ticks(engine: Arc<Engine>, interval: Duration, mut shutdown: watch::Receiver<bool>) {
    info!("Scheduler started (interval={}s)", interval.as_secs());

    while !*shutdown.borrow() {
        let report = engine.tick(Utc::now().timestamp()).await;
        debug!(notified = report.notified, "Tick finished");

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    info!("Scheduler stopped");
}
