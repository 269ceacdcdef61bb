//! Scheduled trigger for update cycles.
//!
//! Runs the orchestrator every `interval` on a background tokio task. The
//! first run happens one full interval after `start`. Summaries are logged and
//! dropped.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::error::Result;
use crate::orchestrator::UpdateOrchestrator;

/// Periodic update scheduler.
pub struct UpdateScheduler {
    orchestrator: Arc<UpdateOrchestrator>,
    install_root: PathBuf,
    interval: Option<Duration>,
    running: Arc<RwLock<bool>>,
    shutdown_tx: Arc<RwLock<Option<watch::Sender<bool>>>>,
    task_handle: Arc<RwLock<Option<JoinHandle<()>>>>,
}

impl UpdateScheduler {
    /// Create a scheduler. `None` disables it: `start` becomes a no-op.
    pub fn new(
        orchestrator: Arc<UpdateOrchestrator>,
        install_root: PathBuf,
        interval: Option<Duration>,
    ) -> Self {
        Self {
            orchestrator,
            install_root,
            interval: interval.filter(|d| !d.is_zero()),
            running: Arc::new(RwLock::new(false)),
            shutdown_tx: Arc::new(RwLock::new(None)),
            task_handle: Arc::new(RwLock::new(None)),
        }
    }

    /// Whether a period is configured.
    pub fn is_enabled(&self) -> bool {
        self.interval.is_some()
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    /// Start the scheduler.
    pub async fn start(&self) -> Result<()> {
        let Some(period) = self.interval else {
            info!("Scheduled update checks disabled");
            return Ok(());
        };

        let mut running = self.running.write().await;
        if *running {
            return Ok(()); // Already running
        }
        *running = true;
        drop(running);

        let (tx, mut rx) = watch::channel(false);
        *self.shutdown_tx.write().await = Some(tx);

        let orchestrator = self.orchestrator.clone();
        let install_root = self.install_root.clone();

        let handle = tokio::spawn(async move {
            let mut timer = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = timer.tick() => {}
                    _ = rx.changed() => break,
                }

                info!("Scheduled update check starting");
                let summary = orchestrator.run_update_cycle(&install_root).await;
                if summary.status.is_failure() {
                    warn!(
                        run_id = %summary.run_id,
                        status = %summary.status,
                        message = %summary.human_message,
                        "Scheduled update check finished with failures"
                    );
                } else {
                    info!(
                        run_id = %summary.run_id,
                        status = %summary.status,
                        message = %summary.human_message,
                        "Scheduled update check finished"
                    );
                }
            }
        });

        *self.task_handle.write().await = Some(handle);
        info!(interval_secs = period.as_secs_f64(), "Update scheduler started");
        Ok(())
    }

    /// Stop the scheduler. Stopping a stopped scheduler is a no-op.
    pub async fn stop(&self) -> Result<()> {
        let mut running = self.running.write().await;
        if !*running {
            return Ok(());
        }
        *running = false;
        drop(running);

        if let Some(tx) = self.shutdown_tx.write().await.take() {
            let _ = tx.send(true);
        }

        // An in-flight cycle finishes before the task exits
        let mut task_handle = self.task_handle.write().await;
        if let Some(handle) = task_handle.take() {
            drop(task_handle);
            if let Err(e) = handle.await {
                warn!(error = %e, "Update scheduler task ended abnormally");
            }
        }

        info!("Update scheduler stopped");
        Ok(())
    }

    /// Check if the scheduler is running.
    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }
}
