//! Update orchestration.
//!
//! One cycle:
//! 1. check the install root exists
//! 2. fetch the inventory once
//! 3. keep the records flagged `NeedUpdate`, in inventory order
//! 4. apply each update sequentially, isolating failures per extension
//! 5. fold the outcomes into a [`RunSummary`]
//!
//! A cycle never fails from the caller's point of view. Collaborator errors
//! and panics end up in the summary's status and message.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn, Instrument};
use uuid::Uuid;

use crate::config::UpdaterConfig;
use crate::diagnostics;
use crate::error::UpdaterError;
use crate::extension::{DynInventoryProvider, DynUpdateApplier};
use crate::outcome::{RunStatus, RunSummary, UpdateOutcome, UpdatePlan, NO_UPDATES_MESSAGE};

/// Per-run settings taken from configuration.
#[derive(Debug, Clone, Default)]
pub struct OrchestratorOptions {
    /// Passed to the applier unchanged
    pub proxy_address: Option<String>,
    /// Dump the raw inventory on every run
    pub test_mode: bool,
    /// Dump destination
    pub diagnostics_path: PathBuf,
}

impl From<&UpdaterConfig> for OrchestratorOptions {
    fn from(config: &UpdaterConfig) -> Self {
        Self {
            proxy_address: config.proxy_address.clone(),
            test_mode: config.test_mode,
            diagnostics_path: config.diagnostics_path.clone(),
        }
    }
}

/// Runs update cycles against an inventory provider and an applier.
pub struct UpdateOrchestrator {
    inventory: Option<DynInventoryProvider>,
    applier: Option<DynUpdateApplier>,
    options: OrchestratorOptions,
    /// Serializes cycles so concurrent triggers never interleave on disk
    run_lock: Mutex<()>,
}

impl UpdateOrchestrator {
    /// Create an orchestrator with no collaborators wired.
    pub fn new(options: OrchestratorOptions) -> Self {
        Self {
            inventory: None,
            applier: None,
            options,
            run_lock: Mutex::new(()),
        }
    }

    /// Create a fully wired orchestrator from configuration.
    pub fn from_config(
        config: &UpdaterConfig,
        inventory: DynInventoryProvider,
        applier: DynUpdateApplier,
    ) -> Self {
        Self::new(OrchestratorOptions::from(config))
            .with_inventory(inventory)
            .with_applier(applier)
    }

    pub fn with_inventory(mut self, inventory: DynInventoryProvider) -> Self {
        self.inventory = Some(inventory);
        self
    }

    pub fn with_applier(mut self, applier: DynUpdateApplier) -> Self {
        self.applier = Some(applier);
        self
    }

    pub fn options(&self) -> &OrchestratorOptions {
        &self.options
    }

    /// Run one full update cycle for `install_root`.
    pub async fn run_update_cycle(&self, install_root: &Path) -> RunSummary {
        let _guard = match self.run_lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                debug!("Another update cycle is in progress, waiting for it");
                self.run_lock.lock().await
            }
        };

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let span = tracing::info_span!("update_cycle", %run_id);

        let result = AssertUnwindSafe(self.run_cycle(run_id, install_root, started_at))
            .catch_unwind()
            .instrument(span)
            .await;

        match result {
            Ok(summary) => summary,
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                error!(
                    %run_id,
                    install_root = %install_root.display(),
                    reason = %reason,
                    "Update cycle panicked"
                );
                RunSummary::terminal(
                    run_id,
                    install_root,
                    RunStatus::UnexpectedFailure,
                    aborted_message(&reason),
                    started_at,
                )
            }
        }
    }

    async fn run_cycle(
        &self,
        run_id: Uuid,
        install_root: &Path,
        started_at: DateTime<Utc>,
    ) -> RunSummary {
        info!(install_root = %install_root.display(), "Checking extensions for updates");

        if !install_root.is_dir() {
            let err = UpdaterError::InstallRootNotFound(install_root.to_path_buf());
            error!(error = %err, "Cannot run updates");
            return RunSummary::terminal(
                run_id,
                install_root,
                RunStatus::InstallRootNotFound,
                err.to_string(),
                started_at,
            );
        }

        let (inventory, applier) = match (&self.inventory, &self.applier) {
            (Some(inventory), Some(applier)) => (inventory, applier),
            (None, _) => {
                return self.dependency_unavailable(
                    run_id,
                    install_root,
                    "inventory provider",
                    started_at,
                )
            }
            (_, None) => {
                return self.dependency_unavailable(
                    run_id,
                    install_root,
                    "update applier",
                    started_at,
                )
            }
        };

        let records = match inventory.build_extension_list(install_root).await {
            Ok(records) => records,
            Err(e) => {
                error!(error = %e, "Failed to build extension inventory");
                return RunSummary::terminal(
                    run_id,
                    install_root,
                    RunStatus::UnexpectedFailure,
                    aborted_message(&e.to_string()),
                    started_at,
                );
            }
        };
        debug!(count = records.len(), "Inventory fetched");

        if self.options.test_mode {
            match diagnostics::dump_inventory(&self.options.diagnostics_path, &records) {
                Ok(()) => info!(
                    path = %self.options.diagnostics_path.display(),
                    "Test mode: inventory dump written"
                ),
                Err(e) => warn!(error = %e, "Test mode: failed to write inventory dump"),
            }
        }

        let plan = UpdatePlan::from_inventory(records);
        if plan.is_empty() {
            info!("{}", NO_UPDATES_MESSAGE);
            return RunSummary::terminal(
                run_id,
                install_root,
                RunStatus::NoUpdatesNeeded,
                NO_UPDATES_MESSAGE,
                started_at,
            );
        }

        info!(
            count = plan.len(),
            extensions = ?plan.names(),
            "Found extensions needing update"
        );

        let mut outcomes = Vec::with_capacity(plan.len());
        let mut skipped = 0;
        for record in plan.records() {
            let Some(name) = record.name() else {
                warn!(?record, "Skipping planned extension without a name");
                skipped += 1;
                continue;
            };
            outcomes.push(self.apply_one(applier, name).await);
        }

        let summary = RunSummary::from_outcomes(
            run_id,
            install_root,
            plan.len(),
            skipped,
            outcomes,
            started_at,
        );
        info!(
            status = %summary.status,
            succeeded = summary.successes.len(),
            failed = summary.failures.len(),
            skipped = summary.skipped,
            "Update cycle finished"
        );
        summary
    }

    async fn apply_one(&self, applier: &DynUpdateApplier, name: &str) -> UpdateOutcome {
        info!(extension = name, "Updating extension");
        let started = Instant::now();

        let result = AssertUnwindSafe(applier.update(name, self.options.proxy_address.as_deref()))
            .catch_unwind()
            .await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(Ok(())) => {
                info!(extension = name, elapsed_ms, "Extension updated");
                UpdateOutcome::success(name, elapsed_ms)
            }
            Ok(Err(e)) => {
                error!(extension = name, error = %e, "Extension update failed");
                UpdateOutcome::failure(name, e.to_string(), elapsed_ms)
            }
            Err(panic) => {
                let detail = format!("applier panicked: {}", panic_message(panic.as_ref()));
                error!(extension = name, error = %detail, "Extension update failed");
                UpdateOutcome::failure(name, detail, elapsed_ms)
            }
        }
    }

    fn dependency_unavailable(
        &self,
        run_id: Uuid,
        install_root: &Path,
        which: &str,
        started_at: DateTime<Utc>,
    ) -> RunSummary {
        let err = UpdaterError::DependencyUnavailable(format!(
            "{} is not loaded, cannot run updates",
            which
        ));
        error!(error = %err, "Update cycle skipped");
        RunSummary::terminal(
            run_id,
            install_root,
            RunStatus::DependencyUnavailable,
            err.to_string(),
            started_at,
        )
    }
}

fn aborted_message(reason: &str) -> String {
    format!("update cycle aborted: {}. See the logs for details.", reason)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
