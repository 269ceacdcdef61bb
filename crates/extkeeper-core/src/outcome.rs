//! Result model of an update cycle.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::extension::ExtensionRecord;

/// Message returned when nothing needs updating.
pub const NO_UPDATES_MESSAGE: &str = "no updates needed";

/// Records flagged `NeedUpdate`, in inventory order.
#[derive(Debug, Clone, Default)]
pub struct UpdatePlan {
    records: Vec<ExtensionRecord>,
}

impl UpdatePlan {
    /// Keep only the records that need an update. Order is preserved.
    pub fn from_inventory(inventory: Vec<ExtensionRecord>) -> Self {
        Self {
            records: inventory.into_iter().filter(|r| r.needs_update()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ExtensionRecord] {
        &self.records
    }

    /// Names that can be attempted (missing names dropped).
    pub fn names(&self) -> Vec<&str> {
        self.records.iter().filter_map(|r| r.name()).collect()
    }
}

/// Result of one attempted update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateOutcome {
    pub name: String,
    pub succeeded: bool,
    pub error_detail: Option<String>,
    pub duration_ms: u64,
}

impl UpdateOutcome {
    pub fn success(name: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            name: name.into(),
            succeeded: true,
            error_detail: None,
            duration_ms,
        }
    }

    pub fn failure(name: impl Into<String>, detail: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            name: name.into(),
            succeeded: false,
            error_detail: Some(detail.into()),
            duration_ms,
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every planned update succeeded
    Completed,
    /// Nothing was flagged for update
    NoUpdatesNeeded,
    /// At least one update failed
    PartialFailure,
    /// Inventory provider or applier not wired
    DependencyUnavailable,
    /// Install root missing
    InstallRootNotFound,
    /// Inventory error or panic caught at the outer boundary
    UnexpectedFailure,
}

impl RunStatus {
    pub fn is_failure(&self) -> bool {
        !matches!(self, RunStatus::Completed | RunStatus::NoUpdatesNeeded)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Completed => "completed",
            RunStatus::NoUpdatesNeeded => "no_updates_needed",
            RunStatus::PartialFailure => "partial_failure",
            RunStatus::DependencyUnavailable => "dependency_unavailable",
            RunStatus::InstallRootNotFound => "install_root_not_found",
            RunStatus::UnexpectedFailure => "unexpected_failure",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary handed back to the trigger that started the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub install_root: PathBuf,
    pub total_needing_update: usize,
    pub successes: Vec<String>,
    pub failures: Vec<String>,
    /// Planned records skipped because they had no usable name
    pub skipped: usize,
    pub outcomes: Vec<UpdateOutcome>,
    pub human_message: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    /// A run that ended before any update was attempted.
    pub fn terminal(
        run_id: Uuid,
        install_root: &Path,
        status: RunStatus,
        message: impl Into<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            run_id,
            status,
            install_root: install_root.to_path_buf(),
            total_needing_update: 0,
            successes: Vec::new(),
            failures: Vec::new(),
            skipped: 0,
            outcomes: Vec::new(),
            human_message: message.into(),
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// Build the summary of a run that walked the whole plan.
    pub fn from_outcomes(
        run_id: Uuid,
        install_root: &Path,
        total_needing_update: usize,
        skipped: usize,
        outcomes: Vec<UpdateOutcome>,
        started_at: DateTime<Utc>,
    ) -> Self {
        let successes: Vec<String> = outcomes
            .iter()
            .filter(|o| o.succeeded)
            .map(|o| o.name.clone())
            .collect();
        let failures: Vec<String> = outcomes
            .iter()
            .filter(|o| !o.succeeded)
            .map(|o| o.name.clone())
            .collect();

        let status = if failures.is_empty() {
            RunStatus::Completed
        } else {
            RunStatus::PartialFailure
        };
        let human_message =
            compose_message(total_needing_update, &successes, &failures, skipped);

        Self {
            run_id,
            status,
            install_root: install_root.to_path_buf(),
            total_needing_update,
            successes,
            failures,
            skipped,
            outcomes,
            human_message,
            started_at,
            finished_at: Utc::now(),
        }
    }

    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

/// Render the user-facing report of a run.
pub fn compose_message(
    total_needing_update: usize,
    successes: &[String],
    failures: &[String],
    skipped: usize,
) -> String {
    let mut lines = vec![format!(
        "{} {} need update.",
        total_needing_update,
        plural(total_needing_update)
    )];

    if !failures.is_empty() {
        lines.push(format!(
            "{} failed: {}. See the logs for details.",
            failures.len(),
            failures.join(", ")
        ));
    }
    if skipped > 0 {
        lines.push(format!("{} skipped (missing name).", skipped));
    }
    lines.push(format!(
        "{} succeeded: [{}]",
        successes.len(),
        successes.join(", ")
    ));

    lines.join("\n")
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        "extension"
    } else {
        "extensions"
    }
}
