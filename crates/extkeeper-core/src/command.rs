//! Manual update command.
//!
//! [`UpdateCommand`] is the trigger: acknowledge, run one cycle, report.
//! [`CommandDispatcher`] plays the host's command layer: it matches incoming
//! text against the command name and aliases and checks the
//! [`AuthorizationGate`] before the trigger is reached.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, UpdaterError};
use crate::orchestrator::UpdateOrchestrator;
use crate::outcome::RunSummary;

/// Canonical command name.
pub const COMMAND_NAME: &str = "update all extensions";

/// Accepted aliases.
pub const COMMAND_ALIASES: &[&str] = &["updateallextensions", "update-all"];

/// Sent before the cycle starts.
pub const ACK_MESSAGE: &str = "checking and updating all extensions, please wait...";

/// Sent to senders that fail the authorization check.
pub const DENIED_MESSAGE: &str = "permission denied: administrator only";

/// Who sent a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl Sender {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
        }
    }
}

/// Decides whether a sender may run privileged commands.
pub trait AuthorizationGate: Send + Sync {
    fn is_authorized(&self, sender: &Sender) -> bool;
}

/// Gate backed by a fixed list of administrator ids.
#[derive(Debug, Clone, Default)]
pub struct AdminGate {
    admins: HashSet<String>,
}

impl AdminGate {
    pub fn new<I, S>(admins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            admins: admins.into_iter().map(Into::into).collect(),
        }
    }
}

impl AuthorizationGate for AdminGate {
    fn is_authorized(&self, sender: &Sender) -> bool {
        self.admins.contains(&sender.id)
    }
}

/// Where command replies go (chat channel, terminal, test buffer).
#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn send(&self, text: &str) -> Result<()>;
}

/// Manual trigger: one synchronous update cycle per invocation.
pub struct UpdateCommand {
    orchestrator: Arc<UpdateOrchestrator>,
    install_root: PathBuf,
}

impl UpdateCommand {
    pub fn new(orchestrator: Arc<UpdateOrchestrator>, install_root: PathBuf) -> Self {
        Self {
            orchestrator,
            install_root,
        }
    }

    /// Acknowledge, run a full cycle, then forward the summary message.
    pub async fn execute(&self, sink: &dyn ReplySink) -> Result<RunSummary> {
        sink.send(ACK_MESSAGE).await?;
        let summary = self.orchestrator.run_update_cycle(&self.install_root).await;
        sink.send(&summary.human_message).await?;
        Ok(summary)
    }
}

/// Whether a command text names the update command.
pub fn matches_command(text: &str) -> bool {
    let normalized = text.trim();
    let normalized = normalized.strip_prefix('/').unwrap_or(normalized);
    let normalized = normalized
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    normalized == COMMAND_NAME || COMMAND_ALIASES.contains(&normalized.as_str())
}

/// Result of dispatching a text.
#[derive(Debug)]
pub enum Dispatch {
    /// Text is not the update command
    NotMatched,
    /// Sender failed the gate; the orchestrator was not called
    Denied,
    /// Cycle ran
    Executed(RunSummary),
}

/// Host command layer for the update command.
pub struct CommandDispatcher {
    command: UpdateCommand,
    gate: Arc<dyn AuthorizationGate>,
}

impl CommandDispatcher {
    pub fn new(command: UpdateCommand, gate: Arc<dyn AuthorizationGate>) -> Self {
        Self { command, gate }
    }

    /// Match, authorize and run.
    pub async fn dispatch(
        &self,
        sender: &Sender,
        text: &str,
        sink: &dyn ReplySink,
    ) -> Result<Dispatch> {
        if !matches_command(text) {
            return Ok(Dispatch::NotMatched);
        }

        if !self.gate.is_authorized(sender) {
            warn!(sender = %sender.id, "Unauthorized update command");
            sink.send(DENIED_MESSAGE).await?;
            return Ok(Dispatch::Denied);
        }

        info!(sender = %sender.id, "Received command '{}'", COMMAND_NAME);
        let summary = self.command.execute(sink).await?;
        Ok(Dispatch::Executed(summary))
    }
}

/// Converts a reply failure into the core error type.
pub fn reply_error(e: impl std::fmt::Display) -> UpdaterError {
    UpdaterError::Other(format!("failed to send reply: {}", e))
}
