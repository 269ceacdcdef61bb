//! Core of extkeeper: checks installed extensions for updates and applies them.
//!
//! The crate owns the update orchestration routine and the triggers around it.
//! Discovery and installation live behind the [`InventoryProvider`] and
//! [`UpdateApplier`] traits; `extkeeper-market` provides the marketplace-backed
//! implementations.

pub mod command;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod extension;
pub mod orchestrator;
pub mod outcome;
pub mod scheduler;

pub use command::{
    AdminGate, AuthorizationGate, CommandDispatcher, Dispatch, ReplySink, Sender, UpdateCommand,
};
pub use config::{MarketConfig, UpdaterConfig};
pub use error::{Result, UpdaterError};
pub use extension::{
    DynInventoryProvider, DynUpdateApplier, ExtensionRecord, ExtensionStatus, InventoryProvider,
    UpdateApplier,
};
pub use orchestrator::{OrchestratorOptions, UpdateOrchestrator};
pub use outcome::{RunStatus, RunSummary, UpdateOutcome, UpdatePlan};
pub use scheduler::UpdateScheduler;

/// Re-exports commonly used types.
pub mod prelude {
    pub use crate::command::{
        AdminGate, AuthorizationGate, CommandDispatcher, Dispatch, ReplySink, Sender,
        UpdateCommand,
    };
    pub use crate::config::{env_vars, UpdaterConfig};
    pub use crate::error::{Result, UpdaterError};
    pub use crate::extension::{
        ExtensionRecord, ExtensionStatus, InventoryProvider, UpdateApplier,
    };
    pub use crate::orchestrator::UpdateOrchestrator;
    pub use crate::outcome::{RunStatus, RunSummary};
    pub use crate::scheduler::UpdateScheduler;
}
