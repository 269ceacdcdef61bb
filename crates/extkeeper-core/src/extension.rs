//! Installed-extension records and the collaborator traits.
//!
//! The orchestrator talks to the outside world through two seams:
//! - [`InventoryProvider`] lists installed extensions with their update status
//! - [`UpdateApplier`] installs the newest version of one extension
//!
//! Both are async and object-safe so hosts can hand in `Arc<dyn ...>`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Update status computed by the inventory provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtensionStatus {
    /// Installed version matches the newest known version
    UpToDate,
    /// A newer version is available
    NeedUpdate,
    /// Status could not be determined
    Unknown,
    /// The version check itself failed
    Error,
}

impl ExtensionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtensionStatus::UpToDate => "up_to_date",
            ExtensionStatus::NeedUpdate => "need_update",
            ExtensionStatus::Unknown => "unknown",
            ExtensionStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for ExtensionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One installed extension as reported by the inventory provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionRecord {
    /// Extension name (may be missing for a malformed entry)
    #[serde(default)]
    pub name: Option<String>,
    /// Computed update status
    pub status: ExtensionStatus,
    /// Installed version, when known
    #[serde(default)]
    pub installed_version: Option<String>,
    /// Newest available version, when known
    #[serde(default)]
    pub latest_version: Option<String>,
    /// Where the extension lives on disk
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Free-form detail (usually why the status is `Error` or `Unknown`)
    #[serde(default)]
    pub detail: Option<String>,
}

impl ExtensionRecord {
    /// Create a record with just a name and status.
    pub fn new(name: impl Into<String>, status: ExtensionStatus) -> Self {
        Self {
            name: Some(name.into()),
            status,
            installed_version: None,
            latest_version: None,
            path: None,
            detail: None,
        }
    }

    /// Create a record that carries no name.
    pub fn unnamed(status: ExtensionStatus) -> Self {
        Self {
            name: None,
            status,
            installed_version: None,
            latest_version: None,
            path: None,
            detail: None,
        }
    }

    pub fn with_versions(
        mut self,
        installed: Option<String>,
        latest: Option<String>,
    ) -> Self {
        self.installed_version = installed;
        self.latest_version = latest;
        self
    }

    pub fn with_path(mut self, path: PathBuf) -> Self {
        self.path = Some(path);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Usable name: `None` when missing, empty or whitespace only.
    pub fn name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    pub fn needs_update(&self) -> bool {
        self.status == ExtensionStatus::NeedUpdate
    }
}

/// Lists installed extensions and their update status.
#[async_trait]
pub trait InventoryProvider: Send + Sync {
    /// Build the inventory for `root`, in a stable order.
    async fn build_extension_list(&self, root: &Path) -> Result<Vec<ExtensionRecord>>;
}

/// Installs the newest version of a single extension.
#[async_trait]
pub trait UpdateApplier: Send + Sync {
    /// Update `name`; `proxy` of `None` means the applier's default transport.
    async fn update(&self, name: &str, proxy: Option<&str>) -> Result<()>;
}

/// Shared inventory provider.
pub type DynInventoryProvider = Arc<dyn InventoryProvider>;

/// Shared update applier.
pub type DynUpdateApplier = Arc<dyn UpdateApplier>;
