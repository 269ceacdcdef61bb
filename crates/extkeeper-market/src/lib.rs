//! Marketplace-backed collaborators for extkeeper.
//!
//! [`MarketInventory`] compares installed extension manifests with the
//! marketplace index, and [`MarketApplier`] downloads and installs newer
//! builds. Both plug into `extkeeper_core::UpdateOrchestrator`.

pub mod applier;
pub mod client;
pub mod error;
pub mod inventory;
pub mod manifest;
pub mod platform;

pub use applier::{install_package, MarketApplier};
pub use client::{compute_sha256, ExtensionBuild, MarketClient, MarketplaceExtensionMetadata};
pub use error::{MarketError, Result};
pub use inventory::{is_newer, MarketInventory};
pub use manifest::{scan_installed, InstalledEntry, InstalledManifest, MANIFEST_FILE};
pub use platform::detect_platform;
