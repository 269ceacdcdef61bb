//! Marketplace-backed inventory.

use std::cmp::Ordering;
use std::path::Path;

use async_trait::async_trait;
use extkeeper_core::{ExtensionRecord, ExtensionStatus, InventoryProvider};

use crate::client::{MarketClient, MarketplaceExtensionMetadata};
use crate::error::Result;
use crate::manifest::{scan_installed, InstalledEntry};

/// Lists installed extensions and checks each one against the marketplace.
pub struct MarketInventory {
    client: MarketClient,
}

impl MarketInventory {
    pub fn new(client: MarketClient) -> Self {
        Self { client }
    }

    async fn check_entry(&self, entry: InstalledEntry) -> ExtensionRecord {
        let remote = match &entry.manifest {
            Ok(manifest) => Some(self.client.fetch_metadata(manifest.market_id()).await),
            Err(_) => None,
        };
        record_for(entry, remote)
    }
}

#[async_trait]
impl InventoryProvider for MarketInventory {
    async fn build_extension_list(
        &self,
        root: &Path,
    ) -> extkeeper_core::Result<Vec<ExtensionRecord>> {
        let entries = scan_installed(root)?;
        tracing::debug!(
            count = entries.len(),
            root = %root.display(),
            "Checking installed extensions"
        );

        let mut records = Vec::with_capacity(entries.len());
        for entry in entries {
            records.push(self.check_entry(entry).await);
        }
        Ok(records)
    }
}

/// Build the inventory record for one installed entry.
///
/// `remote` is `None` when the manifest could not be parsed and nothing was
/// fetched.
pub fn record_for(
    entry: InstalledEntry,
    remote: Option<Result<MarketplaceExtensionMetadata>>,
) -> ExtensionRecord {
    let manifest = match entry.manifest {
        Ok(manifest) => manifest,
        Err(e) => {
            return ExtensionRecord::unnamed(ExtensionStatus::Unknown)
                .with_path(entry.dir)
                .with_detail(e);
        }
    };

    let base = ExtensionRecord::new(manifest.name.clone(), ExtensionStatus::Unknown)
        .with_path(entry.dir);

    match remote {
        Some(Ok(metadata)) => {
            let status = if is_newer(&manifest.version, &metadata.version) {
                ExtensionStatus::NeedUpdate
            } else {
                ExtensionStatus::UpToDate
            };
            ExtensionRecord { status, ..base }
                .with_versions(Some(manifest.version), Some(metadata.version))
        }
        Some(Err(e)) => {
            tracing::debug!(extension = %manifest.name, error = %e, "Marketplace check failed");
            ExtensionRecord {
                status: ExtensionStatus::Error,
                ..base
            }
            .with_versions(Some(manifest.version), None)
            .with_detail(e.to_string())
        }
        None => base.with_versions(Some(manifest.version), None),
    }
}

/// Whether `latest` is a newer release than `installed`.
///
/// Uses semver ordering; when either side is not valid semver any difference
/// counts as newer.
pub fn is_newer(installed: &str, latest: &str) -> bool {
    match compare_versions(installed, latest) {
        Some(ordering) => ordering == Ordering::Less,
        None => installed.trim() != latest.trim(),
    }
}

fn compare_versions(installed: &str, latest: &str) -> Option<Ordering> {
    let installed = parse_version(installed)?;
    let latest = parse_version(latest)?;
    Some(installed.cmp(&latest))
}

fn parse_version(version: &str) -> Option<semver::Version> {
    let version = version.trim();
    let version = version.strip_prefix('v').unwrap_or(version);
    semver::Version::parse(version).ok()
}
