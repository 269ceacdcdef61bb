//! Marketplace-backed update applier.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use extkeeper_core::{MarketConfig, UpdateApplier};

use crate::client::{MarketClient, MarketplaceExtensionMetadata};
use crate::error::{MarketError, Result};
use crate::manifest::{find_installed, write_atomic, write_manifest, InstalledManifest};
use crate::platform::{detect_platform, select_build};

/// Downloads the newest marketplace build of an installed extension and
/// swaps it in place.
pub struct MarketApplier {
    install_root: PathBuf,
    market: MarketConfig,
    client: MarketClient,
    platform: String,
}

impl MarketApplier {
    /// Create an applier whose default client goes direct.
    pub fn new(install_root: impl Into<PathBuf>, market: MarketConfig) -> Result<Self> {
        let client = MarketClient::new(&market, None)?;
        Ok(Self {
            install_root: install_root.into(),
            market,
            client,
            platform: detect_platform().to_string(),
        })
    }

    /// Override the platform key used for build selection.
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    pub fn install_root(&self) -> &Path {
        &self.install_root
    }

    async fn apply(&self, name: &str, proxy: Option<&str>) -> Result<InstalledManifest> {
        let (dir, manifest) = find_installed(&self.install_root, name)?;

        let proxied;
        let client = match proxy {
            Some(proxy) => {
                proxied = MarketClient::new(&self.market, Some(proxy))?;
                &proxied
            }
            None => &self.client,
        };

        let metadata = client.fetch_metadata(manifest.market_id()).await?;
        let (build_key, build) =
            select_build(&metadata.builds, &self.platform).ok_or_else(|| MarketError::NoBuild {
                id: metadata.id.clone(),
                platform: self.platform.clone(),
            })?;
        tracing::debug!(
            extension = name,
            build = build_key,
            version = %metadata.version,
            "Selected build"
        );

        let bytes = client.download(build).await?;
        let artifact = build
            .file_name()
            .map(str::to_string)
            .or_else(|| manifest.artifact.clone())
            .unwrap_or_else(|| format!("{}.{}", manifest.market_id(), build_key));

        install_package(&dir, manifest, &metadata, &artifact, &bytes)
    }
}

#[async_trait]
impl UpdateApplier for MarketApplier {
    async fn update(&self, name: &str, proxy: Option<&str>) -> extkeeper_core::Result<()> {
        let installed = self.apply(name, proxy).await.map_err(|e| {
            extkeeper_core::UpdaterError::apply(name, e.to_string())
        })?;
        tracing::debug!(extension = name, version = %installed.version, "Installed new build");
        Ok(())
    }
}

/// Write `bytes` as the extension's artifact and bump its manifest.
///
/// The artifact is replaced before the manifest, so a failure leaves the old
/// version recorded. A previous artifact under a different file name is
/// removed afterwards.
pub fn install_package(
    dir: &Path,
    mut manifest: InstalledManifest,
    metadata: &MarketplaceExtensionMetadata,
    artifact: &str,
    bytes: &[u8],
) -> Result<InstalledManifest> {
    if artifact.contains(['/', '\\']) || artifact == ".." {
        return Err(MarketError::InvalidManifest(format!(
            "artifact name '{}' escapes the extension directory",
            artifact
        )));
    }

    write_atomic(&dir.join(artifact), bytes)?;

    let previous = manifest.artifact.replace(artifact.to_string());
    manifest.version = metadata.version.clone();
    if manifest.description.is_none() && !metadata.description.is_empty() {
        manifest.description = Some(metadata.description.clone());
    }
    write_manifest(dir, &manifest)?;

    if let Some(previous) = previous.filter(|p| p != artifact && !p.contains(['/', '\\'])) {
        if let Err(e) = std::fs::remove_file(dir.join(&previous)) {
            tracing::warn!(artifact = %previous, error = %e, "Failed to remove previous artifact");
        }
    }

    Ok(manifest)
}
