//! Marketplace HTTP client.

use std::collections::HashMap;

use extkeeper_core::MarketConfig;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{MarketError, Result};

/// Extension metadata published by the marketplace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketplaceExtensionMetadata {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub builds: HashMap<String, ExtensionBuild>,
}

/// Extension build info for different platforms
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionBuild {
    pub url: String,
    #[serde(default)]
    pub sha256: String,
    #[serde(default)]
    pub size: usize,
}

impl ExtensionBuild {
    /// File name at the end of the download URL.
    pub fn file_name(&self) -> Option<&str> {
        self.url
            .split(['?', '#'])
            .next()
            .and_then(|path| path.rsplit('/').next())
            .filter(|name| !name.is_empty())
    }
}

/// Thin client over the marketplace's raw-content layout.
#[derive(Debug, Clone)]
pub struct MarketClient {
    client: reqwest::Client,
    config: MarketConfig,
}

impl MarketClient {
    /// Build a client, optionally routed through `proxy`.
    pub fn new(config: &MarketConfig, proxy: Option<&str>) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone());

        // Only the configured proxy is used, never HTTP(S)_PROXY from the environment.
        builder = match proxy {
            Some(proxy) => {
                let proxy = reqwest::Proxy::all(proxy).map_err(|e| MarketError::InvalidProxy {
                    proxy: proxy.to_string(),
                    message: e.to_string(),
                })?;
                builder.proxy(proxy)
            }
            None => builder.no_proxy(),
        };

        let client = builder.build()?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    pub fn config(&self) -> &MarketConfig {
        &self.config
    }

    /// URL of the metadata document for `id`.
    pub fn metadata_url(&self, id: &str) -> String {
        format!(
            "{}/{}/extensions/{}/metadata.json",
            self.config.base_url.trim_end_matches('/'),
            self.config.branch,
            id
        )
    }

    /// Fetch metadata for one extension.
    pub async fn fetch_metadata(&self, id: &str) -> Result<MarketplaceExtensionMetadata> {
        let url = self.metadata_url(id);
        tracing::debug!(extension = id, url = %url, "Fetching marketplace metadata");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(MarketError::NotFound(format!(
                "extension '{}' is not in the marketplace",
                id
            )));
        }
        if !status.is_success() {
            return Err(MarketError::Http {
                status: status.as_u16(),
                url,
            });
        }

        let metadata: MarketplaceExtensionMetadata = response
            .json()
            .await
            .map_err(|e| MarketError::InvalidManifest(format!("{}: {}", url, e)))?;
        Ok(metadata)
    }

    /// Download a build, checking its size and checksum when published.
    pub async fn download(&self, build: &ExtensionBuild) -> Result<Vec<u8>> {
        tracing::info!(url = %build.url, "Downloading extension package");

        let response = self.client.get(&build.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MarketError::Http {
                status: status.as_u16(),
                url: build.url.clone(),
            });
        }

        let bytes = response.bytes().await?.to_vec();
        if build.size > 0 && bytes.len() != build.size {
            return Err(MarketError::Size {
                expected: build.size,
                actual: bytes.len(),
            });
        }
        verify_checksum(&bytes, &build.sha256)?;
        Ok(bytes)
    }
}

/// Compute SHA256 checksum of file content
pub fn compute_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Check `data` against `expected`; an empty expectation always passes.
pub fn verify_checksum(data: &[u8], expected: &str) -> Result<()> {
    if expected.is_empty() {
        return Ok(());
    }
    let actual = compute_sha256(data);
    if !actual.eq_ignore_ascii_case(expected) {
        return Err(MarketError::Checksum {
            expected: expected.to_string(),
            actual,
        });
    }
    Ok(())
}
