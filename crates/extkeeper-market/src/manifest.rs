//! Installed extension manifests.
//!
//! Layout of an install root:
//!
//! ```text
//! <install_root>/
//!   weather/
//!     extension.json     { "id": "weather", "name": "weather", "version": "1.2.0", "artifact": "weather.wasm" }
//!     weather.wasm
//!   translator/
//!     extension.json
//!     ...
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MarketError, Result};

/// Manifest file name inside each extension directory.
pub const MANIFEST_FILE: &str = "extension.json";

/// Manifest of one installed extension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstalledManifest {
    /// Marketplace id (defaults to `name`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Display name, also the name the applier is called with
    #[serde(default)]
    pub name: String,
    /// Installed version
    pub version: String,
    /// Installed artifact file, relative to the extension directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

impl InstalledManifest {
    /// Identifier used to query the marketplace.
    pub fn market_id(&self) -> &str {
        self.id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .unwrap_or(self.name.trim())
    }

    /// Whether `name` refers to this extension (by name or id).
    ///
    /// Surrounding whitespace is ignored on both sides.
    pub fn answers_to(&self, name: &str) -> bool {
        let name = name.trim();
        !name.is_empty()
            && (self.name.trim() == name || self.id.as_deref().map(str::trim) == Some(name))
    }
}

/// An extension directory found under the install root.
#[derive(Debug, Clone)]
pub struct InstalledEntry {
    /// Extension directory
    pub dir: PathBuf,
    /// Parsed manifest, or why it could not be parsed
    pub manifest: std::result::Result<InstalledManifest, String>,
}

impl InstalledEntry {
    /// Directory name, used to identify entries whose manifest is broken.
    pub fn dir_name(&self) -> String {
        self.dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// Read `extension.json` from an extension directory.
pub fn read_manifest(dir: &Path) -> Result<InstalledManifest> {
    let path = dir.join(MANIFEST_FILE);
    let content = std::fs::read_to_string(&path)?;
    serde_json::from_str(&content)
        .map_err(|e| MarketError::InvalidManifest(format!("{}: {}", path.display(), e)))
}

/// Rewrite `extension.json` atomically.
pub fn write_manifest(dir: &Path, manifest: &InstalledManifest) -> Result<()> {
    let body = serde_json::to_vec_pretty(manifest)?;
    write_atomic(&dir.join(MANIFEST_FILE), &body)
}

/// List extension directories in file-name order.
///
/// Directories without a manifest are ignored. Fails only when the root
/// itself cannot be read.
pub fn scan_installed(root: &Path) -> Result<Vec<InstalledEntry>> {
    let mut dirs: Vec<PathBuf> = std::fs::read_dir(root)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir() && path.join(MANIFEST_FILE).is_file())
        .collect();
    dirs.sort();

    Ok(dirs
        .into_iter()
        .map(|dir| {
            let manifest = read_manifest(&dir).map_err(|e| e.to_string());
            InstalledEntry { dir, manifest }
        })
        .collect())
}

/// Find the installed extension answering to `name`.
pub fn find_installed(root: &Path, name: &str) -> Result<(PathBuf, InstalledManifest)> {
    scan_installed(root)?
        .into_iter()
        .find_map(|entry| match entry.manifest {
            Ok(manifest) if manifest.answers_to(name) => Some((entry.dir, manifest)),
            _ => None,
        })
        .ok_or_else(|| MarketError::NotFound(format!("extension '{}' is not installed", name)))
}

/// Write `bytes` to `path` through a temp file in the same directory.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.persist(path)?;
    Ok(())
}
