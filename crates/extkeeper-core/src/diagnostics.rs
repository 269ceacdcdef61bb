//! Test-mode inventory dump.

use std::path::Path;

use chrono::Utc;

use crate::error::Result;
use crate::extension::ExtensionRecord;

/// Write the raw inventory to `path`, replacing any previous dump.
pub fn dump_inventory(path: &Path, inventory: &[ExtensionRecord]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let body = serde_json::to_string_pretty(inventory)?;
    let content = format!(
        "Recorded at {}\n\n```json\n{}\n```\n",
        Utc::now().to_rfc3339(),
        body
    );
    std::fs::write(path, content)?;
    Ok(())
}
