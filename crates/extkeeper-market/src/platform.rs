//! Build selection for the running platform.

use std::collections::HashMap;

use crate::client::ExtensionBuild;

/// Build key for WASM packages, usable on every platform.
pub const WASM_BUILD: &str = "wasm";

/// Detect current platform for extension download
pub fn detect_platform() -> &'static str {
    #[cfg(all(target_os = "macos", target_arch = "aarch64"))]
    {
        "darwin-aarch64"
    }

    #[cfg(all(target_os = "macos", target_arch = "x86_64"))]
    {
        "darwin-x86_64"
    }

    #[cfg(all(target_os = "linux", target_arch = "x86_64"))]
    {
        "linux-x86_64"
    }

    #[cfg(all(target_os = "linux", target_arch = "aarch64"))]
    {
        "linux-aarch64"
    }

    #[cfg(all(target_os = "windows", target_arch = "x86_64"))]
    {
        "windows-x86_64"
    }

    #[cfg(not(any(
        all(target_os = "macos", target_arch = "aarch64"),
        all(target_os = "macos", target_arch = "x86_64"),
        all(target_os = "linux", target_arch = "x86_64"),
        all(target_os = "linux", target_arch = "aarch64"),
        all(target_os = "windows", target_arch = "x86_64")
    )))]
    {
        "unknown"
    }
}

/// Pick the build to install: WASM when published, else the platform build.
pub fn select_build<'a>(
    builds: &'a HashMap<String, ExtensionBuild>,
    platform: &str,
) -> Option<(&'a str, &'a ExtensionBuild)> {
    builds
        .get_key_value(WASM_BUILD)
        .or_else(|| builds.get_key_value(platform))
        .map(|(key, build)| (key.as_str(), build))
}
