//! Command-specific CLI tests.

use std::path::{Path, PathBuf};

mod command_test;
mod list_test;
mod run_test;

/// Write a config file into `dir` pointing at `install_root`.
pub fn write_config(dir: &Path, install_root: &Path, extra: &str) -> PathBuf {
    let path = dir.join("extkeeper.toml");
    let body = format!(
        "install_root = {:?}\n{}\n",
        install_root.display().to_string(),
        extra
    );
    std::fs::write(&path, body).unwrap();
    path
}
