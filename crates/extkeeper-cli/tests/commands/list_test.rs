//! Tests for the `list` command.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Listing an empty install root.
#[test]
fn test_list_empty_root() {
    let dir = TempDir::new().unwrap();

    let mut cmd = Command::cargo_bin("extkeeper").unwrap();
    cmd.arg("--config")
        .arg(dir.path().join("absent.toml"))
        .arg("--install-root")
        .arg(dir.path())
        .arg("list");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("No extensions installed"));
}

/// Listing a missing install root is an error.
#[test]
fn test_list_missing_root() {
    let dir = TempDir::new().unwrap();

    let mut cmd = Command::cargo_bin("extkeeper").unwrap();
    cmd.arg("--config")
        .arg(dir.path().join("absent.toml"))
        .arg("--install-root")
        .arg(dir.path().join("absent"))
        .arg("list");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to list extensions"));
}
