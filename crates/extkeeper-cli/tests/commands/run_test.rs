//! Tests for the `run` command.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

use super::write_config;

/// An empty install root needs no updates.
#[test]
fn test_run_empty_root() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("extensions");
    std::fs::create_dir_all(&root).unwrap();
    let config = write_config(dir.path(), &root, "");

    let mut cmd = Command::cargo_bin("extkeeper").unwrap();
    cmd.arg("--config").arg(&config).arg("run");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("no updates needed"));
}

/// A missing install root fails the run and names the path.
#[test]
fn test_run_missing_root() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("not-there");

    let mut cmd = Command::cargo_bin("extkeeper").unwrap();
    cmd.arg("--config")
        .arg(dir.path().join("absent.toml"))
        .arg("--install-root")
        .arg(&missing)
        .arg("run");

    cmd.assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("install root not found"))
        .stdout(predicate::str::contains("not-there"));
}

/// Test mode dumps the inventory to the diagnostics path.
#[test]
fn test_run_test_mode_writes_inventory() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("extensions");
    std::fs::create_dir_all(&root).unwrap();
    let dump = dir.path().join("inventory.md");
    let config = write_config(
        dir.path(),
        &root,
        &format!(
            "test_mode = true\ndiagnostics_path = {:?}",
            dump.display().to_string()
        ),
    );

    let mut cmd = Command::cargo_bin("extkeeper").unwrap();
    cmd.arg("--config").arg(&config).arg("run");

    cmd.assert().success();
    let content = std::fs::read_to_string(&dump).unwrap();
    assert!(content.contains("Recorded at"));
    assert!(content.contains("[]"));
}

/// Install root given through the environment.
#[test]
fn test_run_install_root_from_env() {
    let dir = TempDir::new().unwrap();

    let mut cmd = Command::cargo_bin("extkeeper").unwrap();
    cmd.env("EXTKEEPER_INSTALL_ROOT", dir.path())
        .arg("--config")
        .arg(dir.path().join("absent.toml"))
        .arg("run");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("no updates needed"));
}

/// A malformed proxy is rejected as a configuration error before any cycle.
#[test]
fn test_run_rejects_malformed_proxy() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("extensions");
    std::fs::create_dir_all(&root).unwrap();
    let config = write_config(dir.path(), &root, "proxy_address = \"127.0.0.1:7890\"");

    let mut cmd = Command::cargo_bin("extkeeper").unwrap();
    cmd.arg("--config").arg(&config).arg("run");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("configuration error"))
        .stderr(predicate::str::contains("proxy_address"))
        .stdout(predicate::str::contains("no updates needed").not());
}

/// An interval too large to schedule is rejected instead of crashing.
#[test]
fn test_daemon_rejects_huge_interval() {
    let dir = TempDir::new().unwrap();

    let mut cmd = Command::cargo_bin("extkeeper").unwrap();
    cmd.env("EXTKEEPER_INTERVAL_HOURS", "1e20")
        .arg("--config")
        .arg(dir.path().join("absent.toml"))
        .arg("--install-root")
        .arg(dir.path())
        .arg("daemon");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("interval_hours is too large"))
        .stderr(predicate::str::contains("panicked").not());
}
