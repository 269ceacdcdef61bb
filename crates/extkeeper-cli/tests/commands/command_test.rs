//! Tests for the `command` subcommand.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

use super::write_config;

fn fixture() -> (TempDir, std::path::PathBuf) {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("extensions");
    std::fs::create_dir_all(&root).unwrap();
    let config = write_config(dir.path(), &root, "admins = [\"alice\"]");
    (dir, config)
}

/// Admins get the acknowledgment and then the summary.
#[test]
fn test_command_admin() {
    let (_dir, config) = fixture();

    let mut cmd = Command::cargo_bin("extkeeper").unwrap();
    cmd.arg("--config")
        .arg(&config)
        .arg("command")
        .arg("update all extensions")
        .arg("--sender")
        .arg("alice");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("please wait"))
        .stdout(predicate::str::contains("no updates needed"));
}

/// Aliases are accepted.
#[test]
fn test_command_alias() {
    let (_dir, config) = fixture();

    let mut cmd = Command::cargo_bin("extkeeper").unwrap();
    cmd.arg("--config")
        .arg(&config)
        .arg("command")
        .arg("/update-all")
        .arg("--sender")
        .arg("alice");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("no updates needed"));
}

/// Non-admins are denied.
#[test]
fn test_command_non_admin() {
    let (_dir, config) = fixture();

    let mut cmd = Command::cargo_bin("extkeeper").unwrap();
    cmd.arg("--config")
        .arg(&config)
        .arg("command")
        .arg("update all extensions")
        .arg("--sender")
        .arg("mallory");

    cmd.assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("permission denied"))
        .stdout(predicate::str::contains("please wait").not());
}

/// Unrelated text is not a command.
#[test]
fn test_command_not_matched() {
    let (_dir, config) = fixture();

    let mut cmd = Command::cargo_bin("extkeeper").unwrap();
    cmd.arg("--config")
        .arg(&config)
        .arg("command")
        .arg("hello")
        .arg("--sender")
        .arg("alice");

    cmd.assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("Unknown command"));
}

/// The sender is required.
#[test]
fn test_command_requires_sender() {
    let mut cmd = Command::cargo_bin("extkeeper").unwrap();
    cmd.arg("command").arg("update all extensions");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("--sender"));
}
