//! Integration tests for the hq-migrate binary.
//!
//! These tests exercise the actual compiled binary using assert_cmd.

use assert_cmd::Command;
use hq_test_utils::sample::{installation_v1, template_v2};
use predicates::prelude::*;

/// Get a Command for the hq-migrate binary, isolated from the caller's env
fn hq_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("hq-migrate"));
    cmd.env_remove("HQ_ROOT")
        .env_remove("HQ_TEMPLATE")
        .env_remove("RUST_LOG");
    cmd
}

// ============================================================================
// Help and Version Tests
// ============================================================================

#[test]
fn test_help_output() {
    hq_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("migrate"))
        .stdout(predicate::str::contains("list-backups"));
}

#[test]
fn test_version_output() {
    hq_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("hq-migrate"));
}

#[test]
fn test_no_command_shows_help_hint() {
    hq_cmd()
        .assert()
        .success()
        .stdout(predicate::str::contains("hq-migrate --help"));
}

// ============================================================================
// Detect
// ============================================================================

#[test]
fn test_detect_from_nested_directory() {
    let local = installation_v1();
    hq_cmd()
        .current_dir(local.join("workers/dev"))
        .arg("detect")
        .assert()
        .success()
        .stdout(predicate::str::contains("1.0.0"))
        .stdout(predicate::str::contains("file"));
}

#[test]
fn test_detect_json() {
    let local = installation_v1();
    let output = hq_cmd()
        .args(["detect", "--json", "-C"])
        .arg(local.root())
        .output()
        .unwrap();
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["version"], "1.0.0");
    assert_eq!(report["method"], "file");
}

// ============================================================================
// Plan and Migrate
// ============================================================================

#[test]
fn test_plan_to_stdout() {
    let local = installation_v1();
    let template = template_v2();
    hq_cmd()
        .current_dir(local.root())
        .args(["plan", "--template"])
        .arg(template.root())
        .assert()
        .success()
        .stdout(predicate::str::contains("# Migration Plan"))
        .stdout(predicate::str::contains("## High-Impact Changes"))
        .stdout(predicate::str::contains("Upgrading from **1.0.0** to **2.0.0**"));
    local.assert_not_exists(".hq-backup");
}

#[test]
fn test_migrate_yes_then_list_and_verify() {
    let local = installation_v1();
    let template = template_v2();

    hq_cmd()
        .current_dir(local.root())
        .args(["migrate", "--yes", "--template"])
        .arg(template.root())
        .assert()
        .success()
        .stdout(predicate::str::contains("changes applied"));
    local.assert_file_contains(".hq-version", "2.0.0");

    let output = hq_cmd()
        .current_dir(local.root())
        .args(["list-backups", "--json"])
        .output()
        .unwrap();
    let listed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let name = listed[0]["name"].as_str().unwrap().to_string();
    assert_eq!(listed[0]["manifest"]["hqVersion"], "1.0.0");

    hq_cmd()
        .current_dir(local.root())
        .args(["verify", &name])
        .assert()
        .success()
        .stdout(predicate::str::contains("VERIFIED"));

    hq_cmd()
        .current_dir(local.root())
        .args(["restore", "--yes", &name])
        .assert()
        .success();
    local.assert_file_contains(".hq-version", "1.0.0");
}

#[test]
fn test_migrate_without_terminal_is_declined() {
    let local = installation_v1();
    let template = template_v2();

    hq_cmd()
        .current_dir(local.root())
        .args(["migrate", "--template"])
        .arg(template.root())
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::contains("Cancelled"));
    local.assert_file_contains(".hq-version", "1.0.0");
    local.assert_not_exists(".hq-backup");
}

#[test]
fn test_tiny_template_aborts() {
    let local = installation_v1();
    let template = tempfile::tempdir().unwrap();
    std::fs::write(template.path().join(".hq-version"), "2.0.0\n").unwrap();

    hq_cmd()
        .current_dir(local.root())
        .args(["migrate", "--yes", "--template"])
        .arg(template.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("nothing was changed"));
    local.assert_file_contains(".hq-version", "1.0.0");
}

#[test]
fn test_verify_unknown_backup_fails() {
    let local = installation_v1();
    hq_cmd()
        .current_dir(local.root())
        .args(["verify", "20000101-000000"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Backup not found"));
}
