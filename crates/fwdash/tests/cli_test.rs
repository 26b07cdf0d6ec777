//! Integration tests for the `fwdash` CLI binary.
//!
//! These tests validate argument parsing, help output, shell completions,
//! error handling and a SQLite store round trip, all without a live device.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `fwdash` binary with env isolation.
///
/// Clears all `FWDASH_*` env vars and points config and data directories
/// into `home` so tests never touch the user's real configuration.
fn fwdash_cmd(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("fwdash");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_DATA_HOME", home.join("data"))
        .env("FWDASH_CONFIG", home.join("config.toml"))
        .env("FWDASH_STORE_PATH", home.join("store.db"))
        .env("FWDASH_VAULT__ITERATIONS", "1000")
        .env_remove("FWDASH_OUTPUT")
        .env_remove("FWDASH_INSECURE")
        .env_remove("FWDASH_TIMEOUT")
        .env_remove("FWDASH_MASTER_PASSPHRASE")
        .env_remove("FWDASH_NEW_MASTER_PASSPHRASE")
        .env_remove("FWDASH_DEVICE_PASSWORD")
        .env_remove("FWDASH_DEVICE_KEY")
        .env_remove("RUST_LOG");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let home = TempDir::new().unwrap();
    let output = fwdash_cmd(home.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    let home = TempDir::new().unwrap();
    fwdash_cmd(home.path()).arg("--help").assert().success().stdout(
        predicate::str::contains("firewall")
            .and(predicate::str::contains("sites"))
            .and(predicate::str::contains("devices"))
            .and(predicate::str::contains("objects")),
    );
}

#[test]
fn test_version_flag() {
    let home = TempDir::new().unwrap();
    fwdash_cmd(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("fwdash"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    let home = TempDir::new().unwrap();
    fwdash_cmd(home.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    let home = TempDir::new().unwrap();
    fwdash_cmd(home.path())
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let home = TempDir::new().unwrap();
    let output = fwdash_cmd(home.path()).arg("foobar").output().unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("unrecognized") || text.contains("foobar"),
        "Expected error mentioning invalid subcommand:\n{text}"
    );
}

#[test]
fn test_devices_list_without_passphrase() {
    let home = TempDir::new().unwrap();
    let output = fwdash_cmd(home.path())
        .args(["devices", "list"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
    let text = combined_output(&output);
    assert!(
        text.contains("passphrase"),
        "Expected passphrase hint:\n{text}"
    );
}

#[test]
fn test_invalid_config_is_a_usage_error() {
    let home = TempDir::new().unwrap();
    std::fs::write(
        home.path().join("config.toml"),
        "[registry]\nvendor = \"cisco\"\n",
    )
    .unwrap();
    let output = fwdash_cmd(home.path())
        .args(["config", "validate"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("registry.vendor"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_follows_flag() {
    let home = TempDir::new().unwrap();
    fwdash_cmd(home.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_validate_defaults() {
    let home = TempDir::new().unwrap();
    fwdash_cmd(home.path())
        .args(["config", "validate"])
        .assert()
        .success();
}

#[test]
fn test_config_test_store_creates_database() {
    let home = TempDir::new().unwrap();
    let output = fwdash_cmd(home.path())
        .args(["config", "test-store"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    assert!(combined_output(&output).contains("Store OK"));
    assert!(home.path().join("store.db").exists());
}

#[test]
fn test_config_test_store_unwritable_location() {
    let home = TempDir::new().unwrap();
    let blocker = home.path().join("blocker");
    std::fs::write(&blocker, "not a directory").unwrap();

    let output = fwdash_cmd(home.path())
        .args(["config", "test-store", "--store"])
        .arg(blocker.join("store.db"))
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(combined_output(&output).contains("Record store error"));
}

// ── Sites against a SQLite store ────────────────────────────────────

#[test]
fn test_site_add_then_list() {
    let home = TempDir::new().unwrap();
    fwdash_cmd(home.path())
        .args(["sites", "add", "HQ"])
        .assert()
        .success();
    fwdash_cmd(home.path())
        .args(["sites", "add", "Branch"])
        .assert()
        .success();

    fwdash_cmd(home.path())
        .args(["sites", "list", "-o", "json-compact"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains(r#""name":"HQ""#)
                .and(predicate::str::contains(r#""name":"Branch""#)),
        );
    assert!(home.path().join("store.db").exists());
}

#[test]
fn test_duplicate_site_is_rejected() {
    let home = TempDir::new().unwrap();
    fwdash_cmd(home.path())
        .args(["sites", "add", "HQ"])
        .assert()
        .success();
    let output = fwdash_cmd(home.path())
        .args(["sites", "add", "HQ"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("already exists"));
}

#[test]
fn test_delete_unknown_site() {
    let home = TempDir::new().unwrap();
    let output = fwdash_cmd(home.path())
        .args(["sites", "delete", "Nowhere", "--yes"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
}

#[test]
fn test_short_api_key_is_rejected() {
    let home = TempDir::new().unwrap();
    fwdash_cmd(home.path())
        .args(["sites", "add", "HQ"])
        .assert()
        .success();

    let output = fwdash_cmd(home.path())
        .env("FWDASH_MASTER_PASSPHRASE", "correct horse battery staple")
        .args([
            "devices",
            "add",
            "--hostname",
            "fw1.example.net",
            "--site",
            "HQ",
            "--password",
            "s3cret",
            "--key",
            "short",
        ])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("at least 32"));

    fwdash_cmd(home.path())
        .env("FWDASH_MASTER_PASSPHRASE", "correct horse battery staple")
        .args(["devices", "list", "-o", "json-compact"])
        .assert()
        .success()
        .stdout(predicate::str::contains("fw1.example.net").not());
}
