#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const VALID_CONFIG: &str = r#"{
    "resource_groups": [
        { "resource_group": "rg-a", "subscription_id": "sub-1", "location": "eastus" }
    ]
}"#;

fn vnetflow(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("vnetflow").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("AZURE_ACCESS_TOKEN")
        .env_remove("AZURE_MANAGEMENT_ENDPOINT");
    cmd
}

/// Help lists the input file flag
#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("vnetflow").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--input-file"));
}

#[test]
fn test_input_file_is_required() {
    let dir = TempDir::new().unwrap();
    vnetflow(&dir)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--input-file"));
}

#[test]
fn test_missing_input_file() {
    let dir = TempDir::new().unwrap();
    vnetflow(&dir)
        .args(["--input-file", "does-not-exist.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does-not-exist.json"));

    assert!(!dir.path().join("output.json").exists());
}

#[test]
fn test_malformed_json() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.json");
    fs::write(&input, "{ \"resource_groups\": [").unwrap();

    vnetflow(&dir)
        .arg("--input-file")
        .arg(&input)
        .assert()
        .failure();

    assert!(!dir.path().join("output.json").exists());
}

/// Without credentials nothing is written
#[test]
fn test_missing_credentials_is_fatal() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.json");
    fs::write(&input, VALID_CONFIG).unwrap();

    vnetflow(&dir)
        .arg("--input_file")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("AZURE_ACCESS_TOKEN"));

    assert!(!dir.path().join("output.json").exists());
}
