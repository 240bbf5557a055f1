//! Integration tests for the CLI interface

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

fn controller(config: &NamedTempFile) -> Command {
    let mut cmd = Command::cargo_bin("batch-controller").unwrap();
    cmd.env_remove("BATCH_CONTROLLER_ENDPOINT")
        .env_remove("BATCH_CONTROLLER_ACCESS_TOKEN")
        .env_remove("BATCH_CONTROLLER_LOG_LEVEL")
        .arg("--config")
        .arg(config.path());
    cmd
}

fn empty_config() -> NamedTempFile {
    NamedTempFile::new().unwrap()
}

#[test]
fn test_no_subcommand_prints_usage_and_fails() {
    let mut cmd = Command::cargo_bin("batch-controller").unwrap();
    cmd.assert()
        .failure()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("Commands:"));
}

#[test]
fn test_help_lists_workloads() {
    let mut cmd = Command::cargo_bin("batch-controller").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("workflow-fs"))
        .stdout(predicate::str::contains("pool"));
}

#[test]
fn test_dry_run_prints_job_json() {
    let config = empty_config();
    controller(&config)
        .args(["--dry-run", "workflow", "-s", "0", "-w", "1000", "-t", "4"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"pool_id\": \"azfinsim-pool\""))
        .stdout(predicate::str::contains("\"id\": \"workflow-"))
        .stdout(predicate::str::contains("price-3"))
        .stdout(predicate::str::contains("--start-trade 750 --trade-window 250"));
}

#[test]
fn test_invalid_partition_exit_code() {
    let config = empty_config();
    controller(&config)
        .args(["--dry-run", "job", "-w", "3", "-t", "5"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("E2001"));
}

#[test]
fn test_negative_tasks_rejected() {
    let config = empty_config();
    controller(&config)
        .args(["--dry-run", "cache", "-w", "10", "-t", "-1"])
        .assert()
        .code(3);
}

#[test]
fn test_synthetic_knobs_need_synthetic_algorithm() {
    let config = empty_config();
    controller(&config)
        .args(["--dry-run", "job", "-w", "10", "--mem-usage", "64"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("synthetic"));
}

#[test]
fn test_missing_endpoint_fails_before_network() {
    let config = empty_config();
    controller(&config)
        .args(["job", "-w", "10"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("batch endpoint"));
}

#[test]
fn test_missing_config_file() {
    let mut cmd = Command::cargo_bin("batch-controller").unwrap();
    cmd.args(["--config", "/nonexistent/batch-controller.yml", "--dry-run", "cache"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("E1001"));
}

#[test]
fn test_config_file_sets_pool_names() {
    let mut config = empty_config();
    writeln!(config, "pools:\n  lulesh_catalyst: sim-pool\ncontainer:\n  registry: myacr").unwrap();

    controller(&config)
        .args(["--dry-run", "catalyst", "--size", "20"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"pool_id\": \"sim-pool\""))
        .stdout(predicate::str::contains(
            "myacr.azurecr.io/lulesh/lulesh-catalyst:latest",
        ));
}

#[test]
fn test_pool_dry_run() {
    let config = empty_config();
    controller(&config)
        .args(["--dry-run", "pool", "--app", "trame", "--resize", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("trame-pool"));
}

#[test]
fn test_unreachable_service_hints_retry() {
    let config = empty_config();
    controller(&config)
        .env("BATCH_CONTROLLER_ACCESS_TOKEN", "token")
        .args(["-e", "http://127.0.0.1:1", "cache", "-w", "10"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("E3005"))
        .stderr(predicate::str::contains("retrying may succeed"));
}
