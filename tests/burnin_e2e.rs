//! End-to-end burn-in flows driving real child processes.
//!
//! Test targets are tiny shell scripts, so these run only on unix.

#![cfg(unix)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use tempfile::TempDir;

fn kiln() -> Command {
    Command::cargo_bin("kiln").expect("kiln binary should build")
}

fn write_script(dir: &TempDir, name: &str, body: &str) -> String {
    let path = dir.path().join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path.to_string_lossy().to_string()
}

fn write_manifest(dir: &TempDir, label: &str, executable: &str) -> String {
    let path = dir.path().join("manifest.json");
    let manifest = serde_json::json!({
        "test_set": {"name": "e2e_tests", "assertion": "E2E suite"},
        "test_set_tests": {
            label: {"executable": executable, "assertion": "script runs"}
        }
    });
    fs::write(&path, serde_json::to_string_pretty(&manifest).unwrap()).unwrap();
    path.to_string_lossy().to_string()
}

fn status_file(dir: &TempDir) -> String {
    dir.path().join("status.json").to_string_lossy().to_string()
}

fn state_of(status_path: &str, label: &str) -> String {
    let doc: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(status_path).unwrap()).unwrap();
    doc["tests"][label]["state"].as_str().unwrap().to_string()
}

#[test]
fn test_passing_script_burns_in_to_stable() {
    let dir = TempDir::new().unwrap();
    let script = write_script(&dir, "pass.sh", "exit 0");
    let manifest = write_manifest(&dir, "//e2e:pass_test", &script);
    let status = status_file(&dir);

    kiln()
        .args(["--status-file", &status, "promote", "//e2e:pass_test"])
        .assert()
        .success();

    kiln()
        .args([
            "--status-file",
            &status,
            "burnin",
            "--manifest",
            &manifest,
            "--timeout-secs",
            "30",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("//e2e:pass_test: stable"));

    assert_eq!(state_of(&status, "//e2e:pass_test"), "stable");
}

#[test]
fn test_failing_script_burns_in_to_flaky() {
    let dir = TempDir::new().unwrap();
    let script = write_script(&dir, "fail.sh", "echo boom >&2\nexit 1");
    let manifest = write_manifest(&dir, "//e2e:fail_test", &script);
    let status = status_file(&dir);

    kiln()
        .args(["--status-file", &status, "promote", "//e2e:fail_test"])
        .assert()
        .success();

    kiln()
        .args([
            "--status-file",
            &status,
            "burnin",
            "--manifest",
            &manifest,
            "--timeout-secs",
            "30",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("//e2e:fail_test: flaky"));

    assert_eq!(state_of(&status, "//e2e:fail_test"), "flaky");
}

#[test]
fn test_missing_executable_counts_as_failure() {
    let dir = TempDir::new().unwrap();
    let manifest = write_manifest(&dir, "//e2e:ghost_test", "/nonexistent/ghost");
    let status = status_file(&dir);

    kiln()
        .args(["--status-file", &status, "promote", "//e2e:ghost_test"])
        .assert()
        .success();

    kiln()
        .args(["--status-file", &status, "burnin", "--manifest", &manifest])
        .assert()
        .success()
        .stdout(predicate::str::contains("//e2e:ghost_test: flaky"));
}

#[test]
fn test_iteration_cap_leaves_test_undecided() {
    let dir = TempDir::new().unwrap();
    let script = write_script(&dir, "pass.sh", "exit 0");
    let manifest = write_manifest(&dir, "//e2e:slow_test", &script);
    let status = status_file(&dir);

    kiln()
        .args(["--status-file", &status, "promote", "//e2e:slow_test"])
        .assert()
        .success();

    kiln()
        .args([
            "--status-file",
            &status,
            "burnin",
            "--manifest",
            &manifest,
            "--max-iterations",
            "3",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("//e2e:slow_test: undecided"));

    assert_eq!(state_of(&status, "//e2e:slow_test"), "burning_in");
}

#[test]
fn test_regressed_stable_test_is_demoted() {
    let dir = TempDir::new().unwrap();
    let script = write_script(&dir, "toggle.sh", "exit 0");
    let manifest = write_manifest(&dir, "//e2e:toggle_test", &script);
    let status = status_file(&dir);

    // Burn the test in while it passes.
    kiln()
        .args(["--status-file", &status, "promote", "//e2e:toggle_test"])
        .assert()
        .success();
    kiln()
        .args(["--status-file", &status, "burnin", "--manifest", &manifest])
        .assert()
        .success();
    assert_eq!(state_of(&status, "//e2e:toggle_test"), "stable");

    // Regress it, then run the demotion evaluation.
    fs::write(&script, "#!/bin/sh\nexit 1\n").unwrap();
    kiln()
        .args([
            "--status-file",
            &status,
            "demote",
            "--manifest",
            &manifest,
            "//e2e:toggle_test",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("//e2e:toggle_test: demote"));

    assert_eq!(state_of(&status, "//e2e:toggle_test"), "flaky");
}

#[test]
fn test_deflake_after_fix_allows_reburn() {
    let dir = TempDir::new().unwrap();
    let script = write_script(&dir, "fixed.sh", "exit 1");
    let manifest = write_manifest(&dir, "//e2e:fixed_test", &script);
    let status = status_file(&dir);

    kiln()
        .args(["--status-file", &status, "promote", "//e2e:fixed_test"])
        .assert()
        .success();
    kiln()
        .args(["--status-file", &status, "burnin", "--manifest", &manifest])
        .assert()
        .success();
    assert_eq!(state_of(&status, "//e2e:fixed_test"), "flaky");

    // Fix the test and reset it into burn-in.
    fs::write(&script, "#!/bin/sh\nexit 0\n").unwrap();
    kiln()
        .args(["--status-file", &status, "deflake", "//e2e:fixed_test"])
        .assert()
        .success();
    kiln()
        .args(["--status-file", &status, "burnin", "--manifest", &manifest])
        .assert()
        .success()
        .stdout(predicate::str::contains("//e2e:fixed_test: stable"));
}

#[test]
fn test_probe_example_emits_parsable_telemetry() {
    // The instrumented demo program doubles as a real telemetry source.
    let dir = TempDir::new().unwrap();
    let capture = dir.path().join("capture.log");

    let output = Command::new(env!("CARGO"))
        .args([
            "run",
            "--quiet",
            "-p",
            "kiln-probe",
            "--example",
            "order_placement",
        ])
        .output()
        .expect("cargo run should execute");
    assert!(output.status.success());
    fs::write(&capture, &output.stdout).unwrap();

    let parsed = kiln()
        .args(["parse", &capture.to_string_lossy()])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&parsed).unwrap();
    assert_eq!(
        value["block_sequence"],
        serde_json::json!(["rigging", "stimulation", "checkpoint", "verdict"])
    );
    assert_eq!(value["has_rigging_failure"], false);
}
