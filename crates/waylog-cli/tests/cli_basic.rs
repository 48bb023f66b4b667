//! Basic CLI E2E tests.
//!
//! Tests invoke CLI commands via cargo run (against the dev data
//! directory) and verify outputs.

use std::process::Command;

/// Run a CLI command and return (exit code, stdout, stderr).
fn run_cli(args: &[&str]) -> (i32, String, String) {
    let output = Command::new("cargo")
        .args(["run", "-p", "waylog-cli", "--"])
        .args(args)
        .env("WAYLOG_ENV", "dev")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (code, stdout, stderr)
}

#[test]
fn test_config_list() {
    let (code, stdout, _) = run_cli(&["config", "list"]);
    assert_eq!(code, 0, "config list failed");
    assert!(stdout.contains("fetch_interval_ms"));
    assert!(stdout.contains("notify_enabled"));
}

#[test]
fn test_config_get() {
    let (code, stdout, _) = run_cli(&["config", "get", "fetch_timeout_ms"]);
    assert_eq!(code, 0, "config get failed");
    assert!(!stdout.trim().is_empty());
}

#[test]
fn test_config_get_unknown_key_fails() {
    let (code, _, stderr) = run_cli(&["config", "get", "no_such_key"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("unknown settings key"));
}

#[test]
fn test_config_set_roundtrip() {
    let (code, _, _) = run_cli(&["config", "set", "high_accuracy", "true"]);
    assert_eq!(code, 0, "config set failed");
    let (code, stdout, _) = run_cli(&["config", "get", "high_accuracy"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "true");
}

#[test]
fn test_track_status_is_json() {
    let (code, stdout, _) = run_cli(&["track", "status"]);
    assert_eq!(code, 0, "track status failed");
    let parsed: serde_json::Value =
        serde_json::from_str(&stdout).expect("status output should be JSON");
    assert_eq!(parsed["type"], "StateSnapshot");
}

#[test]
fn test_locations_list() {
    let (code, stdout, _) = run_cli(&["locations", "list"]);
    assert_eq!(code, 0, "locations list failed");
    assert!(stdout.contains("location(s)"));
}

#[test]
fn test_track_run_records_fixes() {
    let (code, stdout, _) = run_cli(&[
        "track", "run", "--fixes", "3", "--interval-ms", "50", "--seed", "7",
    ]);
    assert_eq!(code, 0, "track run failed");
    assert!(stdout.contains("\"type\":\"SampleRecorded\""));
    assert!(stdout.contains("notifications fired:"));
}
