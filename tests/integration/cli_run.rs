//! The `freight-link` binary: probe, send and run

use super::helpers::{freight_link, RecordingEndpoint};
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_probe_exit_codes() {
    let temp = TempDir::new().unwrap();
    let socket = temp.path().join("d.sock");

    let absent = freight_link(&socket).arg("probe").output().unwrap();
    assert_eq!(absent.status.code(), Some(1));

    let _endpoint = RecordingEndpoint::start(&socket);
    let present = freight_link(&socket).arg("probe").output().unwrap();
    assert_eq!(present.status.code(), Some(0));
}

#[test]
fn test_run_success_reports_ok() {
    let temp = TempDir::new().unwrap();
    let endpoint = RecordingEndpoint::start(&temp.path().join("d.sock"));

    let output = freight_link(endpoint.path())
        .args(["run", "--tool", "scan", "--dir", "/data/a", "--", "true"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(0));

    assert!(endpoint.wait_for(Duration::from_secs(5), |lines| lines.len() >= 3));
    endpoint.settle();
    let lines = endpoint.lines();
    assert_eq!(lines.len(), 3, "unexpected lines: {lines:?}");
    assert!(lines[0].starts_with("HELLO freight/0.1.0 "));
    assert_eq!(lines[1], "START tool=scan dir=/data/a");
    assert_eq!(lines[2], "STOP tool=scan dir=/data/a status=ok");
}

#[test]
fn test_run_failure_reports_exit_code() {
    let temp = TempDir::new().unwrap();
    let endpoint = RecordingEndpoint::start(&temp.path().join("d.sock"));

    let output = freight_link(endpoint.path())
        .args(["run", "--tool", "migrate", "--dir", "/b", "--", "false"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));

    assert!(endpoint.wait_for(Duration::from_secs(5), |lines| {
        lines.iter().any(|l| l.starts_with("STOP "))
    }));
    endpoint.settle();
    assert_eq!(
        endpoint.lines_starting_with("STOP "),
        vec!["STOP tool=migrate dir=/b status=failed msg=exit-1".to_string()]
    );
}

#[test]
fn test_run_without_coordinator_still_runs() {
    let temp = TempDir::new().unwrap();
    let marker = temp.path().join("ran");

    let output = freight_link(&temp.path().join("absent.sock"))
        .args(["run", "--tool", "scan", "--dir", "/a", "--", "touch"])
        .arg(&marker)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0));
    assert!(marker.exists());
}

#[test]
fn test_run_require_daemon_fails_fast() {
    let temp = TempDir::new().unwrap();
    let marker = temp.path().join("ran");

    let output = freight_link(&temp.path().join("absent.sock"))
        .args(["run", "--require-daemon", "--tool", "scan", "--dir", "/a", "--", "touch"])
        .arg(&marker)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(!marker.exists());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not reachable"), "stderr: {stderr}");
}

#[test]
fn test_run_writes_json_operations_to_log_file() {
    let temp = TempDir::new().unwrap();
    let log_file = temp.path().join("freight.log");

    let output = freight_link(&temp.path().join("absent.sock"))
        .arg("--log-file")
        .arg(&log_file)
        .args(["run", "--tool", "verify", "--dir", "/v", "--", "true"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(0));

    let contents = std::fs::read_to_string(&log_file).unwrap();
    let entries: Vec<serde_json::Value> = contents
        .lines()
        .filter(|l| l.starts_with('{'))
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert!(entries
        .iter()
        .any(|e| e["message"].as_str().is_some_and(|m| m.contains("started"))));
    assert!(entries.iter().any(|e| e["status"] == "ok"));
}

#[test]
fn test_send_progress_line() {
    let temp = TempDir::new().unwrap();
    let endpoint = RecordingEndpoint::start(&temp.path().join("d.sock"));

    let output = freight_link(endpoint.path())
        .args(["send", "--tool", "migrate", "--dir", "/b"])
        .args(["progress", "--msg", "copying", "--bytes", "2048", "--percent", "50"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(0));

    assert!(endpoint.wait_for(Duration::from_secs(5), |lines| {
        lines.iter().any(|l| l.starts_with("PROGRESS "))
    }));
    assert_eq!(
        endpoint.lines_starting_with("PROGRESS "),
        vec!["PROGRESS tool=migrate dir=/b msg=copying bytes=2048 pct=50.0".to_string()]
    );
}

#[test]
fn test_send_rejects_spaced_directory() {
    let temp = TempDir::new().unwrap();

    let output = freight_link(&temp.path().join("absent.sock"))
        .args(["send", "--tool", "scan", "--dir", "my dir", "start"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_send_raw_rejects_embedded_newline() {
    let temp = TempDir::new().unwrap();
    let endpoint = RecordingEndpoint::start(&temp.path().join("d.sock"));

    let output = freight_link(endpoint.path())
        .args(["send", "--tool", "scan", "--dir", "/a", "raw"])
        .arg("PING\nSTOP tool=scan dir=/a status=ok")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    endpoint.settle();
    assert!(endpoint.lines_starting_with("STOP ").is_empty());
}

#[test]
fn test_send_raw_line_verbatim() {
    let temp = TempDir::new().unwrap();
    let endpoint = RecordingEndpoint::start(&temp.path().join("d.sock"));

    let output = freight_link(endpoint.path())
        .args(["send", "--tool", "scan", "--dir", "/a", "raw", "PING from=ops"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(0));

    assert!(endpoint.wait_for(Duration::from_secs(5), |lines| {
        lines.iter().any(|l| l == "PING from=ops")
    }));
}
