//! SIGINT and SIGTERM while `freight-link run` is wrapping a utility

use super::helpers::{freight_link, RecordingEndpoint};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::time::Duration;
use tempfile::TempDir;

fn interrupt_run(signal: Signal) -> (Option<i32>, Vec<String>) {
    let temp = TempDir::new().unwrap();
    let endpoint = RecordingEndpoint::start(&temp.path().join("d.sock"));

    let mut child = freight_link(endpoint.path())
        .args(["run", "--tool", "migrate", "--dir", "/a", "--", "sleep", "5"])
        .spawn()
        .expect("Failed to spawn freight-link");

    let started = endpoint.wait_for(Duration::from_secs(5), |lines| {
        lines.iter().any(|l| l.starts_with("START "))
    });
    assert!(started, "START never arrived: {:?}", endpoint.lines());

    kill(Pid::from_raw(child.id() as i32), signal).expect("Failed to signal freight-link");
    let status = child.wait().expect("Failed to wait for freight-link");

    endpoint.settle();
    (status.code(), endpoint.lines_starting_with("STOP "))
}

#[test]
fn test_sigint_sends_interrupted_stop_and_exits_130() {
    let (code, stops) = interrupt_run(Signal::SIGINT);

    assert_eq!(code, Some(130));
    assert_eq!(
        stops,
        vec!["STOP tool=migrate dir=/a status=interrupted".to_string()]
    );
}

#[test]
fn test_sigterm_sends_interrupted_stop_and_exits_143() {
    let (code, stops) = interrupt_run(Signal::SIGTERM);

    assert_eq!(code, Some(143));
    assert_eq!(
        stops,
        vec!["STOP tool=migrate dir=/a status=interrupted".to_string()]
    );
}

#[test]
fn test_utility_killed_by_sigterm_reports_interrupted() {
    let temp = TempDir::new().unwrap();
    let endpoint = RecordingEndpoint::start(&temp.path().join("d.sock"));

    let output = freight_link(endpoint.path())
        .args(["run", "--tool", "migrate", "--dir", "/a", "--"])
        .args(["sh", "-c", "kill -TERM $$"])
        .output()
        .expect("Failed to run freight-link");

    assert_eq!(output.status.code(), Some(143));
    assert!(endpoint.wait_for(Duration::from_secs(5), |lines| {
        lines.iter().any(|l| l.starts_with("STOP "))
    }));
    endpoint.settle();
    assert_eq!(
        endpoint.lines_starting_with("STOP "),
        vec!["STOP tool=migrate dir=/a status=interrupted".to_string()]
    );
}
