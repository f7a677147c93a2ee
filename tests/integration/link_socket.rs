//! Library-level behaviour against a recording endpoint

use super::helpers::RecordingEndpoint;
use freight_link::link::monitor_active;
use freight_link::{ConnectionState, DaemonLink, Level, LinkConfig, Logger, RetryPolicy};
use serial_test::serial;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

fn fast_config(socket: &Path) -> LinkConfig {
    LinkConfig {
        socket_path: socket.to_path_buf(),
        retry: RetryPolicy {
            max_attempts: 3,
            backoff: Duration::from_millis(20),
            attempt_timeout: Duration::from_millis(500),
        },
        ..LinkConfig::default()
    }
}

fn wait_for_monitor_exit() {
    for _ in 0..500 {
        if !monitor_active() {
            return;
        }
        thread::sleep(Duration::from_millis(10));
    }
    panic!("monitor thread did not exit");
}

fn quiet_link(config: &LinkConfig) -> DaemonLink {
    DaemonLink::new(config, Arc::new(Logger::new("scan", Level::Error)))
}

#[test]
fn test_init_sends_hello_then_messages_in_order() {
    let temp = TempDir::new().unwrap();
    let endpoint = RecordingEndpoint::start(&temp.path().join("d.sock"));
    let link = quiet_link(&fast_config(endpoint.path()));

    assert_eq!(link.init("scan", "/data/a"), ConnectionState::Connected);
    assert!(link.send_start());
    assert!(link.send_progress("walking", Some(10), None));
    assert!(link.send_stop("ok", Some(10), None));

    assert!(endpoint.wait_for(Duration::from_secs(5), |lines| lines.len() >= 4));
    let lines = endpoint.lines();
    let pid = std::process::id();
    assert!(lines[0].starts_with("HELLO freight/0.1.0 host="));
    assert!(lines[0].ends_with(&format!("pid={pid}")));
    assert_eq!(lines[1], "START tool=scan dir=/data/a");
    assert_eq!(lines[2], "PROGRESS tool=scan dir=/data/a msg=walking bytes=10");
    assert_eq!(lines[3], "STOP tool=scan dir=/data/a status=ok bytes=10");
}

#[test]
fn test_absent_socket_enters_manual_mode() {
    let temp = TempDir::new().unwrap();
    let link = quiet_link(&fast_config(&temp.path().join("absent.sock")));

    assert_eq!(link.init("scan", "/data/a"), ConnectionState::ManualMode);
    assert!(link.send_start());
    assert_eq!(link.state(), ConnectionState::ManualMode);
}

#[test]
fn test_endpoint_removal_exhausts_retries() {
    let temp = TempDir::new().unwrap();
    let socket = temp.path().join("d.sock");
    let link = {
        let endpoint = RecordingEndpoint::start(&socket);
        let link = quiet_link(&fast_config(endpoint.path()));
        assert_eq!(link.init("migrate", "/b"), ConnectionState::Connected);
        link
    };

    assert!(!link.send_start());
    assert_eq!(link.state(), ConnectionState::ManualMode);
    // Further sends are skipped locally
    assert!(link.send_progress("copying", None, None));
}

#[test]
#[serial]
fn test_monitor_reconnects_when_endpoint_appears() {
    let temp = TempDir::new().unwrap();
    let socket = temp.path().join("d.sock");
    let link = quiet_link(&fast_config(&socket));

    assert_eq!(link.init("verify", "/c"), ConnectionState::ManualMode);
    wait_for_monitor_exit();
    link.start_monitor(Some(Duration::from_millis(50))).unwrap();

    let endpoint = RecordingEndpoint::start(&socket);
    assert!(endpoint.wait_for(Duration::from_secs(5), |lines| !lines.is_empty()));
    thread::sleep(Duration::from_millis(300));
    link.stop_monitor();
    wait_for_monitor_exit();
    endpoint.settle();

    assert_eq!(link.state(), ConnectionState::Connected);
    assert_eq!(endpoint.lines_starting_with("HELLO ").len(), 1);
}

#[test]
#[serial]
fn test_monitor_detects_lost_endpoint() {
    let temp = TempDir::new().unwrap();
    let socket = temp.path().join("d.sock");
    let endpoint = RecordingEndpoint::start(&socket);
    let link = quiet_link(&fast_config(&socket));

    assert_eq!(link.init("scan", "/d"), ConnectionState::Connected);
    wait_for_monitor_exit();
    link.start_monitor(Some(Duration::from_millis(50))).unwrap();
    drop(endpoint);

    let mut state = link.state();
    for _ in 0..100 {
        state = link.state();
        if state == ConnectionState::ManualMode {
            break;
        }
        thread::sleep(Duration::from_millis(20));
    }
    link.stop_monitor();
    wait_for_monitor_exit();

    assert_eq!(state, ConnectionState::ManualMode);
}
