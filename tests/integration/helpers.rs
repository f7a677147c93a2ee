//! Shared test helpers: a recording coordinator endpoint and binary runners

use std::io::Read;
use std::os::unix::net::UnixListener;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Stand-in coordinator: accepts one connection at a time and records every
/// non-empty line in arrival order.
pub struct RecordingEndpoint {
    path: PathBuf,
    lines: Arc<Mutex<Vec<String>>>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl RecordingEndpoint {
    pub fn start(path: &Path) -> Self {
        let listener = UnixListener::bind(path).expect("Failed to bind test socket");
        listener
            .set_nonblocking(true)
            .expect("Failed to set listener non-blocking");

        let lines = Arc::new(Mutex::new(Vec::new()));
        let stop = Arc::new(AtomicBool::new(false));
        let thread_lines = Arc::clone(&lines);
        let thread_stop = Arc::clone(&stop);

        let handle = thread::spawn(move || {
            while !thread_stop.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((mut stream, _)) => {
                        let _ = stream.set_nonblocking(false);
                        let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
                        let mut received = String::new();
                        let _ = stream.read_to_string(&mut received);
                        let mut lines = thread_lines.lock().unwrap();
                        lines.extend(
                            received
                                .lines()
                                .map(str::trim)
                                .filter(|l| !l.is_empty())
                                .map(String::from),
                        );
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(Duration::from_millis(5));
                    }
                    Err(_) => break,
                }
            }
        });

        Self {
            path: path.to_path_buf(),
            lines,
            stop,
            handle: Some(handle),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    pub fn lines_starting_with(&self, prefix: &str) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|l| l.starts_with(prefix))
            .collect()
    }

    /// Poll until `predicate` holds for the recorded lines or `timeout` passes.
    pub fn wait_for<F>(&self, timeout: Duration, predicate: F) -> bool
    where
        F: Fn(&[String]) -> bool,
    {
        let deadline = Instant::now() + timeout;
        loop {
            if predicate(&self.lines()) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(10));
        }
    }

    /// Let connections already queued be drained.
    pub fn settle(&self) {
        thread::sleep(Duration::from_millis(100));
    }
}

impl Drop for RecordingEndpoint {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        let _ = std::fs::remove_file(&self.path);
    }
}

/// The `freight-link` binary with a clean FREIGHT_* environment and quiet stdio.
pub fn freight_link(socket: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_freight-link"));
    cmd.arg("--socket")
        .arg(socket)
        .env_remove("FREIGHT_LOG_LEVEL")
        .env_remove("FREIGHT_LOG_FILE")
        .env_remove("FREIGHT_SOCKET")
        .env_remove("FREIGHT_TOOL")
        .env_remove("FREIGHT_DIR")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped());
    cmd
}
