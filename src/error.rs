//! Error types for the coordinator link.
//!
//! Delivery failures (`ConnectionUnavailable`, `SendTimeout`, `RetriesExhausted`) are
//! recovered inside the sender and only surface as a `false` return plus a warning.
//! The remaining variants come from harness setup and are returned to the caller.

use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias for results using the link error type.
pub type LinkResult<T> = std::result::Result<T, LinkError>;

#[derive(Error, Debug)]
pub enum LinkError {
    /// Socket path missing, connection refused, or the write failed outright
    #[error("coordinator unavailable at {path}: {reason}")]
    ConnectionUnavailable { path: PathBuf, reason: String },

    /// A single delivery attempt exceeded its write timeout
    #[error("write to {path} timed out")]
    SendTimeout { path: PathBuf },

    /// Every attempt in the retry budget failed
    #[error("delivery failed after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    #[error("a health monitor is already running in process {pid}")]
    MonitorAlreadyRunning { pid: u32 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("signal handling setup failed: {0}")]
    Signal(#[from] nix::errno::Errno),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LinkError {
    /// Classify an I/O failure from a delivery attempt.
    pub fn from_attempt(path: PathBuf, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => {
                LinkError::SendTimeout { path }
            }
            _ => LinkError::ConnectionUnavailable {
                path,
                reason: err.to_string(),
            },
        }
    }
}
