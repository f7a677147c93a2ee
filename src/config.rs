//! Link configuration.
//!
//! Values come from the invoking tool: defaults, overridden by `FREIGHT_*` environment
//! variables, overridden again by CLI flags in the binary.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{LinkError, LinkResult};
use crate::link::constants::{
    ATTEMPT_TIMEOUT, DEFAULT_SOCKET_PATH, MAX_SEND_ATTEMPTS, MONITOR_INTERVAL, PROBE_TIMEOUT,
    RETRY_BACKOFF,
};
use crate::logging::Level;

/// Environment variable holding the minimum log severity.
pub const ENV_LOG_LEVEL: &str = "FREIGHT_LOG_LEVEL";
/// Environment variable holding the optional log file path.
pub const ENV_LOG_FILE: &str = "FREIGHT_LOG_FILE";
/// Environment variable overriding the coordinator socket path.
pub const ENV_SOCKET: &str = "FREIGHT_SOCKET";

/// Delivery policy for the retry sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per message, including the first
    pub max_attempts: u32,
    /// Fixed pause between consecutive attempts (not exponential)
    pub backoff: Duration,
    /// Write timeout for each attempt
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_SEND_ATTEMPTS,
            backoff: RETRY_BACKOFF,
            attempt_timeout: ATTEMPT_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinkConfig {
    pub socket_path: PathBuf,
    pub min_level: Level,
    pub log_file: Option<PathBuf>,
    pub retry: RetryPolicy,
    pub probe_timeout: Duration,
    pub monitor_interval: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            min_level: Level::default(),
            log_file: None,
            retry: RetryPolicy::default(),
            probe_timeout: PROBE_TIMEOUT,
            monitor_interval: MONITOR_INTERVAL,
        }
    }
}

impl LinkConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> LinkResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for the `FREIGHT_*` keys.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> LinkResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(level) = get(ENV_LOG_LEVEL) {
            config.min_level = level
                .parse()
                .map_err(|e: String| LinkError::InvalidConfig(format!("{ENV_LOG_LEVEL}: {e}")))?;
        }
        if let Some(path) = get(ENV_LOG_FILE) {
            config.log_file = Some(PathBuf::from(path));
        }
        if let Some(path) = get(ENV_SOCKET) {
            config.socket_path = PathBuf::from(path);
        }

        Ok(config)
    }
}
