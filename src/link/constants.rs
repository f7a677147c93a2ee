//! Wire and timing defaults shared by the link components.

use std::time::Duration;

/// Socket the coordinator listens on.
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/freight-daemon.sock";

/// Protocol tag sent in every HELLO line.
pub const PROTOCOL_VERSION: &str = "freight/0.1.0";

/// Delivery attempts per message before falling back to manual mode.
pub const MAX_SEND_ATTEMPTS: u32 = 3;

/// Fixed pause between consecutive delivery attempts.
pub const RETRY_BACKOFF: Duration = Duration::from_secs(10);

/// Write timeout for a single delivery attempt.
pub const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(2);

/// Write timeout for a connectivity probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// Default health monitor poll interval.
pub const MONITOR_INTERVAL: Duration = Duration::from_secs(30);

/// Status carried by the final STOP sent from the cleanup path.
pub const INTERRUPTED_STATUS: &str = "interrupted";

/// Process exit codes used by the signal harness.
pub mod exit_codes {
    /// 128 + SIGINT
    pub const INTERRUPT: i32 = 130;

    /// 128 + SIGTERM
    pub const TERMINATE: i32 = 143;
}
