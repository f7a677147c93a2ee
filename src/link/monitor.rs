//! Health monitor: a background thread that re-probes the coordinator.
//!
//! Only one monitor thread may exist per process; the thread itself holds the claim
//! until it returns. The handle lives in the owning [`DaemonLink`]; dropping it (via
//! [`DaemonLink::stop_monitor`] or when the link goes away) wakes the thread out of
//! its interval wait and ends it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::core::{DaemonLink, LinkInner};
use super::protocol::Message;
use super::state::ConnectionState;
use crate::error::{LinkError, LinkResult};

/// Claimed by the single live monitor in this process.
static MONITOR_ACTIVE: AtomicBool = AtomicBool::new(false);

pub struct MonitorHandle {
    pid: u32,
    interval: Duration,
    running: Arc<AtomicBool>,
    // Dropping the sender cancels the thread
    _cancel: Sender<()>,
    _thread: JoinHandle<()>,
}

impl MonitorHandle {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Owned by the monitor thread; releases the process-wide claim when the thread ends.
struct ActiveClaim;

impl Drop for ActiveClaim {
    fn drop(&mut self) {
        MONITOR_ACTIVE.store(false, Ordering::SeqCst);
    }
}

/// Whether a monitor thread is still alive anywhere in this process.
///
/// Stays true after [`DaemonLink::stop_monitor`] until a tick in flight has finished.
pub fn monitor_active() -> bool {
    MONITOR_ACTIVE.load(Ordering::SeqCst)
}

impl DaemonLink {
    /// Start the health monitor, polling every `interval` (link default if `None`).
    ///
    /// # Errors
    /// `MonitorAlreadyRunning` if any monitor thread is live in this process, including
    /// one that was stopped but is still finishing a tick.
    pub fn start_monitor(&self, interval: Option<Duration>) -> LinkResult<()> {
        let pid = std::process::id();
        if MONITOR_ACTIVE
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(LinkError::MonitorAlreadyRunning { pid });
        }

        let interval = interval.unwrap_or(self.inner.monitor_interval);
        let (cancel_tx, cancel_rx) = mpsc::channel::<()>();
        let running = Arc::new(AtomicBool::new(true));
        let weak = Arc::downgrade(&self.inner);
        let thread_running = Arc::clone(&running);

        let spawned = thread::Builder::new()
            .name("freight-monitor".to_string())
            .spawn(move || {
                let _claim = ActiveClaim;
                loop {
                    match cancel_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {
                            if !thread_running.load(Ordering::SeqCst) || !tick(&weak) {
                                break;
                            }
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                thread_running.store(false, Ordering::SeqCst);
            });

        let thread = match spawned {
            Ok(thread) => thread,
            Err(e) => {
                MONITOR_ACTIVE.store(false, Ordering::SeqCst);
                return Err(LinkError::Io(e));
            }
        };

        let handle = MonitorHandle {
            pid,
            interval,
            running,
            _cancel: cancel_tx,
            _thread: thread,
        };
        if let Ok(mut slot) = self.inner.monitor.lock() {
            *slot = Some(handle);
        }
        self.logger().debug(format!(
            "health monitor started (pid {pid}, every {}s)",
            interval.as_secs_f64()
        ));
        Ok(())
    }

    /// Cancel the monitor and forget its handle. Returns false if none was running.
    ///
    /// Does not join: a tick already in flight finishes on its own.
    pub fn stop_monitor(&self) -> bool {
        let handle = match self.inner.monitor.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        match handle {
            Some(handle) => {
                drop(handle);
                self.logger().debug("health monitor stopped");
                true
            }
            None => false,
        }
    }

    pub fn monitor_running(&self) -> bool {
        self.inner
            .monitor
            .lock()
            .map(|slot| slot.as_ref().is_some_and(MonitorHandle::is_running))
            .unwrap_or(false)
    }

    /// One monitor cycle.
    ///
    /// Connected: a failed probe drops to manual mode. Otherwise: a successful probe
    /// reconnects and replays HELLO.
    pub fn monitor_tick(&self) {
        match self.state() {
            ConnectionState::Connected => {
                if !self.probe() && self.set_state(ConnectionState::ManualMode) {
                    self.logger().warn(format!(
                        "lost connection to coordinator at {}, switching to manual mode",
                        self.endpoint()
                    ));
                }
            }
            ConnectionState::Disconnected | ConnectionState::ManualMode => {
                if self.probe() {
                    self.set_state(ConnectionState::Connected);
                    self.logger()
                        .info("coordinator reachable again, replaying HELLO");
                    self.send(&Message::hello());
                }
            }
        }
    }
}

/// Run one tick if the link still exists. Returns false once it is gone.
fn tick(weak: &Weak<LinkInner>) -> bool {
    match weak.upgrade() {
        Some(inner) => {
            DaemonLink { inner }.monitor_tick();
            true
        }
        None => false,
    }
}
