//! DaemonLink context object: identity, connection state and the probe.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use super::monitor::MonitorHandle;
use super::protocol::Message;
use super::state::{ConnectionState, StateCell};
use super::transport::{Transport, UnixSocketTransport};
use crate::config::{LinkConfig, RetryPolicy};
use crate::logging::Logger;

/// Who is talking to the coordinator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub tool: String,
    pub directory: String,
}

pub(super) struct LinkInner {
    pub(super) identity: RwLock<Identity>,
    pub(super) state: StateCell,
    pub(super) transport: Arc<dyn Transport>,
    pub(super) logger: Arc<Logger>,
    pub(super) retry: RetryPolicy,
    pub(super) probe_timeout: Duration,
    pub(super) monitor_interval: Duration,
    pub(super) monitor: Mutex<Option<MonitorHandle>>,
    /// Set once a STOP from this invocation was delivered (or skipped in manual mode)
    pub(super) stop_sent: AtomicBool,
}

/// Client side of the coordinator link. Cheap to clone; clones share one state.
///
/// An unreachable coordinator is a normal outcome: nothing here returns an error for
/// it. Tools that cannot run without the coordinator check [`DaemonLink::is_connected`]
/// after [`DaemonLink::init`] and exit on their own.
#[derive(Clone)]
pub struct DaemonLink {
    pub(super) inner: Arc<LinkInner>,
}

impl DaemonLink {
    /// Link to the Unix socket named in `config`.
    pub fn new(config: &LinkConfig, logger: Arc<Logger>) -> Self {
        let transport = Arc::new(UnixSocketTransport::new(config.socket_path.clone()));
        Self::with_transport(config, logger, transport)
    }

    pub fn with_transport(
        config: &LinkConfig,
        logger: Arc<Logger>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let identity = Identity {
            tool: logger.tool().to_string(),
            directory: String::new(),
        };
        Self {
            inner: Arc::new(LinkInner {
                identity: RwLock::new(identity),
                state: StateCell::new(),
                transport,
                logger,
                retry: config.retry,
                probe_timeout: config.probe_timeout,
                monitor_interval: config.monitor_interval,
                monitor: Mutex::new(None),
                stop_sent: AtomicBool::new(false),
            }),
        }
    }

    /// Record identity, probe the coordinator and say HELLO if it answers.
    ///
    /// # Returns
    /// The resulting state: `Connected`, or `ManualMode` when the probe failed or the
    /// HELLO could not be delivered.
    pub fn init(&self, tool: &str, directory: &str) -> ConnectionState {
        if let Ok(mut identity) = self.inner.identity.write() {
            identity.tool = tool.to_string();
            identity.directory = directory.to_string();
        }

        if self.probe() {
            self.set_state(ConnectionState::Connected);
            self.send(&Message::hello());
        } else {
            self.set_state(ConnectionState::ManualMode);
            self.logger().info(format!(
                "coordinator not reachable at {}, running in manual mode",
                self.inner.transport.endpoint()
            ));
        }

        self.state()
    }

    /// Bounded connectivity test. Never fails; a missing socket is just `false`.
    pub fn probe(&self) -> bool {
        match self.inner.transport.deliver("", self.inner.probe_timeout) {
            Ok(()) => true,
            Err(e) => {
                self.logger().debug(format!("probe failed: {e}"));
                false
            }
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.state.get()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    pub fn identity(&self) -> Identity {
        self.inner
            .identity
            .read()
            .map(|identity| identity.clone())
            .unwrap_or_default()
    }

    pub fn logger(&self) -> &Logger {
        &self.inner.logger
    }

    pub fn endpoint(&self) -> String {
        self.inner.transport.endpoint()
    }

    /// Whether this invocation's own STOP was delivered, or skipped in manual mode.
    pub fn stop_sent(&self) -> bool {
        self.inner.stop_sent.load(Ordering::SeqCst)
    }

    /// Move to `next`, logging real transitions. Returns true if the state changed.
    pub(super) fn set_state(&self, next: ConnectionState) -> bool {
        match self.inner.state.transition(next) {
            Some(previous) => {
                self.logger()
                    .debug(format!("coordinator link: {previous} -> {next}"));
                true
            }
            None => false,
        }
    }
}
