//! Retry sender: bounded attempts with a fixed backoff, one connection per attempt.

use std::sync::atomic::Ordering;
use std::thread;

use super::core::DaemonLink;
use super::protocol::Message;
use super::state::ConnectionState;
use crate::error::LinkError;

impl DaemonLink {
    /// Deliver `message`, retrying per the link's [`crate::config::RetryPolicy`].
    ///
    /// In manual mode the line is logged at debug and `true` is returned without any
    /// delivery; nothing is queued for replay. When every attempt fails the link drops
    /// to manual mode, a warning is logged and `false` is returned.
    pub fn send(&self, message: &Message) -> bool {
        let line = message.encode();

        if self.state() == ConnectionState::ManualMode {
            self.logger().debug(format!("manual mode, not sent: {line}"));
            // Still counts as the tool's own STOP for cleanup
            self.mark_delivered(message);
            return true;
        }

        let policy = self.inner.retry;
        let attempts = policy.max_attempts.max(1);

        for attempt in 1..=attempts {
            match self.inner.transport.deliver(&line, policy.attempt_timeout) {
                Ok(()) => {
                    self.set_state(ConnectionState::Connected);
                    self.mark_delivered(message);
                    self.logger().debug(format!("sent: {line}"));
                    return true;
                }
                Err(e) => {
                    self.logger()
                        .debug(format!("attempt {attempt}/{attempts} failed: {e}"));
                    if attempt < attempts {
                        thread::sleep(policy.backoff);
                    }
                }
            }
        }

        self.set_state(ConnectionState::ManualMode);
        let err = LinkError::RetriesExhausted { attempts };
        self.logger().warn(format!(
            "{err} to {}, switching to manual mode (dropped: {line})",
            self.endpoint()
        ));
        false
    }

    /// Single attempt with no backoff, for the cleanup path.
    pub fn send_once(&self, message: &Message) -> bool {
        let line = message.encode();

        match self
            .inner
            .transport
            .deliver(&line, self.inner.retry.attempt_timeout)
        {
            Ok(()) => {
                self.set_state(ConnectionState::Connected);
                self.mark_delivered(message);
                self.logger().debug(format!("sent: {line}"));
                true
            }
            Err(e) => {
                self.set_state(ConnectionState::ManualMode);
                self.logger()
                    .warn(format!("final message not delivered ({e}): {line}"));
                false
            }
        }
    }

    /// Remember a STOP once it has been handed off.
    fn mark_delivered(&self, message: &Message) {
        if message.is_stop() {
            self.inner.stop_sent.store(true, Ordering::SeqCst);
        }
    }

    /// START for the link's tool and directory.
    pub fn send_start(&self) -> bool {
        let identity = self.identity();
        self.send(&Message::start(&identity.tool, &identity.directory))
    }

    /// PROGRESS for the link's tool and directory.
    pub fn send_progress(&self, note: &str, bytes: Option<u64>, percentage: Option<f64>) -> bool {
        let identity = self.identity();
        let mut message = Message::progress(&identity.tool, &identity.directory, note);
        if let Some(bytes) = bytes {
            message = message.with_bytes(bytes);
        }
        if let Some(pct) = percentage {
            message = message.with_percentage(pct);
        }
        self.send(&message)
    }

    /// STOP for the link's tool and directory.
    pub fn send_stop(&self, status: &str, bytes: Option<u64>, note: Option<&str>) -> bool {
        let identity = self.identity();
        let mut message = Message::stop(&identity.tool, &identity.directory, status);
        if let Some(bytes) = bytes {
            message = message.with_bytes(bytes);
        }
        if let Some(note) = note {
            message = message.with_note(note);
        }
        self.send(&message)
    }
}
