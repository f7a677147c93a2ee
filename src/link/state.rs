//! Connection state shared between the foreground thread and the health monitor.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No probe has run yet
    Disconnected,
    /// Last probe or delivery succeeded
    Connected,
    /// Coordinator unreachable; sends are logged locally and skipped
    ManualMode,
}

impl ConnectionState {
    fn to_u8(self) -> u8 {
        match self {
            ConnectionState::Disconnected => 0,
            ConnectionState::Connected => 1,
            ConnectionState::ManualMode => 2,
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => ConnectionState::Connected,
            2 => ConnectionState::ManualMode,
            _ => ConnectionState::Disconnected,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connected => "connected",
            ConnectionState::ManualMode => "manual mode",
        };
        f.write_str(name)
    }
}

/// Lock-free cell holding the current state. Last write wins.
#[derive(Debug)]
pub struct StateCell(AtomicU8);

impl StateCell {
    pub fn new() -> Self {
        Self(AtomicU8::new(ConnectionState::Disconnected.to_u8()))
    }

    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.load(Ordering::SeqCst))
    }

    /// Store `next` and return the previous state if it differed.
    ///
    /// Writing the current value again is not a transition and returns `None`.
    pub fn transition(&self, next: ConnectionState) -> Option<ConnectionState> {
        let previous = ConnectionState::from_u8(self.0.swap(next.to_u8(), Ordering::SeqCst));
        (previous != next).then_some(previous)
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}
