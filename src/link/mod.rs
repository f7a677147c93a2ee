//! Client side of the coordinator link.
//!
//! A tool builds one [`DaemonLink`], optionally wraps it in a [`Lifecycle`] harness,
//! calls [`DaemonLink::init`], and reports START/PROGRESS/STOP through the retry
//! sender. When the coordinator is unreachable the link runs in manual mode and the
//! health monitor reconnects once it comes back.

pub mod constants;
mod core;
mod lifecycle;
mod monitor;
mod protocol;
mod sender;
mod state;
mod transport;


pub use self::core::{DaemonLink, Identity};
pub use lifecycle::{ExitGuard, Lifecycle, Trigger};
pub use monitor::{monitor_active, MonitorHandle};
pub use protocol::{local_hostname, Message};
pub use state::ConnectionState;
pub use transport::{Transport, UnixSocketTransport};
