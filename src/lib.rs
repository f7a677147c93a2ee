pub mod commands;
pub mod config;
pub mod error;
pub mod link;
pub mod logging;
pub mod process;
pub mod validation;

pub use config::{LinkConfig, RetryPolicy};
pub use error::{LinkError, LinkResult};
pub use link::{ConnectionState, DaemonLink, Lifecycle, Message, Trigger};
pub use logging::{Level, Logger};
