//! Send command - delivers one status message on behalf of a shell tool

use crate::config::LinkConfig;
use crate::link::{ConnectionState, DaemonLink, Message};
use crate::logging::Logger;
use anyhow::Result;
use std::sync::Arc;

/// The message to send, minus the tool/directory identity.
#[derive(Debug, Clone, PartialEq)]
pub enum Outgoing {
    Start,
    Progress {
        msg: String,
        bytes: Option<u64>,
        percent: Option<f64>,
    },
    Stop {
        status: String,
        bytes: Option<u64>,
        msg: Option<String>,
    },
    Raw(String),
}

impl Outgoing {
    fn into_message(self, tool: &str, dir: &str) -> Message {
        match self {
            Outgoing::Start => Message::start(tool, dir),
            Outgoing::Progress {
                msg,
                bytes,
                percent,
            } => {
                let mut message = Message::progress(tool, dir, &msg);
                if let Some(bytes) = bytes {
                    message = message.with_bytes(bytes);
                }
                if let Some(pct) = percent {
                    message = message.with_percentage(pct);
                }
                message
            }
            Outgoing::Stop { status, bytes, msg } => {
                let mut message = Message::stop(tool, dir, &status);
                if let Some(bytes) = bytes {
                    message = message.with_bytes(bytes);
                }
                if let Some(msg) = msg {
                    message = message.with_note(&msg);
                }
                message
            }
            Outgoing::Raw(line) => Message::custom(line),
        }
    }
}

/// Initialise a link for `tool`/`dir` and send one message.
///
/// # Returns
/// `Ok(true)` if the message was delivered or skipped in manual mode, `Ok(false)` if
/// delivery was attempted and every retry failed.
pub fn execute(config: &LinkConfig, tool: &str, dir: &str, outgoing: Outgoing) -> Result<bool> {
    let logger = Arc::new(Logger::from_config(tool, config));
    let link = DaemonLink::new(config, logger);

    if link.init(tool, dir) == ConnectionState::ManualMode {
        link.logger()
            .debug("coordinator unavailable, message will be logged only");
    }

    let message = outgoing.into_message(tool, dir);
    Ok(link.send(&message))
}
