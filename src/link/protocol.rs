//! Line protocol spoken to the coordinator.
//!
//! Every message is one line: a keyword followed by space-separated `KEY=VALUE`
//! tokens in a fixed order. Values are concatenated as-is, so they must not contain
//! whitespace or `=`. The transport adds the trailing newline.
//!
//! ```text
//! HELLO freight/0.1.0 host=nas01 pid=4242
//! START tool=scan dir=/data/home
//! PROGRESS tool=scan dir=/data/home msg=walking bytes=1024 pct=12.5
//! STOP tool=scan dir=/data/home status=ok bytes=4096 msg=done
//! ```

use std::fmt;

use super::constants::PROTOCOL_VERSION;

/// A status message for the coordinator. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Hello {
        version: String,
        host: String,
        pid: u32,
    },
    Start {
        tool: String,
        dir: String,
    },
    Progress {
        tool: String,
        dir: String,
        note: String,
        bytes: Option<u64>,
        percentage: Option<f64>,
    },
    Stop {
        tool: String,
        dir: String,
        status: String,
        bytes: Option<u64>,
        note: Option<String>,
    },
    /// Raw line passed through untouched
    Custom(String),
}

impl Message {
    /// HELLO for the current process and host.
    pub fn hello() -> Self {
        Self::hello_from(local_hostname(), std::process::id())
    }

    pub fn hello_from(host: impl Into<String>, pid: u32) -> Self {
        Message::Hello {
            version: PROTOCOL_VERSION.to_string(),
            host: host.into(),
            pid,
        }
    }

    pub fn start(tool: &str, dir: &str) -> Self {
        Message::Start {
            tool: tool.to_string(),
            dir: dir.to_string(),
        }
    }

    pub fn progress(tool: &str, dir: &str, note: &str) -> Self {
        Message::Progress {
            tool: tool.to_string(),
            dir: dir.to_string(),
            note: note.to_string(),
            bytes: None,
            percentage: None,
        }
    }

    pub fn stop(tool: &str, dir: &str, status: &str) -> Self {
        Message::Stop {
            tool: tool.to_string(),
            dir: dir.to_string(),
            status: status.to_string(),
            bytes: None,
            note: None,
        }
    }

    pub fn custom(line: impl Into<String>) -> Self {
        Message::Custom(line.into())
    }

    /// Attach a byte count (Progress and Stop only; ignored otherwise).
    pub fn with_bytes(mut self, value: u64) -> Self {
        match &mut self {
            Message::Progress { bytes, .. } | Message::Stop { bytes, .. } => *bytes = Some(value),
            _ => {}
        }
        self
    }

    /// Attach a completion percentage (Progress only).
    pub fn with_percentage(mut self, value: f64) -> Self {
        if let Message::Progress { percentage, .. } = &mut self {
            *percentage = Some(value);
        }
        self
    }

    /// Attach a free-text note (Stop only; Progress takes its note up front).
    pub fn with_note(mut self, value: &str) -> Self {
        if let Message::Stop { note, .. } = &mut self {
            *note = Some(value.to_string());
        }
        self
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Message::Hello { .. } => "HELLO",
            Message::Start { .. } => "START",
            Message::Progress { .. } => "PROGRESS",
            Message::Stop { .. } => "STOP",
            Message::Custom(_) => "CUSTOM",
        }
    }

    pub fn is_stop(&self) -> bool {
        matches!(self, Message::Stop { .. })
    }

    /// Encode into a single protocol line without the trailing newline.
    pub fn encode(&self) -> String {
        match self {
            Message::Hello { version, host, pid } => {
                format!("HELLO {version} host={host} pid={pid}")
            }
            Message::Start { tool, dir } => format!("START tool={tool} dir={dir}"),
            Message::Progress {
                tool,
                dir,
                note,
                bytes,
                percentage,
            } => {
                let mut line = format!("PROGRESS tool={tool} dir={dir} msg={note}");
                if let Some(bytes) = bytes {
                    line.push_str(&format!(" bytes={bytes}"));
                }
                if let Some(pct) = percentage {
                    line.push_str(&format!(" pct={pct:.1}"));
                }
                line
            }
            Message::Stop {
                tool,
                dir,
                status,
                bytes,
                note,
            } => {
                let mut line = format!("STOP tool={tool} dir={dir} status={status}");
                if let Some(bytes) = bytes {
                    line.push_str(&format!(" bytes={bytes}"));
                }
                if let Some(note) = note {
                    line.push_str(&format!(" msg={note}"));
                }
                line
            }
            Message::Custom(raw) => raw.clone(),
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Host name of this machine, or `unknown` if it cannot be read.
pub fn local_hostname() -> String {
    nix::unistd::gethostname()
        .ok()
        .and_then(|name| name.into_string().ok())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}
