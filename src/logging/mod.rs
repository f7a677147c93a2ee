//! Structured logger shared by the freight tools.
//!
//! Two line formats are written: plain severity-prefixed text and single-line JSON
//! records. Both go to the console channel picked by severity and, when a log file
//! is configured, are appended to that file under an exclusive `fs2` lock so that
//! several tool processes can share one file.

mod level;
mod operations;

pub use level::{Channel, Level};
pub use operations::OperationRecord;

use chrono::Utc;
use colored::Colorize;
use fs2::FileExt;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::config::LinkConfig;
use operations::OperationBook;

/// Keys owned by the JSON record itself; extra fields may not shadow them.
const RESERVED_KEYS: [&str; 4] = ["timestamp", "level", "tool", "message"];

type Sink = Mutex<Box<dyn Write + Send>>;

/// One JSON log line.
#[derive(Debug, Serialize)]
struct LogEntry<'a> {
    timestamp: String,
    level: Level,
    tool: &'a str,
    message: &'a str,
    #[serde(flatten)]
    extra: BTreeMap<String, String>,
}

pub struct Logger {
    tool: String,
    min_level: Level,
    stdout: Sink,
    stderr: Sink,
    colorize: bool,
    log_file: Option<PathBuf>,
    operations: Mutex<OperationBook>,
}

impl Logger {
    /// Create a logger writing to the process stdout/stderr.
    pub fn new(tool: impl Into<String>, min_level: Level) -> Self {
        let colorize = io::stderr().is_terminal();
        let mut logger = Self::with_channels(
            tool,
            min_level,
            Box::new(io::stdout()),
            Box::new(io::stderr()),
        );
        logger.colorize = colorize;
        logger
    }

    /// Create a logger writing to caller-supplied channels (never colorized).
    pub fn with_channels(
        tool: impl Into<String>,
        min_level: Level,
        standard: Box<dyn Write + Send>,
        error: Box<dyn Write + Send>,
    ) -> Self {
        Self {
            tool: tool.into(),
            min_level,
            stdout: Mutex::new(standard),
            stderr: Mutex::new(error),
            colorize: false,
            log_file: None,
            operations: Mutex::new(OperationBook::default()),
        }
    }

    /// Build a console logger from the environment-derived link configuration.
    pub fn from_config(tool: impl Into<String>, config: &LinkConfig) -> Self {
        let logger = Self::new(tool, config.min_level);
        match &config.log_file {
            Some(path) => logger.with_log_file(path),
            None => logger,
        }
    }

    /// Also append every emitted line to `path`.
    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }

    pub fn min_level(&self) -> Level {
        self.min_level
    }

    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }

    pub fn enabled(&self, level: Level) -> bool {
        level >= self.min_level
    }

    pub fn debug(&self, message: impl AsRef<str>) {
        self.log(Level::Debug, message.as_ref());
    }

    pub fn info(&self, message: impl AsRef<str>) {
        self.log(Level::Info, message.as_ref());
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        self.log(Level::Warn, message.as_ref());
    }

    pub fn error(&self, message: impl AsRef<str>) {
        self.log(Level::Error, message.as_ref());
    }

    /// Emit a plain `[timestamp] [LEVEL] [tool] message` line.
    pub fn log(&self, level: Level, message: &str) {
        if !self.enabled(level) {
            return;
        }
        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S");
        let plain = format!("[{timestamp}] [{level}] [{}] {message}", self.tool);
        let console = if self.colorize {
            let tag = match level {
                Level::Debug => level.as_str().dimmed(),
                Level::Info => level.as_str().green(),
                Level::Warn => level.as_str().yellow(),
                Level::Error => level.as_str().red().bold(),
            };
            format!("[{timestamp}] [{tag}] [{}] {message}", self.tool)
        } else {
            plain.clone()
        };
        self.write_console(level.channel(), &console);
        self.append_to_file(&plain);
    }

    /// Emit a single-line JSON record with caller-supplied string fields.
    pub fn log_json(&self, level: Level, message: &str, extra: &[(&str, &str)]) {
        let fields = extra
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        self.emit_json(level, message, fields);
    }

    pub(crate) fn emit_json(&self, level: Level, message: &str, mut extra: BTreeMap<String, String>) {
        if !self.enabled(level) {
            return;
        }
        extra.retain(|key, _| !RESERVED_KEYS.contains(&key.as_str()));
        let entry = LogEntry {
            timestamp: Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            level,
            tool: &self.tool,
            message,
            extra,
        };
        let line = match serde_json::to_string(&entry) {
            Ok(line) => line,
            Err(e) => {
                self.log(Level::Error, &format!("failed to encode log record: {e}"));
                return;
            }
        };
        self.write_console(level.channel(), &line);
        self.append_to_file(&line);
    }

    fn write_console(&self, channel: Channel, line: &str) {
        let sink = match channel {
            Channel::Standard => &self.stdout,
            Channel::Error => &self.stderr,
        };
        if let Ok(mut writer) = sink.lock() {
            let _ = writeln!(writer, "{line}");
            let _ = writer.flush();
        }
    }

    fn append_to_file(&self, line: &str) {
        let Some(path) = &self.log_file else {
            return;
        };
        if let Err(e) = append_locked(path, line) {
            if let Ok(mut writer) = self.stderr.lock() {
                let _ = writeln!(writer, "failed to append to {}: {e}", path.display());
            }
        }
    }
}

/// Append one line to `path` while holding an exclusive advisory lock.
fn append_locked(path: &Path, line: &str) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.lock_exclusive()?;
    let result = writeln!(file, "{line}").and_then(|()| file.flush());
    let _ = FileExt::unlock(&file);
    result
}

/// In-memory writer for capturing log output in tests.
#[cfg(test)]
#[derive(Clone, Default)]
pub(crate) struct CaptureBuffer(std::sync::Arc<Mutex<Vec<u8>>>);

#[cfg(test)]
impl CaptureBuffer {
    pub(crate) fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

#[cfg(test)]
impl Write for CaptureBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Logger wired to capture buffers, returned as (logger, stdout, stderr).
#[cfg(test)]
pub(crate) fn capture_logger(tool: &str, level: Level) -> (Logger, CaptureBuffer, CaptureBuffer) {
    let out = CaptureBuffer::default();
    let err = CaptureBuffer::default();
    let logger = Logger::with_channels(tool, level, Box::new(out.clone()), Box::new(err.clone()));
    (logger, out, err)
}
