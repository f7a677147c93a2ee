use clap::{Args, Parser, Subcommand};
use freight_link::logging::Level;
use freight_link::validation::{clap_line_validator, clap_token_validator};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "freight-link")]
#[command(about = "Report freight tool status to the migration coordinator", long_about = None)]
#[command(version)]
#[command(subcommand_help_heading = "Commands")]
pub struct Cli {
    /// Coordinator socket (default: $FREIGHT_SOCKET or /tmp/freight-daemon.sock)
    #[arg(long, global = true)]
    pub socket: Option<PathBuf>,

    /// Minimum log level: debug, info, warn, error (default: $FREIGHT_LOG_LEVEL or info)
    #[arg(long, global = true)]
    pub log_level: Option<Level>,

    /// Append log lines to this file (default: $FREIGHT_LOG_FILE)
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Identity reported to the coordinator.
#[derive(Args)]
pub struct TargetArgs {
    /// Tool name (scan, migrate, verify, ...)
    #[arg(long, env = "FREIGHT_TOOL", value_parser = clap_token_validator)]
    pub tool: String,

    /// Directory the tool works on
    #[arg(long, env = "FREIGHT_DIR", value_parser = clap_token_validator)]
    pub dir: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check whether the coordinator is reachable (exit 0 if so, 1 otherwise)
    Probe,

    /// Send a single status message
    Send {
        #[command(flatten)]
        target: TargetArgs,

        #[command(subcommand)]
        message: SendCommands,
    },

    /// Run an external utility, reporting START/STOP and handling signals
    ///
    /// Example: freight-link run --tool migrate --dir /data/home -- rsync -a src/ dst/
    Run {
        #[command(flatten)]
        target: TargetArgs,

        /// Exit with an error if the coordinator is not reachable at startup
        #[arg(long)]
        require_daemon: bool,

        /// Seconds between health checks (default: 30)
        #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
        monitor_interval: Option<u64>,

        /// Utility and arguments, after `--`
        #[arg(last = true, required = true, num_args = 1..)]
        command: Vec<String>,
    },
}

#[derive(Subcommand)]
pub enum SendCommands {
    /// START tool=<tool> dir=<dir>
    Start,

    /// PROGRESS tool=<tool> dir=<dir> msg=<msg> [bytes=<n>] [pct=<p>]
    Progress {
        /// Short note (one word, no '=')
        #[arg(long, value_parser = clap_token_validator)]
        msg: String,

        /// Bytes processed so far
        #[arg(long)]
        bytes: Option<u64>,

        /// Completion percentage
        #[arg(long)]
        percent: Option<f64>,
    },

    /// STOP tool=<tool> dir=<dir> status=<status> [bytes=<n>] [msg=<msg>]
    Stop {
        /// Final status (ok, failed, ...)
        #[arg(long, default_value = "ok", value_parser = clap_token_validator)]
        status: String,

        /// Total bytes processed
        #[arg(long)]
        bytes: Option<u64>,

        /// Short note (one word, no '=')
        #[arg(long, value_parser = clap_token_validator)]
        msg: Option<String>,
    },

    /// Send a raw protocol line verbatim
    Raw {
        /// The line to send (no control characters)
        #[arg(value_parser = clap_line_validator)]
        line: String,
    },
}
