use anyhow::{Context, Result};
use freight_link::commands::run::RunOptions;
use freight_link::commands::send::Outgoing;
use freight_link::commands::{probe, run, send};
use freight_link::config::LinkConfig;
use std::time::Duration;

use super::types::{Cli, Commands, SendCommands};

/// Environment configuration with CLI flags layered on top.
fn resolve_config(cli: &Cli) -> Result<LinkConfig> {
    let mut config = LinkConfig::from_env().context("Invalid FREIGHT_* environment")?;
    if let Some(socket) = &cli.socket {
        config.socket_path = socket.clone();
    }
    if let Some(level) = cli.log_level {
        config.min_level = level;
    }
    if let Some(path) = &cli.log_file {
        config.log_file = Some(path.clone());
    }
    Ok(config)
}

/// Run the selected command and return the process exit code.
pub fn dispatch(cli: Cli) -> Result<i32> {
    let config = resolve_config(&cli)?;

    match cli.command {
        Commands::Probe => {
            let reachable = probe::execute(&config)?;
            Ok(if reachable { 0 } else { 1 })
        }
        Commands::Send { target, message } => {
            let outgoing = match message {
                SendCommands::Start => Outgoing::Start,
                SendCommands::Progress {
                    msg,
                    bytes,
                    percent,
                } => Outgoing::Progress {
                    msg,
                    bytes,
                    percent,
                },
                SendCommands::Stop { status, bytes, msg } => Outgoing::Stop { status, bytes, msg },
                SendCommands::Raw { line } => Outgoing::Raw(line),
            };
            let delivered = send::execute(&config, &target.tool, &target.dir, outgoing)?;
            Ok(if delivered { 0 } else { 1 })
        }
        Commands::Run {
            target,
            require_daemon,
            monitor_interval,
            command,
        } => run::execute(
            &config,
            RunOptions {
                tool: target.tool,
                dir: target.dir,
                require_daemon,
                monitor_interval: monitor_interval.map(Duration::from_secs),
                command,
            },
        ),
    }
}
