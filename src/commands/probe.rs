//! Probe command - reports whether the coordinator answers on its socket

use crate::config::LinkConfig;
use crate::link::DaemonLink;
use crate::logging::Logger;
use anyhow::Result;
use colored::Colorize;
use std::sync::Arc;

/// Probe the coordinator once. Returns whether it was reachable.
pub fn execute(config: &LinkConfig) -> Result<bool> {
    let logger = Arc::new(Logger::from_config("probe", config));
    let link = DaemonLink::new(config, logger);

    let reachable = link.probe();
    if reachable {
        println!(
            "{} Coordinator reachable at {}",
            "✓".green().bold(),
            link.endpoint()
        );
    } else {
        println!(
            "{} Coordinator not reachable at {}",
            "✗".red().bold(),
            link.endpoint()
        );
    }
    Ok(reachable)
}
