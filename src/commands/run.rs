//! Run command - wraps an external copy/scan/verify utility with coordinator reporting
//!
//! Sequence: install the signal harness, init the link, start the health monitor,
//! send START, run the utility, send STOP with `ok` or `failed`. A signal while the
//! utility runs terminates it and leaves the final STOP to the harness. A utility
//! killed by SIGINT or SIGTERM is reported as interrupted the same way.

use crate::config::LinkConfig;
use crate::link::constants::INTERRUPTED_STATUS;
use crate::link::{ConnectionState, DaemonLink, Lifecycle, Trigger};
use crate::logging::Logger;
use crate::process;
use anyhow::{bail, Context, Result};
use nix::sys::signal::Signal;
use std::os::unix::process::ExitStatusExt;
use std::process::{Command, ExitStatus};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub tool: String,
    pub dir: String,
    /// Abort when the coordinator is not reachable at startup
    pub require_daemon: bool,
    pub monitor_interval: Option<Duration>,
    /// Utility and its arguments
    pub command: Vec<String>,
}

/// Run the utility and return the exit code to propagate.
pub fn execute(config: &LinkConfig, options: RunOptions) -> Result<i32> {
    let Some((program, args)) = options.command.split_first() else {
        bail!("No command given to run");
    };
    let program_path =
        which::which(program).with_context(|| format!("Command not found: {program}"))?;

    let logger = Arc::new(Logger::from_config(&options.tool, config));
    let link = DaemonLink::new(config, Arc::clone(&logger));

    // Must precede every other thread so all of them inherit the signal mask
    let lifecycle = Lifecycle::install(link.clone()).context("Failed to install signal handlers")?;
    let _exit_guard = lifecycle.exit_guard();

    let state = link.init(&options.tool, &options.dir);
    if options.require_daemon && state != ConnectionState::Connected {
        bail!(
            "Coordinator is required but not reachable at {}",
            link.endpoint()
        );
    }

    link.start_monitor(options.monitor_interval)
        .context("Failed to start health monitor")?;

    let operation = logger.operation_start(&options.tool, &options.dir, None);
    link.send_start();

    let slot = ChildSlot::default();
    let hook_slot = slot.clone();
    lifecycle.on_shutdown(move |trigger| {
        if trigger != Trigger::Exit {
            hook_slot.terminate();
        }
    });

    // Held across spawn so a signal arriving meanwhile waits for the pid
    let mut child = {
        let mut pid = slot.lock();
        let child = Command::new(&program_path)
            .args(args)
            .spawn()
            .with_context(|| format!("Failed to spawn {}", program_path.display()))?;
        *pid = Some(child.id());
        child
    };

    let status = child
        .wait()
        .with_context(|| format!("Failed to wait for {program}"))?;
    slot.clear();
    lifecycle.wait_if_signalled();

    // Ctrl-C reaches the whole process group; the utility may die before our
    // signal thread runs cleanup
    if let Some(trigger) = interrupting_signal(status) {
        lifecycle.finalize(trigger);
        logger.operation_end(&operation, INTERRUPTED_STATUS, None);
        logger.warn(format!("{program} stopped by {trigger:?}"));
        return Ok(trigger.exit_code().unwrap_or_else(|| exit_code(status)));
    }

    let code = exit_code(status);
    report_completion(&link, &logger, &operation, program, code);
    Ok(code)
}

/// Pid of the running utility, shared with the shutdown hook.
#[derive(Clone, Default)]
struct ChildSlot(Arc<Mutex<Option<u32>>>);

impl ChildSlot {
    fn lock(&self) -> MutexGuard<'_, Option<u32>> {
        match self.0.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Send SIGTERM to the utility if one is running. Returns true if signalled.
    fn terminate(&self) -> bool {
        match *self.lock() {
            Some(pid) if process::is_process_alive(pid) => process::terminate(pid),
            _ => false,
        }
    }

    /// Forget the pid once the utility has been reaped.
    fn clear(&self) {
        *self.lock() = None;
    }
}

/// The cleanup trigger matching the signal that killed the utility, if any.
fn interrupting_signal(status: ExitStatus) -> Option<Trigger> {
    status
        .signal()
        .and_then(|raw| Signal::try_from(raw).ok())
        .and_then(Trigger::from_signal)
}

/// Exit code of the utility, using the shell's 128+signal convention.
fn exit_code(status: ExitStatus) -> i32 {
    match (status.code(), status.signal()) {
        (Some(code), _) => code,
        (None, Some(signal)) => 128 + signal,
        (None, None) => 1,
    }
}

fn report_completion(link: &DaemonLink, logger: &Logger, operation: &str, program: &str, code: i32) {
    if code == 0 {
        logger.operation_end(operation, "ok", None);
        link.send_stop("ok", None, None);
        logger.info(format!("{program} finished"));
    } else {
        let note = format!("exit-{code}");
        logger.operation_end(operation, "failed", None);
        link.send_stop("failed", None, Some(&note));
        logger.error(format!("{program} exited with code {code}"));
    }
}
