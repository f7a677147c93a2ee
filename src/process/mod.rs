//! Helpers for the external utilities spawned by `freight-link run`.

use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;

/// Convert a std pid to a nix pid; `None` for values that do not fit or name a group.
fn to_pid(pid: u32) -> Option<Pid> {
    i32::try_from(pid).ok().filter(|p| *p > 0).map(Pid::from_raw)
}

/// Check whether a process exists using the null signal.
///
/// EPERM still means the process exists, we just may not signal it.
pub fn is_process_alive(pid: u32) -> bool {
    let Some(pid) = to_pid(pid) else {
        return false;
    };
    match kill(pid, None) {
        Ok(()) => true,
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

/// Ask a child utility to stop. Returns true if SIGTERM was delivered.
pub fn terminate(pid: u32) -> bool {
    match to_pid(pid) {
        Some(pid) => kill(pid, Signal::SIGTERM).is_ok(),
        None => false,
    }
}
