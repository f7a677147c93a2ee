//! Exit harness: one finalizer reached from SIGINT, SIGTERM or normal exit.
//!
//! Cleanup runs exactly once per [`Lifecycle`]: stop the health monitor, send one
//! `STOP status=interrupted` if the coordinator is still connected and the tool's
//! own STOP has not been delivered, then run registered shutdown hooks. Signal triggers exit the
//! process with 130 or 143 once cleanup returns. The foreground thread is never
//! waited on, so a pending retry backoff is simply abandoned.

use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

use nix::sys::signal::{SigSet, Signal};

use super::constants::{exit_codes, INTERRUPTED_STATUS};
use super::core::DaemonLink;
use super::protocol::Message;
use crate::error::LinkResult;

/// What ended the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// SIGINT
    Interrupt,
    /// SIGTERM
    Terminate,
    /// Normal return from the tool
    Exit,
}

impl Trigger {
    /// Exit code forced by the trigger; `None` keeps the tool's own code.
    pub fn exit_code(self) -> Option<i32> {
        match self {
            Trigger::Interrupt => Some(exit_codes::INTERRUPT),
            Trigger::Terminate => Some(exit_codes::TERMINATE),
            Trigger::Exit => None,
        }
    }

    pub fn from_signal(signal: Signal) -> Option<Self> {
        match signal {
            Signal::SIGINT => Some(Trigger::Interrupt),
            Signal::SIGTERM => Some(Trigger::Terminate),
            _ => None,
        }
    }
}

type ShutdownHook = Box<dyn FnOnce(Trigger) + Send>;

struct LifecycleInner {
    link: DaemonLink,
    fired: Mutex<Option<Trigger>>,
    hooks: Mutex<Vec<ShutdownHook>>,
}

#[derive(Clone)]
pub struct Lifecycle {
    inner: Arc<LifecycleInner>,
}

impl Lifecycle {
    /// Harness without signal handling (normal-exit path only).
    pub fn new(link: DaemonLink) -> Self {
        Self {
            inner: Arc::new(LifecycleInner {
                link,
                fired: Mutex::new(None),
                hooks: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Harness that also handles SIGINT and SIGTERM.
    ///
    /// Blocks both signals on the calling thread and spawns a thread that waits for
    /// them. Call this before spawning any other thread (including the health
    /// monitor) so every thread inherits the mask.
    pub fn install(link: DaemonLink) -> LinkResult<Self> {
        let lifecycle = Self::new(link);

        let mut signals = SigSet::empty();
        signals.add(Signal::SIGINT);
        signals.add(Signal::SIGTERM);
        signals.thread_block()?;

        let handler = lifecycle.clone();
        thread::Builder::new()
            .name("freight-signals".to_string())
            .spawn(move || loop {
                match signals.wait() {
                    Ok(signal) => {
                        let Some(trigger) = Trigger::from_signal(signal) else {
                            continue;
                        };
                        handler.finalize(trigger);
                        std::process::exit(trigger.exit_code().unwrap_or(1));
                    }
                    Err(e) => {
                        handler
                            .link()
                            .logger()
                            .error(format!("signal wait failed: {e}"));
                        break;
                    }
                }
            })?;

        Ok(lifecycle)
    }

    pub fn link(&self) -> &DaemonLink {
        &self.inner.link
    }

    /// Register work to run during cleanup, after the final STOP.
    pub fn on_shutdown<F>(&self, hook: F)
    where
        F: FnOnce(Trigger) + Send + 'static,
    {
        lock(&self.inner.hooks).push(Box::new(hook));
    }

    /// Run cleanup for `trigger`. Returns false if cleanup already ran.
    ///
    /// A concurrent second trigger blocks until the first cleanup completes.
    pub fn finalize(&self, trigger: Trigger) -> bool {
        let mut fired = lock(&self.inner.fired);
        if fired.is_some() {
            return false;
        }

        let link = &self.inner.link;
        link.logger().debug(format!("cleanup triggered by {trigger:?}"));
        link.stop_monitor();

        if link.is_connected() && !link.stop_sent() {
            let identity = link.identity();
            let stop = Message::stop(&identity.tool, &identity.directory, INTERRUPTED_STATUS);
            link.send_once(&stop);
        }

        let hooks: Vec<ShutdownHook> = lock(&self.inner.hooks).drain(..).collect();
        for hook in hooks {
            hook(trigger);
        }

        *fired = Some(trigger);
        true
    }

    /// The trigger that ran cleanup, if it has run.
    pub fn fired(&self) -> Option<Trigger> {
        *lock(&self.inner.fired)
    }

    /// Block forever if a signal already ran cleanup.
    ///
    /// The signal thread exits the process right after cleanup; the foreground thread
    /// must not report or exit on its own in the meantime.
    pub fn wait_if_signalled(&self) {
        if matches!(self.fired(), Some(trigger) if trigger != Trigger::Exit) {
            loop {
                thread::park();
            }
        }
    }

    /// Guard that runs the normal-exit cleanup when dropped.
    pub fn exit_guard(&self) -> ExitGuard {
        ExitGuard {
            lifecycle: self.clone(),
        }
    }
}

/// Runs [`Lifecycle::finalize`] with [`Trigger::Exit`] on drop.
pub struct ExitGuard {
    lifecycle: Lifecycle,
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        self.lifecycle.finalize(Trigger::Exit);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
