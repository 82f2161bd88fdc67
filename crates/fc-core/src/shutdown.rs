//! Cooperative stop signal shared between a worker thread and its owner.

use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Duration;

/// One-shot stop flag with an interruptible sleep.
///
/// Work that must not run after teardown begins goes through
/// [`StopSignal::run_unless_stopped`], which holds the flag's lock for the
/// duration of the closure. Once [`StopSignal::stop`] returns, no such
/// closure can start.
#[derive(Debug, Default)]
pub struct StopSignal {
    stopped: Mutex<bool>,
    changed: Condvar,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        let mut stopped = self.stopped.lock().unwrap_or_else(PoisonError::into_inner);
        *stopped = true;
        self.changed.notify_all();
    }

    pub fn is_stopped(&self) -> bool {
        *self.stopped.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleep for `duration` unless stopped first. Returns `true` if stopped.
    pub fn sleep(&self, duration: Duration) -> bool {
        let stopped = self.stopped.lock().unwrap_or_else(PoisonError::into_inner);
        let (stopped, _) = self
            .changed
            .wait_timeout_while(stopped, duration, |stopped| !*stopped)
            .unwrap_or_else(PoisonError::into_inner);
        *stopped
    }

    /// Run `f` only if the signal has not fired, excluding a concurrent `stop`.
    pub fn run_unless_stopped<R>(&self, f: impl FnOnce() -> R) -> Option<R> {
        let stopped = self.stopped.lock().unwrap_or_else(PoisonError::into_inner);
        if *stopped {
            return None;
        }
        let out = f();
        drop(stopped);
        Some(out)
    }
}
