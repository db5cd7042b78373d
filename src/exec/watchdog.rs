// src/exec/watchdog.rs

//! Forced termination of a running process.
//!
//! A [`Watchdog`] monitors at most one execution at a time. It ends that
//! execution when its timeout elapses, or immediately when
//! [`Watchdog::destroy_process`] is called. The executor owns the child; the
//! watchdog only tells it when to kill.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::{Instant, sleep_until};
use tracing::debug;

use crate::errors::{ProcrunError, Result};

struct Inner {
    timeout: Option<Duration>,
    watching: AtomicBool,
    kill_requested: AtomicBool,
    killed: AtomicBool,
    kill: Notify,
}

/// Cloneable handle; clones share state.
#[derive(Clone)]
pub struct Watchdog {
    inner: Arc<Inner>,
}

impl Watchdog {
    /// Kill the monitored process once `timeout` has elapsed since it started.
    pub fn new(timeout: Duration) -> Self {
        Self::with_timeout(Some(timeout))
    }

    /// No timeout; the process is only killed through `destroy_process`.
    pub fn manual() -> Self {
        Self::with_timeout(None)
    }

    fn with_timeout(timeout: Option<Duration>) -> Self {
        Self {
            inner: Arc::new(Inner {
                timeout,
                watching: AtomicBool::new(false),
                kill_requested: AtomicBool::new(false),
                killed: AtomicBool::new(false),
                kill: Notify::new(),
            }),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.inner.timeout
    }

    pub fn is_watching(&self) -> bool {
        self.inner.watching.load(Ordering::SeqCst)
    }

    /// Whether the last monitored process was killed by this watchdog.
    pub fn killed_process(&self) -> bool {
        self.inner.killed.load(Ordering::SeqCst)
    }

    /// Kill the monitored process now. Does nothing when idle.
    pub fn destroy_process(&self) {
        if !self.is_watching() {
            debug!("destroy_process called on idle watchdog; ignoring");
            return;
        }
        self.inner.kill_requested.store(true, Ordering::SeqCst);
        self.inner.kill.notify_waiters();
    }

    /// Begin monitoring a new execution.
    pub(crate) fn start(&self) -> Result<WatchGuard> {
        if self
            .inner
            .watching
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ProcrunError::WatchdogBusy);
        }
        // `kill_requested` was cleared by the previous guard; a request
        // arriving from here on belongs to this execution.
        self.inner.killed.store(false, Ordering::SeqCst);

        Ok(WatchGuard {
            dog: self.clone(),
            deadline: self.inner.timeout.map(|t| Instant::now() + t),
        })
    }
}

impl fmt::Debug for Watchdog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watchdog")
            .field("timeout", &self.inner.timeout)
            .field("watching", &self.is_watching())
            .field("killed", &self.killed_process())
            .finish()
    }
}

/// Active monitoring of one execution; releases the watchdog on drop.
pub(crate) struct WatchGuard {
    dog: Watchdog,
    deadline: Option<Instant>,
}

impl WatchGuard {
    /// Completes when the monitored process must be killed.
    pub(crate) async fn expired(&self) {
        let requested = async {
            let inner = &self.dog.inner;
            let notified = inner.kill.notified();
            tokio::pin!(notified);
            // Register before checking the flag so a concurrent
            // `destroy_process` cannot slip between the two.
            notified.as_mut().enable();
            if inner.kill_requested.load(Ordering::SeqCst) {
                return;
            }
            notified.await;
        };

        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = sleep_until(deadline) => {
                        debug!(timeout = ?self.dog.inner.timeout, "watchdog timeout elapsed");
                    }
                    _ = requested => {
                        debug!("watchdog kill requested");
                    }
                }
            }
            None => requested.await,
        }
    }

    pub(crate) fn mark_killed(&self) {
        self.dog.inner.killed.store(true, Ordering::SeqCst);
    }
}

impl Drop for WatchGuard {
    fn drop(&mut self) {
        self.dog.inner.kill_requested.store(false, Ordering::SeqCst);
        self.dog.inner.watching.store(false, Ordering::SeqCst);
    }
}
