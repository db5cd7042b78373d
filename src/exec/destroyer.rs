// src/exec/destroyer.rs

//! Cleanup of still-running child processes when we are shutting down.

use std::collections::BTreeSet;
use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Registry of running child processes.
///
/// The executor adds each child after spawning it and removes it once the
/// child has exited. What happens to registered processes on shutdown is up
/// to the implementation.
pub trait ProcessDestroyer: Send + Sync + Debug {
    /// Register a running process. Returns `false` if it was not added.
    fn add(&self, pid: u32) -> bool;

    /// Forget a process. Returns `false` if it was not registered.
    fn remove(&self, pid: u32) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether registered processes are being destroyed. Nothing new should
    /// be launched once this is true.
    fn is_shutting_down(&self) -> bool {
        false
    }
}

/// Kills every registered process when [`destroy_all`] runs, typically from
/// the Ctrl-C hook installed by [`install_ctrl_c_hook`].
///
/// [`destroy_all`]: ShutdownHookProcessDestroyer::destroy_all
/// [`install_ctrl_c_hook`]: ShutdownHookProcessDestroyer::install_ctrl_c_hook
#[derive(Debug, Default)]
pub struct ShutdownHookProcessDestroyer {
    pids: Mutex<BTreeSet<u32>>,
    shutting_down: AtomicBool,
}

impl ShutdownHookProcessDestroyer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registered pids, in ascending order.
    pub fn pids(&self) -> Vec<u32> {
        self.lock().iter().copied().collect()
    }

    /// Kill every registered process. Returns how many were signalled.
    ///
    /// Once called, new registrations are refused.
    pub fn destroy_all(&self) -> usize {
        self.shutting_down.store(true, Ordering::SeqCst);
        let pids = std::mem::take(&mut *self.lock());

        let mut killed = 0;
        for pid in pids {
            if kill_pid(pid) {
                killed += 1;
            }
        }
        info!(killed, "process destroyer finished");
        killed
    }

    /// Spawn a task that runs [`Self::destroy_all`] on Ctrl-C.
    pub fn install_ctrl_c_hook(self: &Arc<Self>) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl+C; process destroyer inactive");
                return;
            }
            info!("Ctrl+C received; destroying registered processes");
            this.destroy_all();
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeSet<u32>> {
        self.pids.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ProcessDestroyer for ShutdownHookProcessDestroyer {
    fn add(&self, pid: u32) -> bool {
        if self.is_shutting_down() {
            warn!(pid, "shutdown in progress; refusing to register process");
            return false;
        }
        self.lock().insert(pid)
    }

    fn remove(&self, pid: u32) -> bool {
        self.lock().remove(&pid)
    }

    fn len(&self) -> usize {
        self.lock().len()
    }

    fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }
}

#[cfg(unix)]
fn kill_pid(pid: u32) -> bool {
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        warn!(pid, "pid out of range; cannot signal");
        return false;
    };

    match signal::kill(Pid::from_raw(raw), Signal::SIGKILL) {
        Ok(()) => {
            info!(pid, "sent SIGKILL");
            true
        }
        Err(e) => {
            warn!(pid, error = %e, "failed to send SIGKILL");
            false
        }
    }
}

#[cfg(not(unix))]
fn kill_pid(pid: u32) -> bool {
    warn!(pid, "process destruction by pid is not supported on this platform");
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_remove_track_pids() {
        let d = ShutdownHookProcessDestroyer::new();
        assert!(d.is_empty());
        assert!(d.add(10));
        assert!(!d.add(10));
        assert!(d.add(11));
        assert_eq!(d.pids(), vec![10, 11]);
        assert!(d.remove(10));
        assert!(!d.remove(10));
        assert_eq!(d.len(), 1);
    }

    #[test]
    fn registrations_are_refused_after_destroy_all() {
        let d = ShutdownHookProcessDestroyer::new();
        assert_eq!(d.destroy_all(), 0);
        assert!(d.is_shutting_down());
        assert!(!d.add(42));
        assert!(d.is_empty());
    }
}
