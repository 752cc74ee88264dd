// src/exec/registry.rs

//! Live child processes of a run.
//!
//! Every child runs in its own process group, so a Ctrl-C at the terminal
//! never reaches it. The registry remembers which groups are alive so that an
//! interrupted run can take them down before exiting.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;
use tracing::debug;

use crate::exec::kill::kill_process_group;

#[derive(Debug, Default)]
struct Inner {
    live: HashSet<u32>,
    closed: bool,
}

/// Shared set of running child pids. Clones share the same set.
#[derive(Debug, Clone, Default)]
pub struct ProcessRegistry {
    inner: Arc<Mutex<Inner>>,
    drained: Arc<Notify>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a freshly spawned child.
    ///
    /// Returns `false` once the registry has been shut down. The child's
    /// group is then killed immediately and the caller only has to reap it.
    pub fn register(&self, pid: u32) -> bool {
        let mut inner = self.lock();
        if inner.closed {
            drop(inner);
            debug!(pid, "run is shutting down; killing late process");
            kill_process_group(pid);
            return false;
        }
        inner.live.insert(pid);
        true
    }

    /// Forget a child after it has been reaped.
    pub fn unregister(&self, pid: u32) {
        let mut inner = self.lock();
        inner.live.remove(&pid);
        if inner.live.is_empty() {
            self.drained.notify_waiters();
        }
    }

    pub fn live(&self) -> usize {
        self.lock().live.len()
    }

    pub fn is_shut_down(&self) -> bool {
        self.lock().closed
    }

    /// Refuse new children and SIGKILL the group of every live one.
    ///
    /// Returns how many groups were signalled. Reaping stays with the task
    /// runners; use [`ProcessRegistry::wait_drained`] to wait for it.
    pub fn shutdown(&self) -> usize {
        let pids: Vec<u32> = {
            let mut inner = self.lock();
            inner.closed = true;
            inner.live.iter().copied().collect()
        };
        for &pid in &pids {
            kill_process_group(pid);
        }
        pids.len()
    }

    /// Wait until no tracked child is left. Gives up after `limit` and
    /// returns `false`.
    pub async fn wait_drained(&self, limit: Duration) -> bool {
        let drained = async {
            loop {
                // Registered before the check so a wakeup cannot slip past.
                let notified = self.drained.notified();
                if self.live() == 0 {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(limit, drained).await.is_ok()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn drains_once_every_child_is_unregistered() {
        let registry = ProcessRegistry::new();
        assert!(registry.wait_drained(Duration::from_millis(10)).await);

        // Never signalled: the registry is still open.
        assert!(registry.register(u32::MAX));
        assert_eq!(registry.live(), 1);
        assert!(!registry.wait_drained(Duration::from_millis(20)).await);

        let waiter = {
            let registry = registry.clone();
            tokio::spawn(async move { registry.wait_drained(Duration::from_secs(5)).await })
        };
        tokio::task::yield_now().await;
        registry.unregister(u32::MAX);

        assert!(waiter.await.unwrap());
        assert_eq!(registry.live(), 0);
    }

    #[test]
    fn shutdown_closes_the_registry() {
        let registry = ProcessRegistry::new();
        assert!(!registry.is_shut_down());
        assert_eq!(registry.shutdown(), 0);
        assert!(registry.is_shut_down());
    }
}
