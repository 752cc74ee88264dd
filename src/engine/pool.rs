// src/engine/pool.rs

//! Fixed-size worker pool.
//!
//! The pool owns `concurrency` slots, each identified by a [`SlotId`]. A task
//! may only start once the dispatcher holds a free slot token for it, and the
//! token is handed back after the task's outcome has been sent. This caps the
//! number of live child processes at `concurrency` no matter how long the
//! task list is.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::exec::ExecutorBackend;
use crate::types::{Outcome, Task};

/// Token representing ownership of one execution slot.
pub type SlotId = usize;

pub struct WorkerPool<E: ExecutorBackend + 'static> {
    executor: Arc<E>,
    concurrency: usize,
    timeout: Option<Duration>,
}

impl<E: ExecutorBackend + 'static> std::fmt::Debug for WorkerPool<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("concurrency", &self.concurrency)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend + 'static> WorkerPool<E> {
    /// `concurrency` is clamped to at least 1. Values above the number of
    /// hardware threads are accepted as-is.
    pub fn new(executor: Arc<E>, concurrency: usize, timeout: Option<Duration>) -> Self {
        Self {
            executor,
            concurrency: concurrency.max(1),
            timeout,
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Start executing `tasks` and return the stream of their outcomes.
    ///
    /// Tasks are started in input order; outcomes arrive in completion order.
    /// Every task produces exactly one outcome, including tasks whose
    /// execution panicked. The channel closes once all of them are sent.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn run(&self, tasks: Vec<Arc<Task>>) -> mpsc::Receiver<Outcome> {
        let (outcome_tx, outcome_rx) = mpsc::channel::<Outcome>(self.concurrency);
        let (release_tx, mut release_rx) = mpsc::channel::<SlotId>(self.concurrency);

        let executor = Arc::clone(&self.executor);
        let concurrency = self.concurrency;
        let timeout = self.timeout;

        tokio::spawn(async move {
            info!(tasks = tasks.len(), concurrency, "worker pool started");

            // Slots not yet handed out; reversed so slot 0 goes first.
            let mut free: Vec<SlotId> = (0..concurrency).rev().collect();

            for task in tasks {
                let slot = match free.pop() {
                    Some(slot) => slot,
                    None => match release_rx.recv().await {
                        Some(slot) => slot,
                        // We hold `release_tx` ourselves, so this cannot close.
                        None => break,
                    },
                };

                if outcome_tx.is_closed() {
                    debug!("outcome receiver dropped; not dispatching remaining tasks");
                    break;
                }

                debug!(slot, index = task.index(), dir = %task.work_dir().display(), "dispatching task");

                spawn_slot(
                    slot,
                    task,
                    Arc::clone(&executor),
                    timeout,
                    outcome_tx.clone(),
                    release_tx.clone(),
                );
            }

            debug!("all tasks dispatched");
        });

        outcome_rx
    }
}

/// Run one task in `slot`, send its outcome, then give the slot back.
fn spawn_slot<E: ExecutorBackend + 'static>(
    slot: SlotId,
    task: Arc<Task>,
    executor: Arc<E>,
    timeout: Option<Duration>,
    outcome_tx: mpsc::Sender<Outcome>,
    release_tx: mpsc::Sender<SlotId>,
) {
    tokio::spawn(async move {
        let started = Instant::now();

        // Run the execution as its own Tokio task so that a panic inside the
        // executor is observed here as a JoinError instead of losing the slot.
        let execution = {
            let task = Arc::clone(&task);
            tokio::spawn(async move { executor.execute(task, timeout).await })
        };

        let outcome = match execution.await {
            Ok(outcome) => outcome,
            Err(join_err) => {
                error!(
                    slot,
                    dir = %task.work_dir().display(),
                    error = %join_err,
                    "task execution crashed"
                );
                Outcome::launch_failed(
                    &task,
                    started.elapsed(),
                    format!("task execution crashed: {join_err}"),
                )
            }
        };

        if outcome_tx.send(outcome).await.is_err() {
            debug!(slot, "outcome receiver dropped; discarding outcome");
        }

        // The dispatcher is gone once every task has been handed out.
        let _ = release_tx.send(slot).await;
    });
}
