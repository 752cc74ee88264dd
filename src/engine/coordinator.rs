// src/engine/coordinator.rs

//! End-to-end orchestration of one run.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::engine::aggregator::Aggregator;
use crate::engine::pool::WorkerPool;
use crate::engine::report::RunReport;
use crate::errors::{DtmError, Result};
use crate::exec::ExecutorBackend;
use crate::sink::ReportSink;
use crate::types::{build_tasks, Outcome, Task};

/// How often the number of pending tasks is logged while a run drains.
pub const DEFAULT_PENDING_INTERVAL: Duration = Duration::from_secs(15);

/// Drives one run: validate → dispatch → aggregate → emit.
pub struct Coordinator<E: ExecutorBackend + 'static> {
    pool: WorkerPool<E>,
    pending_interval: Duration,
}

impl<E: ExecutorBackend + 'static> Coordinator<E> {
    pub fn new(executor: Arc<E>, concurrency: usize, timeout: Option<Duration>) -> Self {
        Self {
            pool: WorkerPool::new(executor, concurrency, timeout),
            pending_interval: DEFAULT_PENDING_INTERVAL,
        }
    }

    /// Clamped to at least 1 ms.
    pub fn with_pending_interval(mut self, interval: Duration) -> Self {
        self.pending_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Run `command` once in every directory of `work_dirs` and hand the
    /// finished report to `sink`.
    ///
    /// Fails before anything is dispatched (and before the sink is touched)
    /// if there is nothing to run. Otherwise every task is run to completion,
    /// however many of them fail.
    pub async fn run<P: AsRef<Path>>(
        &self,
        command: &str,
        work_dirs: &[P],
        sink: &dyn ReportSink,
    ) -> Result<RunReport> {
        let tasks = plan_tasks(command, work_dirs)?;
        let total = tasks.len();

        info!(
            tasks = total,
            concurrency = self.pool.concurrency(),
            "dispatching tasks to worker pool"
        );

        let outcomes = self.pool.run(tasks);
        let report = drain_outcomes(outcomes, total, self.pending_interval).await?;

        info!("{}", report.summary());
        sink.emit(&report)?;

        Ok(report)
    }
}

/// Build the task list for a run, rejecting runs that must not start.
pub fn plan_tasks<P: AsRef<Path>>(command: &str, work_dirs: &[P]) -> Result<Vec<Arc<Task>>> {
    if command.trim().is_empty() {
        return Err(DtmError::ConfigError("the command must not be empty".to_string()));
    }
    if work_dirs.is_empty() {
        return Err(DtmError::ConfigError(
            "the list of work directories is empty".to_string(),
        ));
    }
    Ok(build_tasks(command, work_dirs))
}

/// Feed outcomes into a fresh aggregator until all `expected` have arrived.
///
/// Logs one progress line per outcome and, every `pending_interval`, the
/// number of tasks still outstanding.
pub async fn drain_outcomes(
    mut outcomes: mpsc::Receiver<Outcome>,
    expected: usize,
    pending_interval: Duration,
) -> Result<RunReport> {
    let mut aggregator = Aggregator::new(expected);

    let mut ticker = tokio::time::interval(pending_interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    while !aggregator.is_complete() {
        tokio::select! {
            next = outcomes.recv() => {
                let Some(outcome) = next else {
                    warn!(
                        received = aggregator.received(),
                        expected,
                        "outcome stream closed before all tasks reported"
                    );
                    break;
                };
                let progress = aggregator.record(&outcome);
                log_progress(&outcome, progress.received, progress.expected);
            }

            _ = ticker.tick() => {
                info!(pending = aggregator.pending(), "tasks pending");
            }
        }
    }

    debug!(received = aggregator.received(), "outcome collection finished");
    aggregator.finish()
}

fn log_progress(outcome: &Outcome, received: usize, expected: usize) {
    let dir = outcome.work_dir.display();
    match (&outcome.exit_code, &outcome.detail) {
        (_, None) => info!("[{received}/{expected}] {dir}: {}", outcome.status),
        (Some(code), Some(_)) => {
            info!("[{received}/{expected}] {dir}: {} (exit code {code})", outcome.status)
        }
        (None, Some(detail)) => {
            info!("[{received}/{expected}] {dir}: {} ({detail})", outcome.status)
        }
    }
}
