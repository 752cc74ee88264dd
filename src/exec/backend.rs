// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The worker pool talks to an `ExecutorBackend` instead of spawning
//! processes itself. This makes it easy to swap in a fake executor in tests
//! while keeping the production implementation in [`task_runner`].
//!
//! [`task_runner`]: super::task_runner

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use crate::exec::command::ExecOptions;
use crate::exec::registry::ProcessRegistry;
use crate::exec::task_runner::run_task;
use crate::types::{Outcome, Task};

/// Trait abstracting how one task is executed.
///
/// Implementations must resolve to exactly one [`Outcome`] per call and must
/// honour `timeout` themselves; the pool does not second-guess them.
pub trait ExecutorBackend: Send + Sync {
    fn execute(
        &self,
        task: Arc<Task>,
        timeout: Option<Duration>,
    ) -> Pin<Box<dyn Future<Output = Outcome> + Send + '_>>;
}

/// Real executor backend used in production: one OS child process per task.
#[derive(Debug, Clone, Default)]
pub struct RealExecutorBackend {
    options: ExecOptions,
    processes: ProcessRegistry,
}

impl RealExecutorBackend {
    pub fn new(options: ExecOptions) -> Self {
        Self {
            options,
            processes: ProcessRegistry::new(),
        }
    }

    /// Children currently alive; shut it down to stop the run's processes.
    pub fn processes(&self) -> &ProcessRegistry {
        &self.processes
    }
}

impl ExecutorBackend for RealExecutorBackend {
    fn execute(
        &self,
        task: Arc<Task>,
        timeout: Option<Duration>,
    ) -> Pin<Box<dyn Future<Output = Outcome> + Send + '_>> {
        Box::pin(run_task(task, timeout, &self.options, &self.processes))
    }
}
