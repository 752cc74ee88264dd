// src/types.rs

//! Core value types shared by the executor, the pool and the aggregator.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// One unit of work: the shared command line, run inside one work directory.
///
/// Tasks are built once from the path list before the pool starts and are
/// never mutated afterwards, so the fields are private and only exposed
/// through accessors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    index: usize,
    command: Arc<str>,
    work_dir: PathBuf,
}

impl Task {
    pub fn new(index: usize, command: Arc<str>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            index,
            command,
            work_dir: work_dir.into(),
        }
    }

    /// Position of this task in the submitted path list.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }
}

/// Terminal classification of a single task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    /// The process exited with code 0.
    Success,
    /// The process exited non-zero, was killed by a signal, or never started.
    Failure,
    /// The process outlived its timeout and was killed.
    TimedOut,
}

impl TaskStatus {
    pub fn is_success(self) -> bool {
        matches!(self, TaskStatus::Success)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Success => "success",
            TaskStatus::Failure => "failure",
            TaskStatus::TimedOut => "timeout",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of executing one [`Task`].
///
/// The outcome points back at its task by submission index and carries a copy
/// of the work directory for reporting; it never owns the task itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub task_index: usize,
    pub work_dir: PathBuf,
    pub status: TaskStatus,
    /// `None` for timeouts, launch failures and signal deaths.
    pub exit_code: Option<i32>,
    pub duration: Duration,
    /// OS process id of the child, if it was spawned.
    pub pid: Option<u32>,
    /// Human-readable cause for anything that is not a clean success.
    pub detail: Option<String>,
}

impl Outcome {
    /// Process ran to completion and reported an exit code.
    pub fn exited(task: &Task, pid: Option<u32>, code: i32, duration: Duration) -> Self {
        let (status, detail) = if code == 0 {
            (TaskStatus::Success, None)
        } else {
            (
                TaskStatus::Failure,
                Some(format!("command returned non-zero exit status {code}")),
            )
        };

        Self {
            task_index: task.index(),
            work_dir: task.work_dir().to_path_buf(),
            status,
            exit_code: Some(code),
            duration,
            pid,
            detail,
        }
    }

    /// Process terminated without an exit code (e.g. killed by a signal).
    pub fn terminated(task: &Task, pid: Option<u32>, duration: Duration, detail: String) -> Self {
        Self {
            task_index: task.index(),
            work_dir: task.work_dir().to_path_buf(),
            status: TaskStatus::Failure,
            exit_code: None,
            duration,
            pid,
            detail: Some(detail),
        }
    }

    /// The process could not be started at all.
    pub fn launch_failed(task: &Task, duration: Duration, cause: impl Into<String>) -> Self {
        Self {
            task_index: task.index(),
            work_dir: task.work_dir().to_path_buf(),
            status: TaskStatus::Failure,
            exit_code: None,
            duration,
            pid: None,
            detail: Some(cause.into()),
        }
    }

    /// The process exceeded `timeout` and was killed. The recorded duration is
    /// the timeout itself.
    pub fn timed_out(task: &Task, pid: Option<u32>, timeout: Duration) -> Self {
        Self {
            task_index: task.index(),
            work_dir: task.work_dir().to_path_buf(),
            status: TaskStatus::TimedOut,
            exit_code: None,
            duration: timeout,
            pid,
            detail: Some(format!(
                "command timed out after {:.3} seconds",
                timeout.as_secs_f64()
            )),
        }
    }

    pub fn duration_millis(&self) -> u128 {
        self.duration.as_millis()
    }
}

/// Build the task list for a run: one task per work directory, all sharing
/// the same command, in input order.
pub fn build_tasks<P: AsRef<Path>>(command: &str, work_dirs: &[P]) -> Vec<Arc<Task>> {
    let command: Arc<str> = Arc::from(command);
    work_dirs
        .iter()
        .enumerate()
        .map(|(index, dir)| Arc::new(Task::new(index, Arc::clone(&command), dir.as_ref())))
        .collect()
}
