#![allow(dead_code)]

use std::path::PathBuf;
use std::time::Duration;

use dtm::types::{Outcome, TaskStatus};

/// `count` distinct work directory names: `case_00`, `case_01`, ...
pub fn work_dirs(count: usize) -> Vec<PathBuf> {
    (0..count).map(|i| PathBuf::from(format!("case_{i:02}"))).collect()
}

/// Builder for `Outcome` to simplify aggregator tests.
pub struct OutcomeBuilder {
    outcome: Outcome,
}

impl OutcomeBuilder {
    /// A successful outcome for `dir` with exit code 0.
    pub fn new(dir: &str) -> Self {
        Self {
            outcome: Outcome {
                task_index: 0,
                work_dir: PathBuf::from(dir),
                status: TaskStatus::Success,
                exit_code: Some(0),
                duration: Duration::from_millis(10),
                pid: Some(1000),
                detail: None,
            },
        }
    }

    pub fn index(mut self, index: usize) -> Self {
        self.outcome.task_index = index;
        self
    }

    pub fn failed(mut self, code: i32) -> Self {
        self.outcome.status = TaskStatus::Failure;
        self.outcome.exit_code = Some(code);
        self.outcome.detail = Some(format!("command returned non-zero exit status {code}"));
        self
    }

    pub fn launch_error(mut self) -> Self {
        self.outcome.status = TaskStatus::Failure;
        self.outcome.exit_code = None;
        self.outcome.pid = None;
        self.outcome.detail = Some("could not be started".to_string());
        self
    }

    pub fn timed_out(mut self, after: Duration) -> Self {
        self.outcome.status = TaskStatus::TimedOut;
        self.outcome.exit_code = None;
        self.outcome.duration = after;
        self.outcome.detail = Some("timed out".to_string());
        self
    }

    pub fn duration_ms(mut self, ms: u64) -> Self {
        self.outcome.duration = Duration::from_millis(ms);
        self
    }

    pub fn pid(mut self, pid: u32) -> Self {
        self.outcome.pid = Some(pid);
        self
    }

    pub fn build(self) -> Outcome {
        self.outcome
    }
}
