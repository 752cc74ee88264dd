// src/engine/report.rs

//! The finalized record of a run and its text renderings.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::types::{Outcome, TaskStatus};

/// One row of the status record, in completion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub work_dir: PathBuf,
    pub status: TaskStatus,
    pub exit_code: Option<i32>,
    pub pid: Option<u32>,
    pub duration: Duration,
}

impl From<&Outcome> for StatusLine {
    fn from(outcome: &Outcome) -> Self {
        Self {
            work_dir: outcome.work_dir.clone(),
            status: outcome.status,
            exit_code: outcome.exit_code,
            pid: outcome.pid,
            duration: outcome.duration,
        }
    }
}

/// Final report of a run. Built by the
/// [`Aggregator`](super::aggregator::Aggregator) and immutable afterwards.
///
/// Always satisfies `succeeded + failed + timed_out == total`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    total: usize,
    succeeded: usize,
    failed: usize,
    timed_out: usize,
    status_lines: Vec<StatusLine>,
    failed_paths: BTreeSet<PathBuf>,
}

impl RunReport {
    pub(crate) fn new(
        succeeded: usize,
        failed: usize,
        timed_out: usize,
        status_lines: Vec<StatusLine>,
        failed_paths: BTreeSet<PathBuf>,
    ) -> Self {
        Self {
            total: succeeded + failed + timed_out,
            succeeded,
            failed,
            timed_out,
            status_lines,
            failed_paths,
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn succeeded(&self) -> usize {
        self.succeeded
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn timed_out(&self) -> usize {
        self.timed_out
    }

    /// Status lines in arrival (completion) order.
    pub fn status_lines(&self) -> &[StatusLine] {
        &self.status_lines
    }

    /// Work directories whose task failed or timed out.
    pub fn failed_paths(&self) -> &BTreeSet<PathBuf> {
        &self.failed_paths
    }

    pub fn all_succeeded(&self) -> bool {
        self.succeeded == self.total
    }

    /// One-line human summary.
    pub fn summary(&self) -> String {
        format!(
            "{} tasks: {} succeeded, {} failed, {} timed out",
            self.total, self.succeeded, self.failed, self.timed_out
        )
    }

    /// Render the durable status record: an aligned table in arrival order
    /// followed by the totals.
    pub fn render_status_record(&self) -> String {
        let path_width = 5 + self
            .status_lines
            .iter()
            .map(|l| display_path(&l.work_dir).chars().count())
            .max()
            .unwrap_or(0)
            .max("Path".len());

        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:<path_width$}{:>10}{:>10}{:>12}{:>16}",
            "Path", "PID", "Status", "Exit code", "Duration (ms)"
        );
        let rule = "-".repeat(path_width + 48);
        let _ = writeln!(out, "{rule}");

        for line in &self.status_lines {
            let pid = line.pid.map_or_else(|| "-".to_string(), |p| p.to_string());
            let code = line
                .exit_code
                .map_or_else(|| "-".to_string(), |c| c.to_string());
            let _ = writeln!(
                out,
                "{:<path_width$}{:>10}{:>10}{:>12}{:>16}",
                display_path(&line.work_dir),
                pid,
                line.status.as_str(),
                code,
                line.duration.as_millis()
            );
        }

        let _ = writeln!(out, "{rule}");
        let _ = writeln!(
            out,
            "total={} succeeded={} failed={} timed_out={}",
            self.total, self.succeeded, self.failed, self.timed_out
        );
        out
    }

    /// Render the failed paths one per line, usable as a fresh path file.
    pub fn render_failed_paths(&self) -> String {
        let mut out = String::new();
        for path in &self.failed_paths {
            out.push_str(&display_path(path));
            out.push('\n');
        }
        out
    }
}

fn display_path(path: &Path) -> String {
    path.display().to_string()
}
