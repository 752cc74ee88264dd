// src/engine/aggregator.rs

//! Pure result aggregator.
//!
//! This is a synchronous, deterministic state machine: it consumes
//! [`Outcome`]s one at a time and accumulates the counts, status lines and
//! failed paths of a [`RunReport`]. It has no channels, no Tokio types and
//! performs no IO; the coordinator feeds it from the outcome channel.
//!
//! Feeding the same outcome sequence into a fresh aggregator always yields an
//! identical report.

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::engine::report::{RunReport, StatusLine};
use crate::errors::{DtmError, Result};
use crate::types::{Outcome, TaskStatus};

/// Snapshot returned after recording one outcome, for progress logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub received: usize,
    pub expected: usize,
    pub status: TaskStatus,
}

#[derive(Debug)]
pub struct Aggregator {
    expected: usize,
    succeeded: usize,
    failed: usize,
    timed_out: usize,
    status_lines: Vec<StatusLine>,
    failed_paths: BTreeSet<PathBuf>,
}

impl Aggregator {
    /// Aggregator for a run of `expected` submitted tasks.
    pub fn new(expected: usize) -> Self {
        Self {
            expected,
            succeeded: 0,
            failed: 0,
            timed_out: 0,
            status_lines: Vec::with_capacity(expected),
            failed_paths: BTreeSet::new(),
        }
    }

    /// Tally one outcome. Each outcome bumps exactly one counter and appends
    /// exactly one status line.
    pub fn record(&mut self, outcome: &Outcome) -> Progress {
        match outcome.status {
            TaskStatus::Success => self.succeeded += 1,
            TaskStatus::Failure => self.failed += 1,
            TaskStatus::TimedOut => self.timed_out += 1,
        }

        if !outcome.status.is_success() {
            self.failed_paths.insert(outcome.work_dir.clone());
        }

        self.status_lines.push(StatusLine::from(outcome));

        Progress {
            received: self.received(),
            expected: self.expected,
            status: outcome.status,
        }
    }

    pub fn received(&self) -> usize {
        self.succeeded + self.failed + self.timed_out
    }

    pub fn pending(&self) -> usize {
        self.expected.saturating_sub(self.received())
    }

    /// True exactly when every submitted task has reported.
    pub fn is_complete(&self) -> bool {
        self.received() == self.expected
    }

    /// Freeze the aggregated state into the final report.
    ///
    /// Fails if the number of recorded outcomes differs from the number of
    /// submitted tasks.
    pub fn finish(self) -> Result<RunReport> {
        if !self.is_complete() {
            return Err(DtmError::OutcomeCountMismatch {
                received: self.received(),
                expected: self.expected,
            });
        }

        Ok(RunReport::new(
            self.succeeded,
            self.failed,
            self.timed_out,
            self.status_lines,
            self.failed_paths,
        ))
    }
}
