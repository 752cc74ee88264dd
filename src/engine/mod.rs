// src/engine/mod.rs

//! Task-execution engine.
//!
//! This module ties together:
//! - the worker pool that dispatches one task per work directory
//!   ([`pool`]),
//! - the pure result aggregator that tallies outcomes in arrival order
//!   ([`aggregator`]),
//! - the finalized report and its renderings ([`report`]),
//! - the coordinator that drives one run end to end ([`coordinator`]).

pub mod aggregator;
pub mod coordinator;
pub mod pool;
pub mod report;

pub use aggregator::{Aggregator, Progress};
pub use coordinator::{drain_outcomes, plan_tasks, Coordinator, DEFAULT_PENDING_INTERVAL};
pub use pool::{SlotId, WorkerPool};
pub use report::{RunReport, StatusLine};
