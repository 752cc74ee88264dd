// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running the command of a task
//! using `tokio::process::Command` and turning whatever happens into an
//! [`Outcome`](crate::types::Outcome).
//!
//! - [`command`] builds the OS command (shell vs direct, cwd, env, output).
//! - [`task_runner`] runs one task and enforces its timeout.
//! - [`kill`] terminates a runaway process tree and reaps it.
//! - [`registry`] tracks live children so an interrupted run can kill them.
//! - [`backend`] provides the `ExecutorBackend` trait and the concrete
//!   `RealExecutorBackend` used in production, which tests can replace with
//!   a fake implementation.

pub mod backend;
pub mod command;
pub mod kill;
pub mod registry;
pub mod task_runner;

pub use backend::{ExecutorBackend, RealExecutorBackend};
pub use command::{ExecOptions, OutputMode};
pub use registry::ProcessRegistry;
pub use task_runner::run_task;
