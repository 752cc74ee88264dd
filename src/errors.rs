// src/errors.rs

//! Crate-wide error aliases and helpers.
//!
//! Only run-level problems live here. Anything that goes wrong while running
//! a single task is folded into that task's [`crate::types::Outcome`] instead.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DtmError {
    /// The run cannot start (empty task list, empty command, bad settings).
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// The number of outcomes does not match the number of submitted tasks,
    /// e.g. because the outcome stream closed early.
    #[error("received {received} outcomes for {expected} submitted tasks")]
    OutcomeCountMismatch { received: usize, expected: usize },

    /// The run was stopped by a signal; running tasks were killed.
    #[error("interrupted by {signal}")]
    Interrupted { signal: &'static str },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, DtmError>;
