// src/config/mod.rs

//! Configuration loading and validation for dtm.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate values (`validate.rs`).
//! - Merge CLI flags over the file into the settings of one run
//!   (`settings.rs`).

pub mod loader;
pub mod model;
pub mod settings;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{ConfigFile, OutputSection, RawConfigFile, RunSection};
pub use settings::{RunSettings, default_concurrency};
