// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [run]
/// processes = 4
/// timeout = 30.0
/// shell = true
///
/// [output]
/// status_file = "status.txt"
/// failed_file = "failed_paths.txt"
///
/// [env]
/// SOLVER_THREADS = "1"
/// ```
///
/// All sections are optional. This is the unvalidated shape; use
/// [`ConfigFile`] (built via `TryFrom`) everywhere else.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub run: RunSection,

    #[serde(default)]
    pub output: OutputSection,

    /// Extra environment variables for every task.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// `[run]` section: how tasks are executed.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunSection {
    /// Number of concurrent worker slots. `None` means "available CPUs".
    #[serde(default)]
    pub processes: Option<usize>,

    /// Per-task timeout in seconds. `None` means no timeout.
    #[serde(default)]
    pub timeout: Option<f64>,

    /// Run the command through the platform shell.
    #[serde(default)]
    pub shell: bool,

    /// Pipe task output to the parent instead of a per-directory log file.
    #[serde(default)]
    pub pipe_output: bool,

    /// File name, relative to each work directory, receiving task output.
    #[serde(default = "default_task_log")]
    pub task_log: String,
}

pub(crate) fn default_task_log() -> String {
    "log.txt".to_string()
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            processes: None,
            timeout: None,
            shell: false,
            pipe_output: false,
            task_log: default_task_log(),
        }
    }
}

/// `[output]` section: where the run's records go.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputSection {
    #[serde(default = "default_status_file")]
    pub status_file: PathBuf,

    #[serde(default = "default_failed_file")]
    pub failed_file: PathBuf,

    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
}

pub(crate) fn default_status_file() -> PathBuf {
    PathBuf::from("status.txt")
}

pub(crate) fn default_failed_file() -> PathBuf {
    PathBuf::from("failed_paths.txt")
}

pub(crate) fn default_log_file() -> PathBuf {
    PathBuf::from("dtm_log.txt")
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            status_file: default_status_file(),
            failed_file: default_failed_file(),
            log_file: default_log_file(),
        }
    }
}

/// Validated configuration.
///
/// Only obtainable through `ConfigFile::try_from(raw)` (see `validate.rs`) or
/// [`ConfigFile::default`].
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    pub run: RunSection,
    pub output: OutputSection,
    pub env: BTreeMap<String, String>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        run: RunSection,
        output: OutputSection,
        env: BTreeMap<String, String>,
    ) -> Self {
        Self { run, output, env }
    }
}
