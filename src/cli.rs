// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `dtm`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "dtm",
    version,
    about = "Parallel execution of one command in many work directories.",
    long_about = None
)]
pub struct CliArgs {
    /// Command to execute in each work directory.
    ///
    /// Either a shell command (with `--shell`) or an executable plus
    /// whitespace-separated arguments.
    #[arg(value_name = "COMMAND")]
    pub command: String,

    /// Text file with work directory paths, one per line.
    #[arg(value_name = "PATH_FILE")]
    pub path_file: PathBuf,

    /// Number of concurrent worker slots (default: available CPUs).
    #[arg(short = 'p', long, value_name = "N")]
    pub processes: Option<usize>,

    /// Seconds before a single task is killed (default: no timeout).
    #[arg(short = 't', long, value_name = "SECS")]
    pub timeout: Option<f64>,

    /// Run the command through the platform shell (`sh -c` / `cmd /C`).
    #[arg(short = 's', long)]
    pub shell: bool,

    /// Pipe task stdout/stderr to this process instead of `<dir>/log.txt`.
    #[arg(long)]
    pub pipe_output: bool,

    /// Extra environment variable for every task, as KEY=VALUE.
    #[arg(short = 'e', long = "env", value_name = "KEY=VALUE")]
    pub env: Vec<String>,

    /// Optional TOML config file; CLI flags take precedence over it.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Where to write the status record.
    #[arg(long, value_name = "PATH")]
    pub status_file: Option<PathBuf>,

    /// Where to write the list of failed work directories.
    #[arg(long, value_name = "PATH")]
    pub failed_file: Option<PathBuf>,

    /// Where to write the detailed (debug level) log.
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Do not write the detailed log file.
    #[arg(long)]
    pub no_log_file: bool,

    /// Console logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `DTM_LOG` or a default level will be used.
    #[arg(short = 'l', long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Resolve settings and print the task list without executing anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
