// src/config/settings.rs

//! Effective settings of one run: CLI flags layered over the config file,
//! layered over built-in defaults.

use std::num::NonZero;
use std::path::PathBuf;
use std::time::Duration;

use crate::cli::CliArgs;
use crate::config::model::ConfigFile;
use crate::config::validate::{validate_env, validate_timeout};
use crate::errors::{DtmError, Result};
use crate::exec::{ExecOptions, OutputMode};

/// Fully resolved settings; nothing downstream looks at CLI args or the
/// config file directly.
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Worker slots, always >= 1.
    pub concurrency: usize,
    /// `None` means tasks may run forever.
    pub timeout: Option<Duration>,
    pub exec: ExecOptions,
    pub status_file: PathBuf,
    pub failed_file: PathBuf,
    /// `None` disables the detailed log file.
    pub log_file: Option<PathBuf>,
}

impl RunSettings {
    pub fn resolve(args: &CliArgs, cfg: &ConfigFile) -> Result<Self> {
        // A CLI value of 0 is clamped rather than rejected.
        let concurrency = args
            .processes
            .or(cfg.run.processes)
            .unwrap_or_else(default_concurrency)
            .max(1);

        let timeout = match args.timeout.or(cfg.run.timeout) {
            Some(secs) => {
                validate_timeout(secs)?;
                let limit = Duration::try_from_secs_f64(secs).map_err(|e| {
                    DtmError::ConfigError(format!("timeout of {secs} seconds is unusable: {e}"))
                })?;
                Some(limit)
            }
            None => None,
        };

        let mut env: Vec<(String, String)> = cfg
            .env
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        for pair in &args.env {
            let (key, value) = parse_env_pair(pair)?;
            env.retain(|(k, _)| k != &key);
            env.push((key, value));
        }

        let output = if args.pipe_output || cfg.run.pipe_output {
            OutputMode::Pipe
        } else {
            OutputMode::LogFile(cfg.run.task_log.clone())
        };

        let exec = ExecOptions {
            shell: args.shell || cfg.run.shell,
            output,
            env,
        };

        let log_file = if args.no_log_file {
            None
        } else {
            Some(
                args.log_file
                    .clone()
                    .unwrap_or_else(|| cfg.output.log_file.clone()),
            )
        };

        Ok(Self {
            concurrency,
            timeout,
            exec,
            status_file: args
                .status_file
                .clone()
                .unwrap_or_else(|| cfg.output.status_file.clone()),
            failed_file: args
                .failed_file
                .clone()
                .unwrap_or_else(|| cfg.output.failed_file.clone()),
            log_file,
        })
    }
}

/// Default worker count: the number of available hardware threads.
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(NonZero::get)
        .unwrap_or(1)
}

fn parse_env_pair(pair: &str) -> Result<(String, String)> {
    let Some((key, value)) = pair.split_once('=') else {
        return Err(DtmError::ConfigError(format!(
            "environment variable '{pair}' must be given as KEY=VALUE"
        )));
    };
    validate_env([key])?;
    Ok((key.to_string(), value.to_string()))
}
