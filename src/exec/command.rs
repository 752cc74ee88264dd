// src/exec/command.rs

//! Building the OS command for a task.

use std::fs::File;
use std::process::Stdio;

use anyhow::{bail, Context, Result};
use tokio::process::Command;

use crate::types::Task;

/// Where a task's stdout/stderr go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputMode {
    /// Redirect both streams into this file inside the task's work directory.
    LogFile(String),
    /// Pipe both streams back to this process (forwarded to the log).
    Pipe,
}

/// How every task of a run is launched. Shared, read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOptions {
    /// Run through `sh -c` / `cmd /C` instead of executing directly.
    pub shell: bool,
    pub output: OutputMode,
    /// Added on top of the inherited environment.
    pub env: Vec<(String, String)>,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            shell: false,
            output: OutputMode::LogFile(crate::config::model::default_task_log()),
            env: Vec::new(),
        }
    }
}

/// Build a ready-to-spawn command for `task`.
///
/// Errors here are launch errors: the caller reports them as a failed task
/// rather than propagating them.
pub fn build_command(task: &Task, options: &ExecOptions) -> Result<Command> {
    let work_dir = task.work_dir();
    if !work_dir.is_dir() {
        bail!(
            "the path '{}' is invalid: the directory does not exist",
            work_dir.display()
        );
    }

    let mut cmd = if options.shell {
        shell_command(task.command())
    } else {
        let mut parts = task.command().split_whitespace();
        let Some(program) = parts.next() else {
            bail!("command is empty");
        };
        let mut c = Command::new(program);
        c.args(parts);
        c
    };

    cmd.current_dir(work_dir)
        .envs(options.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::null())
        .kill_on_drop(true);

    // Own process group, so a timeout can take down everything the command
    // started.
    #[cfg(unix)]
    cmd.process_group(0);

    match &options.output {
        OutputMode::LogFile(name) => {
            let path = work_dir.join(name);
            let file = File::create(&path)
                .with_context(|| format!("creating task log {}", path.display()))?;
            let err_file = file
                .try_clone()
                .with_context(|| format!("duplicating handle for {}", path.display()))?;
            cmd.stdout(Stdio::from(file)).stderr(Stdio::from(err_file));
        }
        OutputMode::Pipe => {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        }
    }

    Ok(cmd)
}

/// Build a shell command appropriate for the platform.
fn shell_command(line: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(line);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(line);
        c
    }
}
