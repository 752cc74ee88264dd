// src/exec/task_runner.rs

//! Individual task process runner.

use std::future::pending;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tracing::{debug, info, warn};

use crate::exec::command::{build_command, ExecOptions};
use crate::exec::kill::terminate_process_tree;
use crate::exec::registry::ProcessRegistry;
use crate::types::{Outcome, Task};

/// Run a single task to completion and classify the result.
///
/// Never fails: launch errors, non-zero exits and timeouts all come back as
/// an [`Outcome`]. Exactly one child is spawned and, on every path where it
/// was spawned, reaped before this returns. The child is tracked in
/// `processes` while it is alive; once `processes` is shut down no new child
/// is started.
pub async fn run_task(
    task: Arc<Task>,
    timeout: Option<Duration>,
    options: &ExecOptions,
    processes: &ProcessRegistry,
) -> Outcome {
    let started = Instant::now();
    let dir = task.work_dir().display().to_string();

    if processes.is_shut_down() {
        debug!(dir = %dir, "run interrupted; not launching task");
        return Outcome::launch_failed(&task, started.elapsed(), "run was interrupted");
    }

    debug!(dir = %dir, cmd = %task.command(), shell = options.shell, "launching task");

    let spawned = build_command(&task, options).and_then(|mut cmd| {
        cmd.spawn()
            .with_context(|| format!("command '{}' could not be started", task.command()))
    });

    let mut child = match spawned {
        Ok(child) => child,
        Err(err) => {
            let cause = format!("{err:#}");
            warn!(dir = %dir, error = %cause, "task could not be launched");
            return Outcome::launch_failed(&task, started.elapsed(), cause);
        }
    };

    let pid = child.id();
    debug!(dir = %dir, ?pid, "task process started");
    let tracked = pid.filter(|&p| processes.register(p));

    forward_piped_output(&mut child, &dir);

    // Either the process exits on its own, or the deadline passes first.
    let outcome = tokio::select! {
        status_res = child.wait() => {
            let elapsed = started.elapsed();
            match status_res {
                Ok(status) => match status.code() {
                    Some(code) => {
                        debug!(
                            dir = %dir,
                            ?pid,
                            exit_code = code,
                            duration_ms = elapsed.as_millis() as u64,
                            "task process exited"
                        );
                        Outcome::exited(&task, pid, code, elapsed)
                    }
                    None => {
                        let detail = format!("process terminated without exit code ({status})");
                        warn!(dir = %dir, ?pid, "{detail}");
                        Outcome::terminated(&task, pid, elapsed, detail)
                    }
                },
                Err(e) => {
                    // The child may still be alive; make sure it is gone and reaped.
                    terminate_process_tree(&mut child, pid).await;
                    let detail = format!("waiting for process failed: {e}");
                    warn!(dir = %dir, ?pid, "{detail}");
                    Outcome::terminated(&task, pid, started.elapsed(), detail)
                }
            }
        }

        _ = deadline(timeout) => {
            // `deadline` only resolves when a timeout is set.
            let limit = timeout.unwrap_or_default();
            info!(
                dir = %dir,
                ?pid,
                timeout_secs = limit.as_secs_f64(),
                "task exceeded timeout; killing process tree"
            );
            terminate_process_tree(&mut child, pid).await;
            Outcome::timed_out(&task, pid, limit)
        }
    };

    if let Some(pid) = tracked {
        processes.unregister(pid);
    }
    outcome
}

async fn deadline(timeout: Option<Duration>) {
    match timeout {
        Some(limit) => tokio::time::sleep(limit).await,
        None => pending::<()>().await,
    }
}

/// In pipe mode, forward each output line to the log, tagged with the work
/// directory. Streams are always drained so the child never blocks on a full
/// pipe.
fn forward_piped_output(child: &mut Child, dir: &str) {
    if let Some(stdout) = child.stdout.take() {
        spawn_line_forwarder(stdout, dir.to_string(), "stdout");
    }
    if let Some(stderr) = child.stderr.take() {
        spawn_line_forwarder(stderr, dir.to_string(), "stderr");
    }
}

fn spawn_line_forwarder<R>(stream: R, dir: String, stream_name: &'static str)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            info!(dir = %dir, stream = stream_name, "{}", line);
        }
    });
}
