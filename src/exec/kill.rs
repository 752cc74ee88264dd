// src/exec/kill.rs

//! Forced termination of a timed-out task.

use tokio::process::Child;
use tracing::warn;

/// Kill `child` together with the rest of its process group, then reap it.
///
/// Killing the group is best-effort; killing and reaping the direct child is
/// not, so no zombie is left behind on this path.
pub async fn terminate_process_tree(child: &mut Child, pid: Option<u32>) {
    if let Some(pid) = pid {
        kill_process_group(pid);
    }

    // `kill` sends SIGKILL (TerminateProcess on Windows) and waits for exit.
    if let Err(e) = child.kill().await {
        warn!(?pid, error = %e, "failed to kill child process; reaping anyway");
        if let Err(e) = child.wait().await {
            warn!(?pid, error = %e, "failed to reap child process");
        }
    }
}

/// SIGKILL the process group led by `pid`. Best-effort.
#[cfg(unix)]
pub(crate) fn kill_process_group(pid: u32) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;
    use tracing::debug;

    let Ok(raw) = i32::try_from(pid) else {
        return;
    };

    // The child was started as leader of its own group, so pgid == pid.
    match killpg(Pid::from_raw(raw), Signal::SIGKILL) {
        Ok(()) => debug!(pid, "sent SIGKILL to process group"),
        Err(e) => debug!(pid, error = %e, "could not signal process group"),
    }
}

/// Children share the console process group here and see Ctrl-C themselves;
/// only the direct child is killed, through its handle.
#[cfg(not(unix))]
pub(crate) fn kill_process_group(_pid: u32) {}
