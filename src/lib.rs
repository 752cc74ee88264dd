// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod paths;
pub mod sink;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{load_and_validate, ConfigFile, RunSettings};
use crate::engine::{plan_tasks, Coordinator, RunReport};
use crate::errors::{DtmError, Result};
use crate::exec::{OutputMode, RealExecutorBackend};
use crate::fs::{FileSystem, RealFileSystem};
use crate::paths::parse_path_file;
use crate::sink::FileReportSink;

/// Process exit code when at least one task failed or timed out.
pub const EXIT_TASKS_FAILED: i32 = 2;

/// Process exit code after SIGINT/SIGTERM stopped the run.
pub const EXIT_INTERRUPTED: i32 = 130;

/// How long an interrupted run waits for its killed children to be reaped.
const REAP_GRACE: Duration = Duration::from_secs(5);

/// Merge the optional config file and the CLI flags into run settings.
///
/// Called before logging is initialised, since the log file location is
/// itself a setting.
pub fn resolve_settings(args: &CliArgs) -> Result<RunSettings> {
    let cfg = match &args.config {
        Some(path) => load_and_validate(path)?,
        None => ConfigFile::default(),
    };
    RunSettings::resolve(args, &cfg)
}

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - the path source (reading the work directory list)
/// - the real process executor
/// - the coordinator (pool + aggregator)
/// - the file sinks for the status record and failed paths
///
/// Returns `None` for `--dry-run`. On SIGINT/SIGTERM every running task is
/// killed and reaped, no report is written, and [`DtmError::Interrupted`] is
/// returned.
pub async fn run(args: CliArgs, settings: RunSettings) -> Result<Option<RunReport>> {
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let work_dirs = parse_path_file(fs.as_ref(), &args.path_file)?;

    if args.dry_run {
        // Same validation as a real run, so a dry run catches the same errors.
        let tasks = plan_tasks(&args.command, &work_dirs)?;
        print_dry_run(&args, &settings, tasks.len());
        for task in &tasks {
            println!("  [{}] {}", task.index(), task.work_dir().display());
        }
        return Ok(None);
    }

    debug!(?settings, "resolved run settings");

    let executor = Arc::new(RealExecutorBackend::new(settings.exec.clone()));
    let processes = executor.processes().clone();
    let coordinator = Coordinator::new(executor, settings.concurrency, settings.timeout);
    let sink = FileReportSink::new(
        fs,
        settings.status_file.clone(),
        settings.failed_file.clone(),
    );

    let report = tokio::select! {
        report = coordinator.run(&args.command, &work_dirs, &sink) => report?,

        signal = shutdown_signal() => {
            let killed = processes.shutdown();
            warn!(signal, running = killed, "interrupted; killing running tasks");
            if !processes.wait_drained(REAP_GRACE).await {
                warn!(left = processes.live(), "some killed tasks were not reaped in time");
            }
            return Err(DtmError::Interrupted { signal });
        }
    };

    if !report.all_succeeded() {
        info!(
            failed_file = %settings.failed_file.display(),
            "some tasks did not succeed; rerun them with the failed paths file"
        );
    }

    Ok(Some(report))
}

/// Resolves with the signal name on Ctrl-C (SIGINT) or, on unix, SIGTERM.
///
/// If the handlers cannot be installed this never resolves.
async fn shutdown_signal() -> &'static str {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = match signal(SignalKind::terminate()) {
            Ok(stream) => Some(stream),
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                None
            }
        };
        let sigterm = async {
            match terminate.as_mut() {
                Some(stream) => {
                    stream.recv().await;
                }
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(sigterm);

        tokio::select! {
            res = tokio::signal::ctrl_c() => match res {
                Ok(()) => "SIGINT",
                Err(e) => {
                    warn!(error = %e, "failed to listen for Ctrl+C");
                    (&mut sigterm).await;
                    "SIGTERM"
                }
            },
            _ = &mut sigterm => "SIGTERM",
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        "Ctrl-C"
    }
}

/// Process exit code for a finished run.
pub fn exit_code(report: &RunReport) -> i32 {
    if report.all_succeeded() {
        0
    } else {
        EXIT_TASKS_FAILED
    }
}

/// Simple dry-run output: print settings and the tasks that would run.
fn print_dry_run(args: &CliArgs, settings: &RunSettings, task_count: usize) {
    println!("dtm dry-run");
    println!("  command = {}", args.command);
    println!("  shell = {}", settings.exec.shell);
    println!("  processes = {}", settings.concurrency);
    match settings.timeout {
        Some(t) => println!("  timeout = {}s", t.as_secs_f64()),
        None => println!("  timeout = none"),
    }
    match &settings.exec.output {
        OutputMode::LogFile(name) => println!("  task output = <work dir>/{name}"),
        OutputMode::Pipe => println!("  task output = piped to dtm"),
    }
    for (key, value) in &settings.exec.env {
        println!("  env {key}={value}");
    }
    println!("  status file = {}", settings.status_file.display());
    println!("  failed file = {}", settings.failed_file.display());
    println!();
    println!("tasks ({task_count}):");
}
