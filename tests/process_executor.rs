// tests/process_executor.rs
//
// Real child processes; relies on `sh`, `true`, `false` and `sleep`.
#![cfg(unix)]

mod common;
use crate::common::{init_tracing, make_work_dirs, process_alive, with_timeout};

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dtm::engine::Coordinator;
use dtm::exec::{run_task, ExecOptions, OutputMode, ProcessRegistry, RealExecutorBackend};
use dtm::types::{Task, TaskStatus};
use dtm_test_utils::capture::capture_events;
use dtm_test_utils::sink::RecordingSink;

type TestResult = Result<(), Box<dyn Error>>;

fn task(command: &str, dir: &Path) -> Arc<Task> {
    Arc::new(Task::new(0, Arc::from(command), dir))
}

fn shell() -> ExecOptions {
    ExecOptions {
        shell: true,
        ..ExecOptions::default()
    }
}

async fn wait_until_dead(pid: u32) -> bool {
    let deadline = Instant::now() + Duration::from_secs(3);
    while Instant::now() < deadline {
        if !process_alive(pid) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn three_instant_successes() -> TestResult {
    with_timeout(async {
        init_tracing();

        let root = tempfile::tempdir()?;
        let dirs = make_work_dirs(root.path(), 3);
        let executor = Arc::new(RealExecutorBackend::new(ExecOptions::default()));
        let coordinator = Coordinator::new(executor, 2, Some(Duration::from_secs(60)));
        let sink = RecordingSink::new();

        let report = coordinator.run("true", &dirs, &sink).await?;

        assert_eq!(report.total(), 3);
        assert_eq!(report.succeeded(), 3);
        assert_eq!(report.failed(), 0);
        assert_eq!(report.timed_out(), 0);
        assert!(report.failed_paths().is_empty());
        assert!(report.status_lines().iter().all(|l| l.exit_code == Some(0)));
        Ok(())
    })
    .await
}

#[tokio::test]
async fn two_non_zero_exits_with_one_slot() -> TestResult {
    with_timeout(async {
        let root = tempfile::tempdir()?;
        let dirs = make_work_dirs(root.path(), 2);
        let executor = Arc::new(RealExecutorBackend::new(ExecOptions::default()));
        let coordinator = Coordinator::new(executor, 1, None);
        let sink = RecordingSink::new();

        let report = coordinator.run("false", &dirs, &sink).await?;

        assert_eq!(report.total(), 2);
        assert_eq!(report.succeeded(), 0);
        assert_eq!(report.failed(), 2);
        let failed: Vec<PathBuf> = report.failed_paths().iter().cloned().collect();
        let mut expected = dirs.clone();
        expected.sort();
        assert_eq!(failed, expected);
        assert!(report.status_lines().iter().all(|l| l.exit_code == Some(1)));
        Ok(())
    })
    .await
}

#[tokio::test]
async fn long_sleep_is_killed_at_the_timeout() -> TestResult {
    with_timeout(async {
        init_tracing();

        let root = tempfile::tempdir()?;
        let dir = make_work_dirs(root.path(), 1).remove(0);
        let started = Instant::now();

        let outcome = run_task(
            task("sleep 120", &dir),
            Some(Duration::from_secs(1)),
            &ExecOptions::default(),
            &ProcessRegistry::new(),
        )
        .await;

        assert_eq!(outcome.status, TaskStatus::TimedOut);
        assert_eq!(outcome.exit_code, None);
        assert_eq!(outcome.duration_millis(), 1000);
        assert!(started.elapsed() < Duration::from_secs(5));

        let pid = outcome.pid.expect("spawned process has a pid");
        assert!(wait_until_dead(pid).await, "timed-out process {pid} still alive");
        Ok(())
    })
    .await
}

#[tokio::test]
async fn timeout_also_kills_processes_started_by_the_command() -> TestResult {
    with_timeout(async {
        let root = tempfile::tempdir()?;
        let dir = make_work_dirs(root.path(), 1).remove(0);

        let outcome = run_task(
            task("sleep 120 & echo $! > child.pid; wait", &dir),
            Some(Duration::from_millis(500)),
            &shell(),
            &ProcessRegistry::new(),
        )
        .await;

        assert_eq!(outcome.status, TaskStatus::TimedOut);
        let child_pid: u32 = fs::read_to_string(dir.join("child.pid"))?.trim().parse()?;
        assert!(
            wait_until_dead(child_pid).await,
            "grandchild {child_pid} survived the timeout"
        );
        Ok(())
    })
    .await
}

#[tokio::test]
async fn exit_code_is_recorded() -> TestResult {
    with_timeout(async {
        let root = tempfile::tempdir()?;
        let dir = make_work_dirs(root.path(), 1).remove(0);

        let outcome = run_task(task("exit 7", &dir), None, &shell(), &ProcessRegistry::new()).await;

        assert_eq!(outcome.status, TaskStatus::Failure);
        assert_eq!(outcome.exit_code, Some(7));
        assert!(outcome.pid.is_some());
        Ok(())
    })
    .await
}

#[tokio::test]
async fn death_by_signal_is_a_failure_without_exit_code() -> TestResult {
    with_timeout(async {
        let root = tempfile::tempdir()?;
        let dir = make_work_dirs(root.path(), 1).remove(0);

        let outcome = run_task(
            task("kill -9 $$", &dir),
            None,
            &shell(),
            &ProcessRegistry::new(),
        )
        .await;

        assert_eq!(outcome.status, TaskStatus::Failure);
        assert_eq!(outcome.exit_code, None);
        assert!(outcome.detail.unwrap_or_default().contains("without exit code"));
        Ok(())
    })
    .await
}

#[tokio::test]
async fn missing_work_dir_is_a_launch_failure() -> TestResult {
    with_timeout(async {
        let root = tempfile::tempdir()?;
        let missing = root.path().join("not_created");

        let outcome = run_task(
            task("true", &missing),
            None,
            &ExecOptions::default(),
            &ProcessRegistry::new(),
        )
        .await;

        assert_eq!(outcome.status, TaskStatus::Failure);
        assert_eq!(outcome.exit_code, None);
        assert_eq!(outcome.pid, None);
        assert!(outcome.detail.unwrap_or_default().contains("does not exist"));
        Ok(())
    })
    .await
}

#[tokio::test]
async fn unresolvable_command_is_a_launch_failure() -> TestResult {
    with_timeout(async {
        let root = tempfile::tempdir()?;
        let dir = make_work_dirs(root.path(), 1).remove(0);

        let outcome = run_task(
            task("dtm-no-such-program-4242 --flag", &dir),
            None,
            &ExecOptions::default(),
            &ProcessRegistry::new(),
        )
        .await;

        assert_eq!(outcome.status, TaskStatus::Failure);
        assert_eq!(outcome.exit_code, None);
        assert_eq!(outcome.pid, None);
        assert!(outcome.detail.unwrap_or_default().contains("could not be started"));
        Ok(())
    })
    .await
}

#[tokio::test]
async fn output_goes_to_the_task_log_with_extra_env() -> TestResult {
    with_timeout(async {
        let root = tempfile::tempdir()?;
        let dir = make_work_dirs(root.path(), 1).remove(0);
        let options = ExecOptions {
            shell: true,
            output: OutputMode::LogFile("run.log".to_string()),
            env: vec![("DTM_TEST_VALUE".to_string(), "forty-two".to_string())],
        };

        let outcome = run_task(
            task("echo out=$DTM_TEST_VALUE; echo err >&2", &dir),
            None,
            &options,
            &ProcessRegistry::new(),
        )
        .await;

        assert_eq!(outcome.status, TaskStatus::Success);
        let log = fs::read_to_string(dir.join("run.log"))?;
        assert!(log.contains("out=forty-two"));
        assert!(log.contains("err"));
        Ok(())
    })
    .await
}

#[tokio::test]
async fn pipe_mode_forwards_every_line_to_the_log() -> TestResult {
    let (events, _guard) = capture_events();

    with_timeout(async {
        let root = tempfile::tempdir()?;
        let dir = make_work_dirs(root.path(), 1).remove(0);
        let options = ExecOptions {
            shell: true,
            output: OutputMode::Pipe,
            env: Vec::new(),
        };

        let outcome = run_task(
            task("seq 1 500; echo oops >&2", &dir),
            None,
            &options,
            &ProcessRegistry::new(),
        )
        .await;

        assert_eq!(outcome.status, TaskStatus::Success);
        assert!(!dir.join("log.txt").exists());

        // Forwarders can still be draining the pipes after the child is reaped.
        let forwarded = events.wait_for(501, |e| e.field("stream").is_some()).await;
        assert_eq!(forwarded.len(), 501);

        let dir_name = dir.display().to_string();
        assert!(forwarded.iter().all(|e| e.field("dir") == Some(dir_name.as_str())));

        let stdout: Vec<String> = forwarded
            .iter()
            .filter(|e| e.field("stream") == Some("stdout"))
            .map(|e| e.message.clone())
            .collect();
        let expected: Vec<String> = (1..=500).map(|n| n.to_string()).collect();
        assert_eq!(stdout, expected);

        let stderr: Vec<&str> = forwarded
            .iter()
            .filter(|e| e.field("stream") == Some("stderr"))
            .map(|e| e.message.as_str())
            .collect();
        assert_eq!(stderr, vec!["oops"]);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn shutdown_kills_running_children_and_blocks_new_ones() -> TestResult {
    with_timeout(async {
        let root = tempfile::tempdir()?;
        let dirs = make_work_dirs(root.path(), 2);
        let processes = ProcessRegistry::new();

        let running = {
            let processes = processes.clone();
            let task = task("sleep 120", &dirs[0]);
            tokio::spawn(async move {
                run_task(task, None, &ExecOptions::default(), &processes).await
            })
        };

        let deadline = Instant::now() + Duration::from_secs(3);
        while processes.live() == 0 && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(processes.shutdown(), 1);

        let outcome = running.await?;
        assert_eq!(outcome.status, TaskStatus::Failure);
        assert_eq!(outcome.exit_code, None);
        assert!(processes.wait_drained(Duration::from_secs(1)).await);
        let pid = outcome.pid.expect("spawned process has a pid");
        assert!(!process_alive(pid), "process {pid} survived the shutdown");

        let late = run_task(
            task("touch started", &dirs[1]),
            None,
            &ExecOptions::default(),
            &processes,
        )
        .await;
        assert_eq!(late.status, TaskStatus::Failure);
        assert_eq!(late.pid, None);
        assert!(!dirs[1].join("started").exists());
        Ok(())
    })
    .await
}

const OK_JOB: &str = "touch ../running_$$\nsleep 0.3\nls .. | grep -c '^running_' > seen.txt\nrm -f ../running_$$\nexit 0\n";
const FAIL_JOB: &str = "touch ../running_$$\nsleep 0.3\nls .. | grep -c '^running_' > seen.txt\nrm -f ../running_$$\nexit 1\n";
const HANG_JOB: &str = "touch ../running_$$\nls .. | grep -c '^running_' > seen.txt\nsleep 120\n";

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn mixed_real_batch_respects_the_concurrency_bound() -> TestResult {
    with_timeout(async {
        init_tracing();

        let root = tempfile::tempdir()?;
        let dirs = make_work_dirs(root.path(), 5);
        for (dir, job) in dirs.iter().zip([OK_JOB, FAIL_JOB, OK_JOB, FAIL_JOB, HANG_JOB]) {
            fs::write(dir.join("job.sh"), job)?;
        }

        let executor = Arc::new(RealExecutorBackend::new(ExecOptions::default()));
        let coordinator = Coordinator::new(executor, 2, Some(Duration::from_secs(1)));
        let sink = RecordingSink::new();

        let report = coordinator.run("sh job.sh", &dirs, &sink).await?;

        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 2);
        assert_eq!(report.timed_out(), 1);
        assert!(report.failed_paths().contains(&dirs[4]));

        for dir in &dirs {
            let seen: usize = fs::read_to_string(dir.join("seen.txt"))?.trim().parse()?;
            assert!(seen <= 2, "{} saw {seen} concurrent tasks", dir.display());
        }
        Ok(())
    })
    .await
}
