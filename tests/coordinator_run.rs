// tests/coordinator_run.rs
mod common;
use crate::common::builders::work_dirs;
use crate::common::{init_tracing, with_timeout};

use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use dtm::engine::Coordinator;
use dtm::errors::DtmError;
use dtm::fs::mock::MockFileSystem;
use dtm::fs::FileSystem;
use dtm::sink::FileReportSink;
use dtm_test_utils::capture::capture_events;
use dtm_test_utils::fake_executor::{FakeBehaviour, FakeExecutor};
use dtm_test_utils::sink::RecordingSink;

type TestResult = Result<(), Box<dyn Error>>;

fn file_sink(fs: &MockFileSystem) -> FileReportSink {
    let fs: Arc<dyn FileSystem> = Arc::new(fs.clone());
    FileReportSink::new(fs, PathBuf::from("status.txt"), PathBuf::from("failed_paths.txt"))
}

#[tokio::test]
async fn empty_path_list_aborts_before_dispatch() -> TestResult {
    with_timeout(async {
        init_tracing();

        let executor = Arc::new(FakeExecutor::new(FakeBehaviour::ok()));
        let coordinator = Coordinator::new(Arc::clone(&executor), 2, None);
        let fs = MockFileSystem::new();
        let no_dirs: Vec<PathBuf> = Vec::new();

        let result = coordinator.run("run.sh", &no_dirs, &file_sink(&fs)).await;

        match result {
            Err(DtmError::ConfigError(msg)) => assert!(msg.contains("empty")),
            other => panic!("expected ConfigError, got {other:?}"),
        }
        assert!(executor.started().is_empty());
        assert!(fs.writes().is_empty(), "no sink writes on a configuration error");
        Ok(())
    })
    .await
}

#[tokio::test]
async fn blank_command_aborts_before_dispatch() -> TestResult {
    with_timeout(async {
        let executor = Arc::new(FakeExecutor::new(FakeBehaviour::ok()));
        let coordinator = Coordinator::new(Arc::clone(&executor), 2, None);
        let sink = RecordingSink::new();

        let result = coordinator.run("   ", &work_dirs(3), &sink).await;

        assert!(matches!(result, Err(DtmError::ConfigError(_))));
        assert!(executor.started().is_empty());
        assert!(sink.reports().is_empty());
        Ok(())
    })
    .await
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn mixed_batch_reports_exact_totals_within_the_bound() -> TestResult {
    with_timeout(async {
        init_tracing();

        let dirs = work_dirs(5);
        let executor = Arc::new(
            FakeExecutor::new(FakeBehaviour::ok())
                .script(&dirs[0], FakeBehaviour::ok_after(Duration::from_millis(30)))
                .script(&dirs[1], FakeBehaviour::exit_after(1, Duration::from_millis(10)))
                .script(&dirs[2], FakeBehaviour::Hang)
                .script(&dirs[3], FakeBehaviour::ok_after(Duration::from_millis(20)))
                .script(&dirs[4], FakeBehaviour::exit_after(2, Duration::from_millis(5))),
        );
        let coordinator = Coordinator::new(Arc::clone(&executor), 2, Some(Duration::from_millis(300)));
        let fs = MockFileSystem::new();

        let report = coordinator.run("solve", &dirs, &file_sink(&fs)).await?;

        assert_eq!(report.total(), 5);
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 2);
        assert_eq!(report.timed_out(), 1);
        assert!(executor.peak_concurrency() <= 2);

        let failed = fs.contents("failed_paths.txt").unwrap();
        let mut failed_lines: Vec<&str> = failed.lines().collect();
        failed_lines.sort_unstable();
        assert_eq!(failed_lines, vec!["case_01", "case_02", "case_04"]);

        let status = fs.contents("status.txt").unwrap();
        assert!(status.contains("total=5 succeeded=2 failed=2 timed_out=1"));
        assert_eq!(fs.writes(), vec![PathBuf::from("status.txt"), PathBuf::from("failed_paths.txt")]);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn clean_run_writes_an_empty_failed_list() -> TestResult {
    with_timeout(async {
        let dirs = work_dirs(3);
        let executor = Arc::new(FakeExecutor::new(FakeBehaviour::ok()));
        let coordinator = Coordinator::new(executor, 2, Some(Duration::from_secs(60)));
        let fs = MockFileSystem::new();
        fs.add_file("failed_paths.txt", "stale_dir\n");

        let report = coordinator.run("solve", &dirs, &file_sink(&fs)).await?;

        assert!(report.all_succeeded());
        assert_eq!(dtm::exit_code(&report), 0);
        assert_eq!(fs.contents("failed_paths.txt").as_deref(), Some(""));
        Ok(())
    })
    .await
}

#[tokio::test]
async fn failing_batch_still_completes_and_sets_exit_code() -> TestResult {
    with_timeout(async {
        let dirs = work_dirs(2);
        let executor = Arc::new(FakeExecutor::new(FakeBehaviour::exit_after(1, Duration::ZERO)));
        let coordinator = Coordinator::new(executor, 1, None);
        let sink = RecordingSink::new();

        let report = coordinator.run("solve", &dirs, &sink).await?;

        assert_eq!(report.failed(), 2);
        assert_eq!(dtm::exit_code(&report), dtm::EXIT_TASKS_FAILED);
        assert_eq!(sink.reports(), vec![report.clone()]);

        let failed: Vec<&Path> = report.failed_paths().iter().map(PathBuf::as_path).collect();
        assert_eq!(failed, vec![Path::new("case_00"), Path::new("case_01")]);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn pending_count_is_logged_on_every_tick() -> TestResult {
    let (events, _guard) = capture_events();

    with_timeout(async {
        let dirs = work_dirs(2);
        let executor = Arc::new(
            FakeExecutor::new(FakeBehaviour::ok())
                .script(&dirs[1], FakeBehaviour::ok_after(Duration::from_millis(300))),
        );
        let coordinator = Coordinator::new(executor, 2, None)
            .with_pending_interval(Duration::from_millis(40));
        let sink = RecordingSink::new();

        let report = coordinator.run("solve", &dirs, &sink).await?;
        assert_eq!(report.succeeded(), 2);

        // The instant task is done long before the first tick; the slow one
        // stays outstanding until the end.
        let ticks = events.with_message("tasks pending");
        assert!(ticks.len() >= 2, "expected several ticks, got {}", ticks.len());
        assert!(ticks.iter().all(|e| e.field("pending") == Some("1")));

        let progress = events.matching(|e| e.message.starts_with("[2/2] "));
        assert_eq!(progress.len(), 1);
        Ok(())
    })
    .await
}
