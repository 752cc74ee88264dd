// src/sink.rs

//! Report sinks: where a finished run is persisted.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::engine::RunReport;
use crate::errors::Result;
use crate::fs::FileSystem;

/// Receives the finalized report of a run. Only called for runs that got
/// past validation.
pub trait ReportSink: Send + Sync {
    fn emit(&self, report: &RunReport) -> Result<()>;
}

/// Writes the status record and the failed-paths list as text files.
#[derive(Debug, Clone)]
pub struct FileReportSink {
    fs: Arc<dyn FileSystem>,
    status_file: PathBuf,
    failed_file: PathBuf,
}

impl FileReportSink {
    pub fn new(fs: Arc<dyn FileSystem>, status_file: PathBuf, failed_file: PathBuf) -> Self {
        Self {
            fs,
            status_file,
            failed_file,
        }
    }
}

impl ReportSink for FileReportSink {
    fn emit(&self, report: &RunReport) -> Result<()> {
        self.fs
            .write(&self.status_file, report.render_status_record().as_bytes())?;
        info!(file = %self.status_file.display(), "task status written");

        // Always rewritten, so a clean rerun does not leave a stale list.
        self.fs
            .write(&self.failed_file, report.render_failed_paths().as_bytes())?;
        if report.failed_paths().is_empty() {
            info!(file = %self.failed_file.display(), "no failed tasks");
        } else {
            info!(
                file = %self.failed_file.display(),
                count = report.failed_paths().len(),
                "paths to failed tasks written"
            );
        }

        Ok(())
    }
}
