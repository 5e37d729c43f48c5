// Run reports as timestamped JSON files

use std::path::PathBuf;

use chrono::{DateTime, Utc};

use wrsync_core::{ReportSink, RunReport, SyncError, SyncResult};

use crate::error::StoreError;

const FILE_STAMP: &str = "%Y-%m-%d_%H-%M-%S";

/// Writes each report to `<dir>/<YYYY-MM-DD_HH-MM-SS>.json`.
#[derive(Debug, Clone)]
pub struct JsonReportSink {
    dir: PathBuf,
}

impl JsonReportSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// File a report lands in, named after its start time.
    pub fn path_for(&self, report: &RunReport) -> PathBuf {
        let started = DateTime::parse_from_rfc3339(&report.started_at)
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());
        self.dir.join(format!("{}.json", started.format(FILE_STAMP)))
    }

    fn write_report(&self, report: &RunReport) -> Result<PathBuf, StoreError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| StoreError::io(&self.dir, e))?;
        let path = self.path_for(report);
        let json = serde_json::to_string_pretty(report).map_err(|e| StoreError::json(&path, e))?;
        std::fs::write(&path, json).map_err(|e| StoreError::io(&path, e))?;
        Ok(path)
    }
}

impl ReportSink for JsonReportSink {
    fn write(&self, report: &RunReport) -> SyncResult<()> {
        let path = self
            .write_report(report)
            .map_err(|e| SyncError::Fatal(format!("cannot write run report: {e}")))?;
        log::info!("run report written to {}", path.display());
        Ok(())
    }
}
