// Raw rows from captured Sheets responses on disk

use std::path::{Path, PathBuf};

use wrsync_core::rows::{Spreadsheet, ValueRange};
use wrsync_core::{Feed, RawRows, SyncError, SyncResult, TabularSource};

use crate::error::StoreError;

/// Reads `ss_rows.json` (a `values` response) and `rta_rows.json`
/// (a `spreadsheets.get` response) from a directory.
#[derive(Debug, Clone)]
pub struct FileRowsSource {
    dir: PathBuf,
}

impl FileRowsSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, feed: Feed) -> PathBuf {
        self.dir.join(format!("{}_rows.json", feed.as_str()))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read(&self, feed: Feed) -> Result<RawRows, StoreError> {
        let path = self.path_for(feed);
        let data = std::fs::read_to_string(&path).map_err(|e| StoreError::io(&path, e))?;
        let rows = match feed {
            Feed::Ss => serde_json::from_str::<ValueRange>(&data)
                .map_err(|e| StoreError::json(&path, e))?
                .into_rows(),
            Feed::Rta => serde_json::from_str::<Spreadsheet>(&data)
                .map_err(|e| StoreError::json(&path, e))?
                .into_rows(),
        };
        log::debug!("{feed}: {} rows from {}", rows.len(), path.display());
        Ok(rows)
    }
}

impl TabularSource for FileRowsSource {
    fn fetch_rows(&self, feed: Feed) -> SyncResult<RawRows> {
        self.read(feed).map_err(|e| SyncError::SourceUnavailable {
            feed: feed.to_string(),
            reason: e.to_string(),
        })
    }
}
