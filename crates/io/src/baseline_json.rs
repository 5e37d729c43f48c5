// Baselines as one JSON file per feed

use std::path::{Path, PathBuf};

use wrsync_core::{Baseline, BaselineFile, BaselineStore, Feed, SyncResult};

use crate::error::StoreError;

/// `last_saved_<feed>.json` files in one directory.
#[derive(Debug, Clone)]
pub struct JsonBaselineStore {
    dir: PathBuf,
}

impl JsonBaselineStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, feed: Feed) -> PathBuf {
        self.dir.join(format!("last_saved_{}.json", feed.as_str()))
    }

    fn read(&self, feed: Feed) -> Result<Baseline, StoreError> {
        let path = self.path_for(feed);
        let data = match std::fs::read_to_string(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("no baseline at {}, starting empty", path.display());
                return Ok(Baseline::empty(feed));
            }
            Err(e) => return Err(StoreError::io(&path, e)),
        };
        let file: BaselineFile = serde_json::from_str(&data).map_err(|e| StoreError::json(&path, e))?;
        if file.feed != feed {
            return Err(StoreError::Corrupt(format!(
                "{} holds the '{}' baseline, expected '{feed}'",
                path.display(),
                file.feed
            )));
        }
        Ok(Baseline::from(file))
    }

    fn write(&self, baseline: &Baseline) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| StoreError::io(&self.dir, e))?;
        let path = self.path_for(baseline.feed());
        let json = serde_json::to_string_pretty(&BaselineFile::from(baseline))
            .map_err(|e| StoreError::json(&path, e))?;

        // Atomic: write .tmp then rename
        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, json).map_err(|e| StoreError::io(&tmp_path, e))?;
        std::fs::rename(&tmp_path, &path).map_err(|e| StoreError::io(&path, e))?;
        log::debug!("saved {} {} records to {}", baseline.len(), baseline.feed(), path.display());
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl BaselineStore for JsonBaselineStore {
    fn load(&self, feed: Feed) -> SyncResult<Baseline> {
        Ok(self.read(feed)?)
    }

    fn save(&self, baseline: &Baseline) -> SyncResult<()> {
        Ok(self.write(baseline)?)
    }
}
