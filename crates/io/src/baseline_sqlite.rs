// Baselines in a SQLite database, one row per record

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection};

use wrsync_core::{Baseline, BaselineStore, Duration, Feed, Record, SyncResult};

use crate::error::StoreError;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS baseline (
    feed TEXT NOT NULL,
    entity_id TEXT NOT NULL,
    variant INTEGER NOT NULL DEFAULT 0,  -- 0 = no variant
    time TEXT NOT NULL,                  -- display form, e.g. '1:01.40 (IGT)'
    link TEXT NOT NULL,
    PRIMARY KEY (feed, entity_id, variant)
);
"#;

#[derive(Debug, Clone)]
pub struct SqliteBaselineStore {
    path: PathBuf,
}

impl SqliteBaselineStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<Connection, StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        let conn = Connection::open(&self.path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(conn)
    }

    fn read(&self, feed: Feed) -> Result<Baseline, StoreError> {
        let conn = self.open()?;
        let mut stmt = conn.prepare(
            "SELECT entity_id, variant, time, link FROM baseline WHERE feed = ?1 ORDER BY entity_id, variant",
        )?;
        let rows = stmt.query_map(params![feed.as_str()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (entity_id, variant, time, link) = row?;
            let time = Duration::parse(&time)
                .map_err(|e| StoreError::Corrupt(format!("baseline row '{entity_id}': {e}")))?;
            let variant = match variant {
                0 => None,
                v => Some(u8::try_from(v).map_err(|_| {
                    StoreError::Corrupt(format!("baseline row '{entity_id}': variant {v} out of range"))
                })?),
            };
            records.push(Record::new(time, link, entity_id).with_variant(variant));
        }
        Ok(Baseline::from_records(feed, records))
    }

    fn write(&self, baseline: &Baseline) -> Result<(), StoreError> {
        let mut conn = self.open()?;
        let tx = conn.transaction()?;
        let feed = baseline.feed().as_str();
        tx.execute("DELETE FROM baseline WHERE feed = ?1", params![feed])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO baseline (feed, entity_id, variant, time, link) VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for record in baseline.records() {
                stmt.execute(params![
                    feed,
                    record.entity_id,
                    i64::from(record.variant.unwrap_or(0)),
                    record.time.display(),
                    record.link,
                ])?;
            }
        }
        tx.commit()?;
        log::debug!("saved {} {feed} records to {}", baseline.len(), self.path.display());
        Ok(())
    }
}

impl BaselineStore for SqliteBaselineStore {
    fn load(&self, feed: Feed) -> SyncResult<Baseline> {
        Ok(self.read(feed)?)
    }

    fn save(&self, baseline: &Baseline) -> SyncResult<()> {
        Ok(self.write(baseline)?)
    }
}
