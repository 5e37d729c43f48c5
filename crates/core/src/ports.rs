//! Collaborator interfaces.
//!
//! The engine crates never touch the network or the filesystem directly;
//! the run pipeline is handed implementations of these traits. Adapters
//! map their own error types into [`SyncError`] at this boundary.

use crate::baseline::Baseline;
use crate::error::SyncResult;
use crate::record::Feed;
use crate::report::RunReport;
use crate::rows::RawRows;

/// Fetches raw rows for a feed. Fails with `SourceUnavailable`.
pub trait TabularSource {
    fn fetch_rows(&self, feed: Feed) -> SyncResult<RawRows>;
}

/// Persists one baseline per feed. A missing baseline loads as empty.
pub trait BaselineStore {
    fn load(&self, feed: Feed) -> SyncResult<Baseline>;
    fn save(&self, baseline: &Baseline) -> SyncResult<()>;
}

/// Current text of an entity's page plus the token to write it back with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub text: String,
    /// Opaque optimistic-concurrency token, handed back on write.
    pub version: String,
}

/// Reads and writes entity pages with optimistic concurrency.
pub trait DocumentStore {
    fn get_text(&self, entity_id: &str) -> SyncResult<Page>;
    fn put_text(&self, entity_id: &str, text: &str, version: &str, summary: &str) -> SyncResult<()>;
}

impl<T: DocumentStore + ?Sized> DocumentStore for &T {
    fn get_text(&self, entity_id: &str) -> SyncResult<Page> {
        (**self).get_text(entity_id)
    }

    fn put_text(&self, entity_id: &str, text: &str, version: &str, summary: &str) -> SyncResult<()> {
        (**self).put_text(entity_id, text, version, summary)
    }
}

/// Durable storage for run reports.
pub trait ReportSink {
    fn write(&self, report: &RunReport) -> SyncResult<()>;
}
