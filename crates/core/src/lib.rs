//! `wrsync-core` - shared types for the world-record sync engine.
//!
//! Durations, records, raw row shapes, the error taxonomy, and the
//! collaborator traits. No IO.

pub mod baseline;
pub mod duration;
pub mod error;
pub mod ports;
pub mod record;
pub mod report;
pub mod rows;

pub use baseline::{Baseline, BaselineFile};
pub use duration::{Duration, Timing, IGT_MARKER};
pub use error::{ErrorLevel, SyncError, SyncResult};
pub use ports::{BaselineStore, DocumentStore, Page, ReportSink, TabularSource};
pub use record::{Feed, LabeledRecord, Record, RecordKey};
pub use report::{Outcome, ReportEntry, RunReport, Stage};
pub use rows::{RawRows, SheetCell, SheetRow};
