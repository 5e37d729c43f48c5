//! `wrsync-io` - file-backed implementations of the collaborator traits.

pub mod baseline_json;
pub mod baseline_sqlite;
pub mod error;
pub mod report;
pub mod rows;

pub use baseline_json::JsonBaselineStore;
pub use baseline_sqlite::SqliteBaselineStore;
pub use error::StoreError;
pub use report::JsonReportSink;
pub use rows::FileRowsSource;
