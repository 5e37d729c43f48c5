//! HTTP adapters for the sync pipeline.
//!
//! `SheetsClient` reads the record spreadsheets; `WikiClient` reads and
//! edits guide pages. Both are blocking (no Tokio runtime required) and
//! share one retry/backoff loop.

mod http;
pub mod sheets;
pub mod wiki;

pub use http::HttpError;
pub use sheets::{SheetRange, SheetsClient, SheetsError, RTA_FIELDS};
pub use wiki::{WikiClient, WikiConfig, WikiError};
