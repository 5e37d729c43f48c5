//! Google Sheets v4 reader for both feeds.
//!
//! The single-star feed is read through the `values` endpoint with formulas
//! rendered, so the `=HYPERLINK(...)` cells arrive intact. The RTA feed needs
//! cell hyperlinks and bold flags, which only the spreadsheet endpoint
//! exposes, so it is read with a field mask.

use std::time::Duration;

use url::Url;

use wrsync_core::rows::{Spreadsheet, ValueRange};
use wrsync_core::{Feed, RawRows, SyncError, SyncResult, TabularSource};

use crate::http::{HttpError, RetryingClient, USER_AGENT};

pub const RTA_FIELDS: &str =
    "sheets/data/rowData/values(userEnteredFormat/textFormat/bold,hyperlink,effectiveValue/stringValue)";

#[derive(Debug, thiserror::Error)]
pub enum SheetsError {
    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("invalid API base '{0}'")]
    BadBase(String),

    #[error("unexpected response shape: {0}")]
    Shape(String),
}

/// One spreadsheet and the A1 range read from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRange {
    pub spreadsheet_id: String,
    pub range: String,
}

impl SheetRange {
    pub fn new(spreadsheet_id: impl Into<String>, range: impl Into<String>) -> Self {
        Self { spreadsheet_id: spreadsheet_id.into(), range: range.into() }
    }
}

/// Sheets API client (blocking, bearer token).
pub struct SheetsClient {
    client: RetryingClient,
    api_base: String,
    token: String,
    ss: SheetRange,
    rta: SheetRange,
}

impl SheetsClient {
    pub fn new(api_base: impl Into<String>, token: impl Into<String>, ss: SheetRange, rta: SheetRange) -> Self {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .expect("failed to build HTTP client");

        Self {
            client: RetryingClient::new("sheets", http),
            api_base: api_base.into(),
            token: token.into(),
            ss,
            rta,
        }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.client = self.client.with_backoff(backoff);
        self
    }

    fn range(&self, feed: Feed) -> &SheetRange {
        match feed {
            Feed::Ss => &self.ss,
            Feed::Rta => &self.rta,
        }
    }

    /// `api_base` plus percent-encoded path segments.
    fn url(&self, segments: &[&str]) -> Result<Url, SheetsError> {
        let mut url = Url::parse(&self.api_base).map_err(|_| SheetsError::BadBase(self.api_base.clone()))?;
        url.path_segments_mut()
            .map_err(|_| SheetsError::BadBase(self.api_base.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Flat rows with formulas rendered.
    pub fn fetch_values(&self, sheet: &SheetRange) -> Result<ValueRange, SheetsError> {
        let url = self.url(&["spreadsheets", &sheet.spreadsheet_id, "values", &sheet.range])?;
        let body = self.client.request_json(|http| {
            http.get(url.clone())
                .bearer_auth(&self.token)
                .query(&[("valueRenderOption", "FORMULA")])
        })?;
        serde_json::from_value(body).map_err(|e| SheetsError::Shape(e.to_string()))
    }

    /// Cells with hyperlink and bold attributes.
    pub fn fetch_grid(&self, sheet: &SheetRange) -> Result<Spreadsheet, SheetsError> {
        let url = self.url(&["spreadsheets", &sheet.spreadsheet_id])?;
        let body = self.client.request_json(|http| {
            http.get(url.clone())
                .bearer_auth(&self.token)
                .query(&[("ranges", sheet.range.as_str()), ("fields", RTA_FIELDS)])
        })?;
        serde_json::from_value(body).map_err(|e| SheetsError::Shape(e.to_string()))
    }

    pub fn fetch(&self, feed: Feed) -> Result<RawRows, SheetsError> {
        let sheet = self.range(feed);
        let rows = match feed {
            Feed::Ss => self.fetch_values(sheet)?.into_rows(),
            Feed::Rta => self.fetch_grid(sheet)?.into_rows(),
        };
        log::info!("{feed}: fetched {} rows from {}", rows.len(), sheet.range);
        Ok(rows)
    }
}

impl TabularSource for SheetsClient {
    fn fetch_rows(&self, feed: Feed) -> SyncResult<RawRows> {
        self.fetch(feed).map_err(|e| SyncError::SourceUnavailable {
            feed: feed.to_string(),
            reason: e.to_string(),
        })
    }
}
