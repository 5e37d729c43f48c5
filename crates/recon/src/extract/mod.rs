//! Raw rows -> labeled records.
//!
//! Two strategies, chosen by the row shape: flat formula rows
//! ([`single_star`]) and structured cells ([`rta`]). Row-scoped failures are
//! collected as [`RowIssue`]s and extraction carries on.

pub mod rta;
pub mod single_star;

use wrsync_core::{Duration, Feed, LabeledRecord, RawRows, SyncError, SyncResult};

use crate::config::ExtractConfig;

/// A row that looked like data but could not be turned into a record.
#[derive(Debug, Clone, PartialEq)]
pub struct RowIssue {
    /// 0-based source row.
    pub row: usize,
    pub label: String,
    pub error: SyncError,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub records: Vec<LabeledRecord>,
    pub issues: Vec<RowIssue>,
}

impl Extraction {
    pub(crate) fn issue(&mut self, row: usize, label: &str, error: SyncError) {
        log::warn!("row {row} ({label}): {error}");
        self.issues.push(RowIssue { row, label: label.to_string(), error });
    }
}

pub fn extract(feed: Feed, rows: &RawRows, config: &ExtractConfig) -> SyncResult<Extraction> {
    if rows.is_empty() {
        return Err(SyncError::NoDataFound { feed: feed.to_string() });
    }
    let extraction = match rows {
        RawRows::Flat(rows) => single_star::extract(rows, &config.ss),
        RawRows::Structured(rows) => rta::extract(rows, &config.rta)?,
    };
    log::debug!(
        "{feed}: {} rows -> {} records, {} issues",
        rows.len(),
        extraction.records.len(),
        extraction.issues.len()
    );
    Ok(extraction)
}

/// Sheet notation (`1'08"36`, `1'08""36`) -> colon/dot notation.
pub fn from_sheet_notation(text: &str) -> String {
    text.replace("\"\"", ".").replace('"', ".").replace('\'', ":")
}

pub(crate) fn parse_sheet_time(text: &str) -> SyncResult<Duration> {
    Duration::parse(&from_sheet_notation(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sheet_notation() {
        assert_eq!(from_sheet_notation("1'08\"36"), "1:08.36");
        assert_eq!(from_sheet_notation("1'08\"\"36"), "1:08.36");
        assert_eq!(from_sheet_notation("12.34"), "12.34");
        assert_eq!(parse_sheet_time("1'08\"\"36").unwrap().millis(), 68_360);
    }

    #[test]
    fn empty_rows_are_no_data() {
        let err = extract(Feed::Ss, &RawRows::Flat(vec![]), &ExtractConfig::default()).unwrap_err();
        assert_eq!(err, SyncError::NoDataFound { feed: "ss".into() });

        let err =
            extract(Feed::Rta, &RawRows::Structured(vec![]), &ExtractConfig::default()).unwrap_err();
        assert!(matches!(err, SyncError::NoDataFound { .. }));
    }
}
