//! Single-star sheet: flat rows of `name | _ | real-time | in-game`.
//!
//! The real-time cell holds `=HYPERLINK("link";"time")`. An entity whose
//! in-game record differs from its real-time one has a counterpart row right
//! below it (after any tied real-time rows): blank name, `---` in the
//! real-time cell, and the in-game formula in the in-game cell.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use wrsync_core::{Duration, LabeledRecord, SyncError};

use super::{parse_sheet_time, Extraction};
use crate::config::FlatSheetConfig;

/// Rows scanned past a record row when looking for its in-game counterpart.
const MAX_LOOKAHEAD: usize = 8;

const FORMULA_PREFIX: &str = "=HYPERLINK";

fn hyperlink_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^=HYPERLINK\(\s*"(?P<link>[^"]*)"\s*[;,]\s*"(?P<time>.*)"\s*\)$"#).unwrap()
    })
}

/// Split a `=HYPERLINK("link";"display")` formula.
pub fn parse_hyperlink(formula: &str) -> Option<(&str, &str)> {
    let caps = hyperlink_re().captures(formula.trim())?;
    let link = caps.name("link")?.as_str();
    let time = caps.name("time")?.as_str();
    Some((link, time))
}

struct Layout<'a> {
    rows: &'a [Vec<String>],
    config: &'a FlatSheetConfig,
}

impl<'a> Layout<'a> {
    fn cell(&self, row: usize, col: usize) -> &'a str {
        self.rows[row].get(col).map(|s| s.trim()).unwrap_or("")
    }

    fn name(&self, row: usize) -> &'a str {
        self.cell(row, self.config.name_col)
    }

    /// Short rows are stage separators and headers.
    fn is_data_row(&self, row: usize) -> bool {
        self.rows[row].len() > self.config.rt_col
    }

    fn is_igt_row(&self, row: usize) -> bool {
        self.is_data_row(row)
            && self.name(row).is_empty()
            && self.cell(row, self.config.rt_col) == self.config.igt_row_marker
    }

    /// Nearest non-blank name above `row`, without crossing a separator.
    fn inherited_label(&self, row: usize) -> Option<&'a str> {
        (0..row)
            .rev()
            .take_while(|&r| self.is_data_row(r))
            .map(|r| self.name(r))
            .find(|name| !name.is_empty())
    }

    /// In-game counterpart of the record row at `row`, skipping tied
    /// real-time rows. `None` when a named row, a separator, or the end of
    /// input comes first.
    fn igt_counterpart(&self, row: usize) -> Option<usize> {
        for next in (row + 1..self.rows.len()).take(MAX_LOOKAHEAD) {
            if !self.is_data_row(next) {
                return None;
            }
            if self.is_igt_row(next) {
                return Some(next);
            }
            if !self.name(next).is_empty() {
                return None;
            }
        }
        None
    }
}

/// Which formula wins for a record row.
struct Chosen<'a> {
    row: usize,
    formula: &'a str,
    in_game: bool,
}

pub fn extract(rows: &[Vec<String>], config: &FlatSheetConfig) -> Extraction {
    let layout = Layout { rows, config };
    let mut out = Extraction::default();
    let mut last_label: Option<&str> = None;
    let mut seen_links: HashSet<String> = HashSet::new();

    for row in 0..rows.len() {
        if !layout.is_data_row(row) || layout.is_igt_row(row) {
            continue;
        }

        let label = match layout.name(row) {
            "" => match layout.inherited_label(row) {
                Some(label) => label,
                None => {
                    log::debug!("row {row}: blank name with nothing above, skipped");
                    continue;
                }
            },
            name => name,
        };

        // Tied rows: the first row of an entity keeps the record.
        if last_label == Some(label) {
            log::debug!("row {row}: tied row for '{label}', skipped");
            continue;
        }

        let rt_cell = layout.cell(row, config.rt_col);
        if !rt_cell.starts_with(FORMULA_PREFIX) {
            log::debug!("row {row}: no record formula, skipped");
            continue;
        }

        let chosen = match choose(&layout, row, rt_cell) {
            Ok(chosen) => chosen,
            Err((bad_row, err)) => {
                out.issue(bad_row, label, err);
                continue;
            }
        };

        let record = match to_record(label, &chosen) {
            Ok(record) => record,
            Err(err) => {
                out.issue(chosen.row, label, err);
                continue;
            }
        };

        last_label = Some(label);
        if !seen_links.insert(record.link.clone()) {
            log::debug!("row {row}: link already recorded, skipped");
            continue;
        }
        out.records.push(record);
    }

    out
}

/// Pick the real-time formula, or the in-game counterpart when the two
/// in-game values differ.
fn choose<'a>(
    layout: &Layout<'a>,
    row: usize,
    rt_cell: &'a str,
) -> Result<Chosen<'a>, (usize, SyncError)> {
    let real_time = Chosen { row, formula: rt_cell, in_game: false };

    let Some(igt_row) = layout.igt_counterpart(row) else {
        return Ok(real_time);
    };

    let igt_cell = layout.cell(igt_row, layout.config.igt_col);
    let igt_time = match parse_hyperlink(igt_cell) {
        Some((_, time)) => parse_sheet_time(time),
        None => parse_sheet_time(igt_cell),
    }
    .map_err(|e| (igt_row, e))?;

    let tied = parse_sheet_time(layout.cell(row, layout.config.igt_col))
        .map(|own| own.cmp_value(&igt_time) == Ordering::Equal)
        .unwrap_or(false);

    if tied {
        Ok(real_time)
    } else {
        Ok(Chosen { row: igt_row, formula: igt_cell, in_game: true })
    }
}

fn to_record(label: &str, chosen: &Chosen<'_>) -> Result<LabeledRecord, SyncError> {
    let context = || format!("record formula for '{label}'");
    let (link, time) = parse_hyperlink(chosen.formula)
        .ok_or_else(|| SyncError::parse_ambiguity(context(), format!("'{}'", chosen.formula)))?;
    if link.trim().is_empty() {
        return Err(SyncError::parse_ambiguity(context(), "empty link"));
    }

    let mut time: Duration = parse_sheet_time(time)?;
    if chosen.in_game {
        time = time.into_in_game();
    }

    Ok(LabeledRecord {
        label: label.to_string(),
        time,
        link: link.trim().to_string(),
        row: chosen.row,
    })
}
