//! RTA sheet: rows of cells carrying text, hyperlink, and bold attributes.
//!
//! A bold label starts a group of strategy rows (`[1] Star name`,
//! `[2] Alt strategy`, ...). The fastest strategy of each group is emitted
//! under the name of the group's `[1]` row.

use std::sync::OnceLock;

use regex::Regex;
use wrsync_core::{Duration, LabeledRecord, SheetRow, SyncError, SyncResult};

use super::{parse_sheet_time, Extraction};
use crate::config::StructuredSheetConfig;
use crate::error::RuleError;

fn strategy_index_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[(?P<idx>\d)\]").unwrap())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StrategyIndex {
    Numbered(u8),
    /// Row in an unindexed group (`[x|x]` camera rows of Bowser red coins).
    Unindexed,
}

#[derive(Debug, Clone)]
struct Candidate {
    label: String,
    time: Duration,
    link: String,
    row: usize,
}

/// Running state for the current group.
#[derive(Default)]
struct Group {
    name: String,
    best: Option<Candidate>,
    count: usize,
}

impl Group {
    fn offer(&mut self, candidate: Candidate) {
        let better = match &self.best {
            Some(best) => self.count == 0 || candidate.time.is_faster_than(&best.time),
            None => true,
        };
        if better {
            self.best = Some(candidate);
        }
        self.count += 1;
    }

    fn flush(&mut self, out: &mut Extraction) {
        if self.count == 0 {
            return;
        }
        self.count = 0;
        if let Some(best) = self.best.take() {
            if best.label.is_empty() {
                out.issue(
                    best.row,
                    "",
                    SyncError::parse_ambiguity("RTA group", "no [1] row names the group"),
                );
                return;
            }
            out.records.push(LabeledRecord {
                label: best.label,
                time: best.time,
                link: best.link,
                row: best.row,
            });
        }
    }
}

pub fn extract(rows: &[SheetRow], config: &StructuredSheetConfig) -> SyncResult<Extraction> {
    let unindexed = compile_unindexed(config)
        .map_err(|e| SyncError::Fatal(e.to_string()))?;

    let mut out = Extraction::default();
    let mut group = Group::default();
    let mut prev_index: Option<StrategyIndex> = None;

    for (row_idx, row) in rows.iter().enumerate() {
        let Some(first) = row.cell(0) else { continue };
        let label = first.text().trim();

        if label == config.terminal_label {
            log::debug!("row {row_idx}: terminal marker '{label}'");
            break;
        }

        let Some(link) = row.cell(1).and_then(|c| c.hyperlink.as_deref()) else {
            continue;
        };
        if link.trim().is_empty() {
            continue;
        }

        let bold = first.bold;
        if bold {
            group.flush(&mut out);
        }

        if config.skip_label_substrings.iter().any(|s| label.contains(s.as_str())) {
            log::debug!("row {row_idx}: '{label}' skipped");
            continue;
        }

        let index = match strategy_index_re()
            .captures(label)
            .and_then(|c| c["idx"].parse::<u8>().ok())
        {
            Some(n) => StrategyIndex::Numbered(n),
            None if unindexed.iter().any(|re| re.is_match(&group.name)) => StrategyIndex::Unindexed,
            None => {
                log::debug!("row {row_idx}: '{label}' has no strategy index, skipped");
                continue;
            }
        };

        // Sub-rows of a strategy repeat its index.
        if prev_index == Some(index) && !bold {
            continue;
        }

        if index == StrategyIndex::Numbered(1) {
            group.name = label.to_string();
        }

        let time_text = row.cell(1).map(|c| c.text()).unwrap_or("");
        let time = match parse_sheet_time(time_text) {
            Ok(time) => time,
            Err(err) => {
                out.issue(row_idx, label, err);
                continue;
            }
        };

        group.offer(Candidate {
            label: group.name.clone(),
            time,
            link: link.trim().to_string(),
            row: row_idx,
        });
        prev_index = Some(index);
    }

    group.flush(&mut out);
    Ok(out)
}

fn compile_unindexed(config: &StructuredSheetConfig) -> Result<Vec<Regex>, RuleError> {
    config
        .unindexed_groups
        .iter()
        .map(|p| {
            Regex::new(p).map_err(|source| RuleError::Regex { pattern: p.clone(), source })
        })
        .collect()
}
