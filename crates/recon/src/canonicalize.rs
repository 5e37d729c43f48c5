//! Sheet labels -> canonical entity ids.
//!
//! Rules from the [`RuleSet`] run in order against a running label. After
//! renaming, repeated entity ids within one pass become variants 1 and 2
//! (multi-strategy entities), except for `single_instance` entities, whose
//! repeats collapse to the fastest record.

use std::collections::{HashMap, HashSet};

use regex::Regex;
use wrsync_core::{Feed, LabeledRecord, Record, SyncError};

use crate::config::{RuleConfig, RuleKind, RuleSet};
use crate::error::RuleError;
use crate::extract::RowIssue;

#[derive(Debug)]
enum Matcher {
    Exact { pattern: String, replace: String },
    StripSuffix(String),
    Contains { pattern: String, replace: String },
    Regex { re: Regex, replace: String },
    Drop(String),
}

#[derive(Debug)]
struct CompiledRule {
    matcher: Matcher,
    feeds: Vec<Feed>,
    only_if_contains: Option<String>,
}

impl CompiledRule {
    fn compile(rule: &RuleConfig) -> Result<Self, RuleError> {
        let replace = rule.replace.clone().unwrap_or_default();
        let matcher = match rule.kind {
            RuleKind::Exact => Matcher::Exact { pattern: rule.pattern.clone(), replace },
            RuleKind::StripSuffix => Matcher::StripSuffix(rule.pattern.clone()),
            RuleKind::Contains => Matcher::Contains { pattern: rule.pattern.clone(), replace },
            RuleKind::Regex => Matcher::Regex {
                re: Regex::new(&rule.pattern).map_err(|source| RuleError::Regex {
                    pattern: rule.pattern.clone(),
                    source,
                })?,
                replace,
            },
            RuleKind::Drop => Matcher::Drop(rule.pattern.clone()),
        };
        let feeds = rule.feeds.iter().filter_map(|f| Feed::parse(f)).collect();
        Ok(Self { matcher, feeds, only_if_contains: rule.only_if_contains.clone() })
    }

    fn applies(&self, label: &str, feed: Feed) -> bool {
        (self.feeds.is_empty() || self.feeds.contains(&feed))
            && self.only_if_contains.as_deref().map_or(true, |s| label.contains(s))
    }

    /// `None` = label dropped.
    fn apply(&self, label: String) -> Option<String> {
        match &self.matcher {
            Matcher::Exact { pattern, replace } if label == *pattern => Some(replace.clone()),
            Matcher::StripSuffix(suffix) => {
                Some(label.strip_suffix(suffix.as_str()).map(str::to_string).unwrap_or(label))
            }
            Matcher::Contains { pattern, replace } if label.contains(pattern.as_str()) => {
                Some(label.replace(pattern.as_str(), replace))
            }
            Matcher::Regex { re, replace } => Some(re.replace_all(&label, replace.as_str()).into_owned()),
            Matcher::Drop(pattern) if label == *pattern => None,
            _ => Some(label),
        }
    }
}

/// Records with canonical ids, plus rows that could not be tagged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Canonicalized {
    pub records: Vec<Record>,
    pub issues: Vec<RowIssue>,
}

#[derive(Debug)]
pub struct Canonicalizer {
    rules: Vec<CompiledRule>,
    single_instance: HashSet<String>,
}

impl Canonicalizer {
    pub fn new(rule_set: &RuleSet) -> Result<Self, RuleError> {
        let rules = rule_set
            .rules
            .iter()
            .map(CompiledRule::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules, single_instance: rule_set.single_instance.iter().cloned().collect() })
    }

    /// Canonical id for a raw label, or `None` when the label is not a
    /// tracked entity.
    pub fn canonicalize(&self, raw_label: &str, feed: Feed) -> Option<String> {
        let mut label = raw_label.trim().to_string();
        for rule in &self.rules {
            if !rule.applies(&label, feed) {
                continue;
            }
            label = rule.apply(label)?;
        }
        let label = label.trim();
        (!label.is_empty()).then(|| label.to_string())
    }

    /// Rename every record and tag repeated ids with variants.
    pub fn canonicalize_all(&self, labeled: Vec<LabeledRecord>, feed: Feed) -> Canonicalized {
        let mut out = Canonicalized::default();
        // entity id -> positions in out.records
        let mut seen: HashMap<String, Vec<usize>> = HashMap::new();

        for rec in labeled {
            let Some(entity_id) = self.canonicalize(&rec.label, feed) else {
                log::debug!("{feed}: '{}' is not a tracked entity", rec.label);
                continue;
            };
            if entity_id != rec.label {
                log::debug!("{feed}: '{}' -> '{entity_id}'", rec.label);
            }

            let positions = seen.entry(entity_id.clone()).or_default();

            if self.single_instance.contains(&entity_id) {
                match positions.first() {
                    Some(&pos) => {
                        if rec.time.is_faster_than(&out.records[pos].time) {
                            out.records[pos] = Record::new(rec.time, rec.link, entity_id);
                        }
                    }
                    None => {
                        positions.push(out.records.len());
                        out.records.push(Record::new(rec.time, rec.link, entity_id));
                    }
                }
                continue;
            }

            match positions.len() {
                0 => {
                    positions.push(out.records.len());
                    out.records.push(Record::new(rec.time, rec.link, entity_id));
                }
                1 => {
                    out.records[positions[0]].variant = Some(1);
                    positions.push(out.records.len());
                    out.records
                        .push(Record::new(rec.time, rec.link, entity_id).with_variant(Some(2)));
                }
                _ => {
                    let error = SyncError::parse_ambiguity(
                        format!("entity '{entity_id}'"),
                        "third occurrence in one pass",
                    );
                    log::warn!("row {} ({}): {error}", rec.row, rec.label);
                    out.issues.push(RowIssue { row: rec.row, label: rec.label, error });
                }
            }
        }

        out
    }
}
