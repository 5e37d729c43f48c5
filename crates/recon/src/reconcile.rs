//! Extracted records vs the baseline.
//!
//! Each extracted key is classified exactly once: accepted (new, faster, or
//! link-only), unchanged, or discarded. Nothing here mutates the baseline;
//! the caller commits accepted records after publishing them.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use wrsync_core::{Baseline, Record, RecordKey};

use crate::config::ReconcileConfig;

/// What to do when the extracted record is not faster but carries a new link.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkUpdatePolicy {
    /// Keep the baseline's time and classification, take the new link.
    #[default]
    KeepBaselineTime,
    /// Take the extracted record whole.
    AdoptExtracted,
}

#[derive(Debug, Clone, Default)]
pub struct ReconcilePolicy {
    pub link_updates: LinkUpdatePolicy,
    pub no_link_updates: BTreeSet<String>,
}

impl From<&ReconcileConfig> for ReconcilePolicy {
    fn from(config: &ReconcileConfig) -> Self {
        Self {
            link_updates: config.link_updates,
            no_link_updates: config.no_link_updates.iter().cloned().collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Change {
    New,
    Faster,
    LinkOnly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accepted {
    /// The record to publish and, once published, commit.
    pub record: Record,
    pub change: Change,
    pub previous: Option<Record>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discard {
    /// Not faster and no new link.
    Slower,
    /// New link on an entity listed in `no_link_updates`.
    Excluded,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub accepted: Vec<Accepted>,
    pub unchanged: Vec<RecordKey>,
    pub discarded: Vec<(RecordKey, Discard)>,
}

impl ReconcileOutcome {
    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
    }
}

pub fn reconcile(baseline: &Baseline, extracted: &[Record], policy: &ReconcilePolicy) -> ReconcileOutcome {
    let mut out = ReconcileOutcome::default();

    for e in extracted {
        let key = e.key();
        let Some(b) = baseline.get(&key) else {
            log::info!("{key}: new record {}", e.time);
            out.accepted.push(Accepted { record: e.clone(), change: Change::New, previous: None });
            continue;
        };

        if e == b {
            out.unchanged.push(key);
            continue;
        }

        if e.time.is_faster_than(&b.time) {
            log::info!("{key}: {} -> {}", b.time, e.time);
            out.accepted.push(Accepted {
                record: e.clone(),
                change: Change::Faster,
                previous: Some(b.clone()),
            });
            continue;
        }

        if e.link != b.link {
            if policy.no_link_updates.contains(&e.entity_id) {
                log::debug!("{key}: link change excluded");
                out.discarded.push((key, Discard::Excluded));
                continue;
            }
            let record = match policy.link_updates {
                LinkUpdatePolicy::KeepBaselineTime => Record {
                    time: b.time.clone(),
                    link: e.link.clone(),
                    entity_id: e.entity_id.clone(),
                    variant: e.variant,
                },
                LinkUpdatePolicy::AdoptExtracted => e.clone(),
            };
            log::info!("{key}: new link {}", record.link);
            out.accepted.push(Accepted { record, change: Change::LinkOnly, previous: Some(b.clone()) });
            continue;
        }

        log::debug!("{key}: {} not faster than {}", e.time, b.time);
        out.discarded.push((key, Discard::Slower));
    }

    out
}
