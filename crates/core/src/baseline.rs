use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::record::{Feed, Record, RecordKey};

/// Last-accepted records of one feed, keyed by `(entity_id, variant)`.
///
/// Only advanced through [`Baseline::commit`], which callers invoke with the
/// records whose publish step has already succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Baseline {
    feed: Feed,
    entries: BTreeMap<RecordKey, Record>,
}

impl Baseline {
    pub fn empty(feed: Feed) -> Self {
        Self { feed, entries: BTreeMap::new() }
    }

    pub fn from_records(feed: Feed, records: impl IntoIterator<Item = Record>) -> Self {
        let entries = records.into_iter().map(|r| (r.key(), r)).collect();
        Self { feed, entries }
    }

    pub fn feed(&self) -> Feed {
        self.feed
    }

    pub fn get(&self, key: &RecordKey) -> Option<&Record> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.entries.values()
    }

    /// Advance the baseline with confirmed-published records.
    pub fn commit<'a>(&mut self, published: impl IntoIterator<Item = &'a Record>) -> usize {
        let mut n = 0;
        for record in published {
            self.entries.insert(record.key(), record.clone());
            n += 1;
        }
        n
    }
}

/// On-disk shape shared by the file-backed stores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineFile {
    pub feed: Feed,
    pub records: Vec<Record>,
}

impl From<&Baseline> for BaselineFile {
    fn from(b: &Baseline) -> Self {
        Self { feed: b.feed, records: b.entries.values().cloned().collect() }
    }
}

impl From<BaselineFile> for Baseline {
    fn from(f: BaselineFile) -> Self {
        Baseline::from_records(f.feed, f.records)
    }
}
