use std::fmt;

use serde::{Deserialize, Serialize};

use crate::duration::Duration;

/// Which tabular source a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feed {
    /// Single-star sheet (flat formula rows).
    Ss,
    /// RTA sheet (structured cells with hyperlink/bold attributes).
    Rta,
}

impl Feed {
    pub const ALL: [Feed; 2] = [Feed::Ss, Feed::Rta];

    pub fn as_str(&self) -> &'static str {
        match self {
            Feed::Ss => "ss",
            Feed::Rta => "rta",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ss" => Some(Feed::Ss),
            "rta" => Some(Feed::Rta),
            _ => None,
        }
    }
}

impl fmt::Display for Feed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Baseline / reconciliation key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordKey {
    pub entity_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<u8>,
}

impl RecordKey {
    pub fn new(entity_id: impl Into<String>, variant: Option<u8>) -> Self {
        Self { entity_id: entity_id.into(), variant }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.variant {
            Some(v) => write!(f, "{} #{}", self.entity_id, v),
            None => f.write_str(&self.entity_id),
        }
    }
}

/// One world record, as extracted from a feed or held in a baseline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub time: Duration,
    pub link: String,
    pub entity_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<u8>,
}

impl Record {
    pub fn new(time: Duration, link: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Self { time, link: link.into(), entity_id: entity_id.into(), variant: None }
    }

    pub fn with_variant(mut self, variant: Option<u8>) -> Self {
        self.variant = variant;
        self
    }

    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.entity_id.clone(), self.variant)
    }
}

/// A record before canonicalization: the sheet's own label for the entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledRecord {
    pub label: String,
    pub time: Duration,
    pub link: String,
    /// 0-based source row, for diagnostics.
    pub row: usize,
}
