use std::fmt;

use serde::{Deserialize, Serialize};

use crate::record::{Feed, RecordKey};

/// What happened to one entity during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum Outcome {
    Updated { summary: String },
    /// Patch computed but not published (dry run).
    DryRun { summary: String },
    SkippedUnchanged,
    SkippedSlower,
    Failed { reason: String },
}

impl Outcome {
    pub fn failed(reason: impl fmt::Display) -> Self {
        Outcome::Failed { reason: reason.to_string() }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed { .. })
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Updated { summary } => write!(f, "updated ({summary})"),
            Outcome::DryRun { summary } => write!(f, "dry-run ({summary})"),
            Outcome::SkippedUnchanged => write!(f, "skipped-unchanged"),
            Outcome::SkippedSlower => write!(f, "skipped-slower"),
            Outcome::Failed { reason } => write!(f, "failed: {reason}"),
        }
    }
}

/// Which stage produced a report entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Extract,
    Reconcile,
    Publish,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    /// Canonical key, or the raw sheet label for rows that never got one.
    pub entity: String,
    pub feed: Feed,
    pub stage: Stage,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl ReportEntry {
    pub fn for_key(key: &RecordKey, feed: Feed, stage: Stage, outcome: Outcome) -> Self {
        Self { entity: key.to_string(), feed, stage, outcome }
    }
}

/// Everything a run did, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: String,
    pub duration_ms: u64,
    pub nothing_to_update: bool,
    pub dry_run: bool,
    pub entries: Vec<ReportEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunReport {
    pub fn push(&mut self, entry: ReportEntry) {
        self.entries.push(entry);
    }

    pub fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.entries.iter().filter(|e| pred(&e.outcome)).count()
    }

    pub fn updated(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Updated { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(Outcome::is_failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_serializes_flat() {
        let entry = ReportEntry::for_key(
            &RecordKey::new("Whomp's Fortress 100 Coins", Some(2)),
            Feed::Rta,
            Stage::Publish,
            Outcome::failed("edit conflict"),
        );
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["entity"], "Whomp's Fortress 100 Coins #2");
        assert_eq!(json["feed"], "rta");
        assert_eq!(json["stage"], "publish");
        assert_eq!(json["status"], "failed");
        assert_eq!(json["reason"], "edit conflict");
    }

    #[test]
    fn outcome_display() {
        assert_eq!(Outcome::SkippedSlower.to_string(), "skipped-slower");
        assert_eq!(Outcome::failed("boom").to_string(), "failed: boom");
    }

    #[test]
    fn counts() {
        let mut report = RunReport::default();
        let key = RecordKey::new("A", None);
        report.push(ReportEntry::for_key(&key, Feed::Ss, Stage::Publish, Outcome::Updated { summary: "s".into() }));
        report.push(ReportEntry::for_key(&key, Feed::Ss, Stage::Publish, Outcome::failed("x")));
        report.push(ReportEntry::for_key(&key, Feed::Ss, Stage::Reconcile, Outcome::SkippedUnchanged));
        assert_eq!(report.updated(), 1);
        assert_eq!(report.failed(), 1);
    }
}
