use wrsync_core::{Baseline, Feed, RawRows, Record, SyncResult};

use crate::canonicalize::Canonicalizer;
use crate::config::RuleSet;
use crate::error::RuleError;
use crate::extract::{self, RowIssue};
use crate::reconcile::{reconcile, ReconcileOutcome, ReconcilePolicy};

/// Everything decided for one feed before anything is published.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedPlan {
    pub feed: Feed,
    /// Canonical records of this pass, in sheet order.
    pub extracted: Vec<Record>,
    pub issues: Vec<RowIssue>,
    pub outcome: ReconcileOutcome,
}

impl FeedPlan {
    pub fn has_updates(&self) -> bool {
        !self.outcome.accepted.is_empty()
    }
}

/// Compiled rule set: extraction layout, rename table, reconcile policy.
#[derive(Debug)]
pub struct Engine {
    rules: RuleSet,
    canonicalizer: Canonicalizer,
    policy: ReconcilePolicy,
}

impl Engine {
    pub fn new(rules: RuleSet) -> Result<Self, RuleError> {
        rules.validate()?;
        let canonicalizer = Canonicalizer::new(&rules)?;
        let policy = ReconcilePolicy::from(&rules.reconcile);
        Ok(Self { rules, canonicalizer, policy })
    }

    pub fn policy(&self) -> &ReconcilePolicy {
        &self.policy
    }

    /// Raw rows -> canonical records. Empty input is `NoDataFound`.
    pub fn extract(&self, feed: Feed, rows: &RawRows) -> SyncResult<(Vec<Record>, Vec<RowIssue>)> {
        let extraction = extract::extract(feed, rows, &self.rules.extract)?;
        let mut issues = extraction.issues;
        let canonical = self.canonicalizer.canonicalize_all(extraction.records, feed);
        issues.extend(canonical.issues);
        Ok((canonical.records, issues))
    }

    pub fn plan(&self, feed: Feed, rows: &RawRows, baseline: &Baseline) -> SyncResult<FeedPlan> {
        let (extracted, issues) = self.extract(feed, rows)?;
        let outcome = reconcile(baseline, &extracted, &self.policy);
        log::info!(
            "{feed}: {} records, {} accepted, {} unchanged, {} discarded, {} row issues",
            extracted.len(),
            outcome.accepted.len(),
            outcome.unchanged.len(),
            outcome.discarded.len(),
            issues.len()
        );
        Ok(FeedPlan { feed, extracted, issues, outcome })
    }
}
