//! `wrsync-recon` - record extraction, name canonicalization, reconciliation.
//!
//! Pure engine crate: receives raw rows and a baseline, returns the records
//! worth publishing. No network or filesystem access.

pub mod canonicalize;
pub mod config;
pub mod engine;
pub mod error;
pub mod extract;
pub mod reconcile;

pub use canonicalize::{Canonicalized, Canonicalizer};
pub use config::RuleSet;
pub use engine::{Engine, FeedPlan};
pub use error::RuleError;
pub use extract::{Extraction, RowIssue};
pub use reconcile::{reconcile, Accepted, Change, Discard, LinkUpdatePolicy, ReconcileOutcome, ReconcilePolicy};
