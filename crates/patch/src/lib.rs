//! `wrsync-patch` - record slot recognition and token substitution.
//!
//! Finds the `rta_record` / `ss_record` field of a speedrun infobox,
//! re-checks the proposed record against what is published, and rewrites
//! only the affected tokens.

pub mod patch;
pub mod slot;
pub mod token;

pub use patch::{patch, patch_replacing, PatchOutcome, SkipReason};
pub use slot::{Slot, SlotDescriptor, SlotLayout};
pub use token::Token;
