//! CLI Exit Code Registry
//!
//! This is the single source of truth for all `wrsync` exit codes.
//! Exit codes are part of the shell contract; cron wrappers rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain    | Description                                 |
//! |---------|-----------|---------------------------------------------|
//! | 0       | Universal | Success (including "nothing to update")     |
//! | 1       | Universal | General error (unspecified)                 |
//! | 2       | Universal | CLI usage error (bad args, missing file)    |
//! | 3-9     | setup     | Config, rule table, credentials             |
//! | 10-19   | run       | Sync run outcome                            |
//! | 20-29   | source    | Feed fetch and extraction                   |
//! | 30-39   | patch     | Offline page patching                       |

use wrsync_core::{ErrorLevel, SyncError};

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, unreadable input file.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Setup (3-9)
// =============================================================================

/// Config file missing (when given explicitly), unparsable, or invalid.
pub const EXIT_CONFIG: u8 = 3;

/// Rule table unparsable or invalid (bad regex, unknown feed, missing field).
pub const EXIT_RULES: u8 = 4;

/// A credential the command needs is not set.
pub const EXIT_MISSING_SECRET: u8 = 5;

// =============================================================================
// Run (10-19)
// =============================================================================

/// Run-level fault: source unavailable, no data, baseline store, wiki session.
/// Records confirmed before the fault are still committed.
pub const EXIT_RUN_ABORTED: u8 = 10;

/// Run completed but at least one row or entity failed.
pub const EXIT_RUN_PARTIAL: u8 = 11;

/// Stopped by SIGINT after finalizing.
pub const EXIT_INTERRUPTED: u8 = 12;

// =============================================================================
// Source (20-29)
// =============================================================================

/// Feed could not be fetched.
pub const EXIT_SOURCE_UNAVAILABLE: u8 = 20;

/// Feed returned no rows.
pub const EXIT_NO_DATA: u8 = 21;

// =============================================================================
// Patch (30-39)
// =============================================================================

/// The page has no recognizable record slot.
pub const EXIT_PATCH_NO_SLOT: u8 = 30;

/// The slot exists but its contents could not be parsed.
pub const EXIT_PATCH_PARSE: u8 = 31;

/// Map a sync error to its exit code.
pub fn sync_exit_code(err: &SyncError) -> u8 {
    match err {
        SyncError::SourceUnavailable { .. } => EXIT_SOURCE_UNAVAILABLE,
        SyncError::NoDataFound { .. } => EXIT_NO_DATA,
        SyncError::TemplateSlotNotFound { .. } => EXIT_PATCH_NO_SLOT,
        SyncError::ParseAmbiguity { .. } | SyncError::MalformedDuration { .. } => EXIT_PATCH_PARSE,
        SyncError::Interrupted => EXIT_INTERRUPTED,
        e if e.level() == ErrorLevel::Run => EXIT_RUN_ABORTED,
        _ => EXIT_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_errors_have_own_codes() {
        let err = SyncError::SourceUnavailable { feed: "ss".into(), reason: "403".into() };
        assert_eq!(sync_exit_code(&err), EXIT_SOURCE_UNAVAILABLE);
        assert_eq!(sync_exit_code(&SyncError::NoDataFound { feed: "rta".into() }), EXIT_NO_DATA);
    }

    #[test]
    fn run_level_falls_back_to_aborted() {
        assert_eq!(sync_exit_code(&SyncError::Baseline("disk full".into())), EXIT_RUN_ABORTED);
        assert_eq!(sync_exit_code(&SyncError::Fatal("session lost".into())), EXIT_RUN_ABORTED);
    }

    #[test]
    fn codes_are_distinct() {
        let codes = [
            EXIT_SUCCESS,
            EXIT_ERROR,
            EXIT_USAGE,
            EXIT_CONFIG,
            EXIT_RULES,
            EXIT_MISSING_SECRET,
            EXIT_RUN_ABORTED,
            EXIT_RUN_PARTIAL,
            EXIT_INTERRUPTED,
            EXIT_SOURCE_UNAVAILABLE,
            EXIT_NO_DATA,
            EXIT_PATCH_NO_SLOT,
            EXIT_PATCH_PARSE,
        ];
        let unique: std::collections::HashSet<_> = codes.iter().collect();
        assert_eq!(unique.len(), codes.len());
    }
}
