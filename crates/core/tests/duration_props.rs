// Property tests for time normalization.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use proptest::prelude::*;
use wrsync_core::{Duration, SyncError, Timing};

fn config() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

proptest! {
    #![proptest_config(config())]

    #[test]
    fn minutes_form_equals_seconds_form(m in 0u64..60, s in 0u64..60, cs in 0u64..100) {
        let with_minutes = format!("{m}:{s:02}.{cs:02}");
        let total_secs = m * 60 + s;
        let seconds_only = format!("{total_secs}.{cs:02}");

        let a = Duration::parse(&with_minutes).unwrap();
        let b = Duration::parse(&seconds_only).unwrap();
        prop_assert_eq!(a.millis(), (total_secs * 1000) + cs * 10);
        prop_assert_eq!(&a, &b);
        prop_assert_eq!(a.display(), with_minutes.as_str());
    }

    #[test]
    fn igt_suffix_only_changes_timing(s in 0u64..600, cs in 0u64..100) {
        let rt = Duration::parse(&format!("{s}.{cs:02}")).unwrap();
        let igt = Duration::parse(&format!("{s}.{cs:02} (IGT)")).unwrap();
        prop_assert_eq!(rt.millis(), igt.millis());
        prop_assert_eq!(igt.timing(), Timing::InGame);
        prop_assert_ne!(rt, igt);
    }

    #[test]
    fn alphabetic_input_is_malformed(s in "[a-zA-Z]{1,8}") {
        let is_malformed = matches!(Duration::parse(&s), Err(SyncError::MalformedDuration { .. }));
        prop_assert!(is_malformed);
    }
}
