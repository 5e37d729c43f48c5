use serde::Deserialize;
use wrsync_core::Feed;

use crate::error::RuleError;
use crate::reconcile::LinkUpdatePolicy;

const DEFAULT_RULES: &str = include_str!("../rules/default.toml");

// ---------------------------------------------------------------------------
// Top-level rule set
// ---------------------------------------------------------------------------

/// Everything that varies between sheets without changing code: column
/// layout, group markers, the ordered rename table, and reconcile policy.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuleSet {
    #[serde(default)]
    pub extract: ExtractConfig,
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
    /// Entities that are never variant-tagged; repeats collapse to the fastest.
    #[serde(default)]
    pub single_instance: Vec<String>,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
}

// ---------------------------------------------------------------------------
// Extraction layout
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtractConfig {
    #[serde(default)]
    pub ss: FlatSheetConfig,
    #[serde(default)]
    pub rta: StructuredSheetConfig,
}

/// Column layout of the single-star sheet (0-based within the fetched range).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FlatSheetConfig {
    pub name_col: usize,
    pub rt_col: usize,
    pub igt_col: usize,
    /// Real-time cell content that marks an in-game counterpart row.
    pub igt_row_marker: String,
}

impl Default for FlatSheetConfig {
    fn default() -> Self {
        Self {
            name_col: 0,
            rt_col: 2,
            igt_col: 3,
            igt_row_marker: "---".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StructuredSheetConfig {
    /// Label of the row that ends extraction.
    pub terminal_label: String,
    /// Rows whose label contains any of these are ignored.
    pub skip_label_substrings: Vec<String>,
    /// Group-name patterns whose rows are taken even without a `[n]` index.
    pub unindexed_groups: Vec<String>,
}

impl Default for StructuredSheetConfig {
    fn default() -> Self {
        Self {
            terminal_label: "17. Castle (Lobby)".into(),
            skip_label_substrings: vec!["RTA".into()],
            unindexed_groups: vec!["Bowser.*Red Coins".into()],
        }
    }
}

// ---------------------------------------------------------------------------
// Rename rules
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// Whole label equals `pattern` -> `replace`.
    Exact,
    /// Label ends with `pattern` -> suffix removed.
    StripSuffix,
    /// Label contains `pattern` -> every occurrence replaced with `replace` (default empty).
    Contains,
    /// Regex `pattern` replaced with `replace` (`$1` style captures allowed).
    Regex,
    /// Label equals `pattern` -> not a tracked entity.
    Drop,
}

impl RuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::StripSuffix => "strip_suffix",
            Self::Contains => "contains",
            Self::Regex => "regex",
            Self::Drop => "drop",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RuleConfig {
    pub kind: RuleKind,
    pub pattern: String,
    #[serde(default)]
    pub replace: Option<String>,
    /// Feeds the rule applies to. Empty = all feeds.
    #[serde(default)]
    pub feeds: Vec<String>,
    /// Rule only fires when the running label contains this substring.
    #[serde(default)]
    pub only_if_contains: Option<String>,
}

impl RuleConfig {
    pub fn applies_to(&self, feed: Feed) -> bool {
        self.feeds.is_empty() || self.feeds.iter().any(|f| f == feed.as_str())
    }
}

// ---------------------------------------------------------------------------
// Reconcile policy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReconcileConfig {
    #[serde(default)]
    pub link_updates: LinkUpdatePolicy,
    /// Entities whose link-only changes are discarded.
    #[serde(default)]
    pub no_link_updates: Vec<String>,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl RuleSet {
    pub fn from_toml(input: &str) -> Result<Self, RuleError> {
        let rules: RuleSet =
            toml::from_str(input).map_err(|e| RuleError::Parse(e.to_string()))?;
        rules.validate()?;
        Ok(rules)
    }

    pub fn from_path(path: &std::path::Path) -> Result<Self, RuleError> {
        let input = std::fs::read_to_string(path)
            .map_err(|e| RuleError::Io(format!("{}: {e}", path.display())))?;
        Self::from_toml(&input)
    }

    /// The rule set compiled into the crate.
    pub fn default_rules() -> Result<Self, RuleError> {
        Self::from_toml(DEFAULT_RULES)
    }

    pub fn validate(&self) -> Result<(), RuleError> {
        for (index, rule) in self.rules.iter().enumerate() {
            let invalid = |message: String| RuleError::InvalidRule {
                index,
                kind: rule.kind.as_str().to_string(),
                message,
            };

            if rule.pattern.is_empty() {
                return Err(invalid("pattern must not be empty".into()));
            }

            for feed in &rule.feeds {
                if Feed::parse(feed).is_none() {
                    return Err(invalid(format!("unknown feed '{feed}' (expected ss or rta)")));
                }
            }

            match rule.kind {
                RuleKind::Exact if rule.replace.is_none() => {
                    return Err(invalid("exact rules need a 'replace' value".into()));
                }
                RuleKind::Drop if rule.replace.is_some() => {
                    return Err(invalid("drop rules take no 'replace' value".into()));
                }
                RuleKind::Regex => {
                    regex::Regex::new(&rule.pattern).map_err(|source| RuleError::Regex {
                        pattern: rule.pattern.clone(),
                        source,
                    })?;
                }
                _ => {}
            }
        }

        for pattern in &self.extract.rta.unindexed_groups {
            regex::Regex::new(pattern).map_err(|source| RuleError::Regex {
                pattern: pattern.clone(),
                source,
            })?;
        }

        if self.extract.rta.terminal_label.trim().is_empty() {
            return Err(RuleError::InvalidRule {
                index: 0,
                kind: "extract.rta".into(),
                message: "terminal_label must not be empty".into(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rules_load() {
        let rules = RuleSet::default_rules().unwrap();
        assert!(!rules.rules.is_empty());
        assert_eq!(rules.extract.ss.rt_col, 2);
        assert_eq!(rules.extract.rta.terminal_label, "17. Castle (Lobby)");
        assert_eq!(rules.reconcile.link_updates, LinkUpdatePolicy::KeepBaselineTime);
    }

    #[test]
    fn empty_document_uses_defaults() {
        let rules = RuleSet::from_toml("").unwrap();
        assert!(rules.rules.is_empty());
        assert_eq!(rules.extract.ss.igt_row_marker, "---");
        assert_eq!(rules.extract.rta.skip_label_substrings, vec!["RTA"]);
    }

    #[test]
    fn rejects_bad_regex() {
        let err = RuleSet::from_toml(
            r#"
            [[rules]]
            kind = "regex"
            pattern = "(unclosed"
            replace = ""
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, RuleError::Regex { .. }));
    }

    #[test]
    fn rejects_unknown_feed() {
        let err = RuleSet::from_toml(
            r#"
            [[rules]]
            kind = "strip_suffix"
            pattern = " (JP)"
            feeds = ["extensions"]
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown feed 'extensions'"));
    }

    #[test]
    fn exact_requires_replace() {
        let err = RuleSet::from_toml(
            r#"
            [[rules]]
            kind = "exact"
            pattern = "A"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, RuleError::InvalidRule { index: 0, .. }));
    }

    #[test]
    fn rejects_unknown_kind() {
        let err = RuleSet::from_toml(
            r#"
            [[rules]]
            kind = "prefix"
            pattern = "A"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, RuleError::Parse(_)));
    }

    #[test]
    fn link_policy_parses() {
        let rules = RuleSet::from_toml(
            r#"
            [reconcile]
            link_updates = "adopt_extracted"
            no_link_updates = ["Chip Off Whomp's Block"]
            "#,
        )
        .unwrap();
        assert_eq!(rules.reconcile.link_updates, LinkUpdatePolicy::AdoptExtracted);
        assert_eq!(rules.reconcile.no_link_updates.len(), 1);
    }
}
