/// Errors loading or compiling a rule set.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// TOML parse / deserialization error.
    #[error("rule set parse error: {0}")]
    Parse(String),

    /// A rule is missing a field its kind requires, or names an unknown feed.
    #[error("rule {index} ({kind}): {message}")]
    InvalidRule { index: usize, kind: String, message: String },

    #[error("invalid pattern '{pattern}': {source}")]
    Regex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("cannot read rule set: {0}")]
    Io(String),
}
