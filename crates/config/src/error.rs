use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config parse error: {0}")]
    Parse(String),

    /// A value is present but unusable.
    #[error("{field}: {message}")]
    Invalid { field: &'static str, message: String },

    /// A value a live run needs is not set.
    #[error("{field} is not set")]
    Missing { field: &'static str },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid { field, message: message.into() }
    }
}
