//! Error taxonomy shared by every stage of a sync run.
//!
//! Each variant has a fixed [`ErrorLevel`]. The pipeline decides what to do
//! with a failure by its level alone: row-level errors skip the row,
//! entity-level errors skip the entity, run-level errors stop the loop and
//! go straight to finalization.

/// How far a failure propagates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorLevel {
    /// Skip the row, keep extracting.
    Row,
    /// Skip the entity's publish, keep processing the batch.
    Entity,
    /// Abort the remaining batch, then finalize.
    Run,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SyncError {
    /// Feed fetch failed (network, auth, upstream error).
    #[error("source '{feed}' unavailable: {reason}")]
    SourceUnavailable { feed: String, reason: String },

    /// Feed returned no rows.
    #[error("no data found in source '{feed}'")]
    NoDataFound { feed: String },

    /// Text is not a 1- or 2-component numeric duration.
    #[error("malformed duration '{input}'")]
    MalformedDuration { input: String },

    /// A data-shaped row (or published token) whose time/link could not be located.
    #[error("cannot parse {context}: {detail}")]
    ParseAmbiguity { context: String, detail: String },

    /// The page has no recognizable record slot.
    #[error("page '{entity_id}' has no '{field}' slot")]
    TemplateSlotNotFound { entity_id: String, field: String },

    #[error("page '{entity_id}' not found")]
    PageNotFound { entity_id: String },

    /// The page changed between read and write.
    #[error("edit conflict on '{entity_id}'")]
    PublishConflict { entity_id: String },

    /// The document store refused the edit for any other reason.
    #[error("edit rejected on '{entity_id}': {reason}")]
    PublishRejected { entity_id: String, reason: String },

    /// Baseline store could not be read or written.
    #[error("baseline store error: {0}")]
    Baseline(String),

    /// Cooperative stop requested.
    #[error("run interrupted")]
    Interrupted,

    /// Unrecoverable collaborator failure (lost session, revoked credentials).
    #[error("fatal: {0}")]
    Fatal(String),
}

impl SyncError {
    pub fn level(&self) -> ErrorLevel {
        match self {
            Self::MalformedDuration { .. } | Self::ParseAmbiguity { .. } => ErrorLevel::Row,
            Self::TemplateSlotNotFound { .. }
            | Self::PageNotFound { .. }
            | Self::PublishConflict { .. }
            | Self::PublishRejected { .. } => ErrorLevel::Entity,
            Self::SourceUnavailable { .. }
            | Self::NoDataFound { .. }
            | Self::Baseline(_)
            | Self::Interrupted
            | Self::Fatal(_) => ErrorLevel::Run,
        }
    }

    pub fn parse_ambiguity(context: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::ParseAmbiguity { context: context.into(), detail: detail.into() }
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
