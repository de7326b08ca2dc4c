use reckon_store::{SourceError, StoreError};
use reckon_types::{ActorId, EventId, ParticipantKey};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("reconciliation failed for {key}: {source}")]
    Source {
        key: ParticipantKey,
        source: SourceError,
    },

    #[error("event directory lookup failed for {event}: {source}")]
    Directory { event: EventId, source: SourceError },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("no participation record for {0}")]
    NotFound(ParticipantKey),

    #[error("unknown event: {0}")]
    UnknownEvent(EventId),

    #[error("invalid status {0:?}: expected one of REGISTERED_ONLY, ATTENDED_NO_CERTIFICATE, CERTIFIED, INVALIDATED")]
    InvalidStatus(String),

    #[error("override reason must not be empty")]
    MissingReason,

    #[error("actor {actor} is not permitted to override participation for event {event}")]
    PermissionDenied { actor: ActorId, event: EventId },

    #[error("participation record {0} has no active manual override")]
    NotOverridden(ParticipantKey),

    #[error("gave up on {key} after {attempts} conflicting write attempts")]
    WriteContention { key: ParticipantKey, attempts: u32 },
}

impl ReconcileError {
    /// Whether retrying the same request could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Source { .. } | Self::Directory { .. } | Self::Store(_) | Self::WriteContention { .. }
        )
    }
}
