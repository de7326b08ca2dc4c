use reckon_types::ParticipantKey;
use thiserror::Error;

use crate::SourceKind;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key not found: {0}")]
    NotFound(String),

    #[error("version conflict on {key}: expected {expected:?}, found {found:?}")]
    VersionConflict {
        key: ParticipantKey,
        expected: Option<u64>,
        found: Option<u64>,
    },

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("database is corrupted: {0}")]
    Corruption(String),
}

/// A signal source or event directory could not answer.
///
/// Absence of a record is not an error; sources return `Ok(None)` for that.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{kind} source unavailable: {reason}")]
    Unavailable { kind: SourceKind, reason: String },

    #[error("{kind} source returned malformed data: {reason}")]
    Malformed { kind: SourceKind, reason: String },
}

impl SourceError {
    pub fn kind(&self) -> SourceKind {
        match self {
            Self::Unavailable { kind, .. } | Self::Malformed { kind, .. } => *kind,
        }
    }
}
