//! Top-level error type for parsing and validating shared types.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReckonError {
    #[error("invalid email address: {0:?}")]
    InvalidEmail(String),

    #[error("invalid event id: {0:?}")]
    InvalidEventId(String),

    #[error("unknown canonical status: {0:?}")]
    UnknownStatus(String),

    #[error("unknown signal source: {0:?}")]
    UnknownSource(String),

    #[error("unknown actor role: {0:?}")]
    UnknownRole(String),

    #[error("trust score {score} for {source_name} is outside 0..=100")]
    TrustOutOfRange { source_name: &'static str, score: u8 },
}
