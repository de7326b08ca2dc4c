//! Signals: normalized claims about whether a participant took part in an event.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::{ActorId, ReckonError, Timestamp};

/// Where a signal came from. Determines its trust score.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalSource {
    Registration,
    AttendanceScanner,
    AttendanceManual,
    Certificate,
    OrganizerOverride,
    System,
}

impl SignalSource {
    pub const ALL: [SignalSource; 6] = [
        Self::Registration,
        Self::AttendanceScanner,
        Self::AttendanceManual,
        Self::Certificate,
        Self::OrganizerOverride,
        Self::System,
    ];

    /// Wire spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registration => "REGISTRATION",
            Self::AttendanceScanner => "ATTENDANCE_SCANNER",
            Self::AttendanceManual => "ATTENDANCE_MANUAL",
            Self::Certificate => "CERTIFICATE",
            Self::OrganizerOverride => "ORGANIZER_OVERRIDE",
            Self::System => "SYSTEM",
        }
    }
}

impl fmt::Display for SignalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalSource {
    type Err = ReckonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|source| source.as_str() == s)
            .ok_or_else(|| ReckonError::UnknownSource(s.to_string()))
    }
}

/// What a signal claims.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalType {
    Registered,
    Present,
    Absent,
    CertificateIssued,
    CertificateRevoked,
    Invalidated,
}

/// The decision category a signal type competes in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SignalCategory {
    Registration,
    Attendance,
    Certificate,
    Invalidation,
}

impl SignalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registered => "REGISTERED",
            Self::Present => "PRESENT",
            Self::Absent => "ABSENT",
            Self::CertificateIssued => "CERTIFICATE_ISSUED",
            Self::CertificateRevoked => "CERTIFICATE_REVOKED",
            Self::Invalidated => "INVALIDATED",
        }
    }

    pub fn category(&self) -> SignalCategory {
        match self {
            Self::Registered => SignalCategory::Registration,
            Self::Present | Self::Absent => SignalCategory::Attendance,
            Self::CertificateIssued | Self::CertificateRevoked => SignalCategory::Certificate,
            Self::Invalidated => SignalCategory::Invalidation,
        }
    }

    /// Whether `self` and `other` make contradictory claims
    /// (PRESENT vs ABSENT, CERTIFICATE_ISSUED vs CERTIFICATE_REVOKED).
    pub fn opposes(&self, other: SignalType) -> bool {
        matches!(
            (self, other),
            (Self::Present, Self::Absent)
                | (Self::Absent, Self::Present)
                | (Self::CertificateIssued, Self::CertificateRevoked)
                | (Self::CertificateRevoked, Self::CertificateIssued)
        )
    }

    /// The negative side of an opposing pair.
    pub fn is_negative(&self) -> bool {
        matches!(self, Self::Absent | Self::CertificateRevoked | Self::Invalidated)
    }
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pointer back to the record a signal was derived from.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRef {
    /// Kind of originating record, e.g. `"Registration"`.
    pub model: String,
    /// Identifier of the originating record.
    pub id: String,
}

impl SourceRef {
    pub fn new(model: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            id: id.into(),
        }
    }
}

/// One normalized claim about participation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signal {
    pub source: SignalSource,
    pub signal_type: SignalType,
    /// Reliability weight (0–100), fixed per source by the trust policy.
    pub trust_score: u8,
    pub timestamp: Timestamp,
    pub recorded_by: Option<ActorId>,
    pub source_ref: SourceRef,
    pub metadata: BTreeMap<String, String>,
    /// Superseded or invalidated signals stay in the record for audit with
    /// `is_active = false` and are ignored by every computation.
    pub is_active: bool,
}

impl Signal {
    /// Whether `other` describes the same observation (ignores activity and metadata).
    pub fn same_observation(&self, other: &Signal) -> bool {
        self.source == other.source
            && self.signal_type == other.signal_type
            && self.source_ref == other.source_ref
            && self.timestamp == other.timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposing_pairs_are_symmetric() {
        assert!(SignalType::Present.opposes(SignalType::Absent));
        assert!(SignalType::Absent.opposes(SignalType::Present));
        assert!(SignalType::CertificateIssued.opposes(SignalType::CertificateRevoked));
        assert!(!SignalType::Present.opposes(SignalType::CertificateRevoked));
        assert!(!SignalType::Registered.opposes(SignalType::Invalidated));
    }

    #[test]
    fn source_wire_spelling_round_trips() {
        for source in SignalSource::ALL {
            assert_eq!(source.as_str().parse::<SignalSource>().unwrap(), source);
            let json = serde_json::to_string(&source).unwrap();
            assert_eq!(json, format!("\"{}\"", source.as_str()));
        }
    }

    #[test]
    fn signal_type_serializes_screaming_snake() {
        let json = serde_json::to_string(&SignalType::CertificateRevoked).unwrap();
        assert_eq!(json, "\"CERTIFICATE_REVOKED\"");
    }
}
