//! Canonical participation status and the vocabulary that explains it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ReckonError;

/// The single authoritative participation outcome for a (subject, event) pair.
///
/// The wire spellings are consumed bit-exact by public verification and
/// statistics consumers and must never change.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CanonicalStatus {
    #[default]
    RegisteredOnly,
    AttendedNoCertificate,
    Certified,
    Invalidated,
}

impl CanonicalStatus {
    pub const ALL: [CanonicalStatus; 4] = [
        Self::RegisteredOnly,
        Self::AttendedNoCertificate,
        Self::Certified,
        Self::Invalidated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RegisteredOnly => "REGISTERED_ONLY",
            Self::AttendedNoCertificate => "ATTENDED_NO_CERTIFICATE",
            Self::Certified => "CERTIFIED",
            Self::Invalidated => "INVALIDATED",
        }
    }
}

impl fmt::Display for CanonicalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CanonicalStatus {
    type Err = ReckonError;

    /// Parses the exact wire spelling only.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ReckonError::UnknownStatus(s.to_string()))
    }
}

/// Logical inconsistencies the conflict detector can report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictType {
    CertificateWithoutAttendance,
    AttendanceContradiction,
    RevokedWithAttendance,
    HighTrustDisagreement,
}

impl ConflictType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CertificateWithoutAttendance => "CERTIFICATE_WITHOUT_ATTENDANCE",
            Self::AttendanceContradiction => "ATTENDANCE_CONTRADICTION",
            Self::RevokedWithAttendance => "REVOKED_WITH_ATTENDANCE",
            Self::HighTrustDisagreement => "HIGH_TRUST_DISAGREEMENT",
        }
    }
}

impl fmt::Display for ConflictType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the current canonical status was arrived at.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResolutionStrategy {
    /// Highest-trust signal per category fed the decision table.
    #[default]
    TrustPrecedence,
    /// An active INVALIDATED signal short-circuited the decision.
    InvalidationPrecedence,
    /// No active signals; the default status applies.
    NoEvidence,
    /// An authorized actor set the status by hand.
    ManualOverride,
}

impl ResolutionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TrustPrecedence => "TRUST_PRECEDENCE",
            Self::InvalidationPrecedence => "INVALIDATION_PRECEDENCE",
            Self::NoEvidence => "NO_EVIDENCE",
            Self::ManualOverride => "MANUAL_OVERRIDE",
        }
    }
}

impl fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_spellings_are_exact() {
        let spelled: Vec<_> = CanonicalStatus::ALL.iter().map(|s| s.as_str()).collect();
        assert_eq!(
            spelled,
            ["REGISTERED_ONLY", "ATTENDED_NO_CERTIFICATE", "CERTIFIED", "INVALIDATED"]
        );
        for status in CanonicalStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
            assert_eq!(status.as_str().parse::<CanonicalStatus>().unwrap(), status);
        }
    }

    #[test]
    fn status_parsing_is_case_sensitive() {
        assert!("certified".parse::<CanonicalStatus>().is_err());
        assert!("ATTENDED".parse::<CanonicalStatus>().is_err());
    }

    #[test]
    fn default_status_is_registered_only() {
        assert_eq!(CanonicalStatus::default(), CanonicalStatus::RegisteredOnly);
    }
}
