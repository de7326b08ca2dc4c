//! Trust policy: per-source trust scores plus every scoring constant.
//!
//! The policy is an explicit value handed to the engine constructor, so tests
//! and deployments can substitute alternate weightings. Every field has a
//! default and can be overridden from the `[trust]` table of the node config.

use serde::{Deserialize, Serialize};

use crate::{ReckonError, SignalSource};

/// Trust weights and scoring thresholds used by a reconciliation pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustPolicy {
    // ── Trust per source (0–100) ─────────────────────────────────────────
    pub registration: u8,
    pub attendance_manual: u8,
    pub system: u8,
    pub organizer_override: u8,
    pub certificate: u8,
    pub attendance_scanner: u8,

    // ── Conflict detection ───────────────────────────────────────────────
    /// Signals at or above this trust take part in HIGH_TRUST_DISAGREEMENT.
    pub high_trust_threshold: u8,

    // ── Confidence scoring ───────────────────────────────────────────────
    /// Added when no conflicts were detected.
    pub consistency_bonus: u8,
    /// Subtracted once per detected conflict.
    pub conflict_penalty: u8,
    /// Subtracted when the resolved status is INVALIDATED.
    pub suspicious_penalty: u8,

    // ── Flags ────────────────────────────────────────────────────────────
    /// Confidence below this requires manual review.
    pub review_threshold: u8,
    /// Confidence at or above this (with no conflicts) marks a record verified.
    pub verified_threshold: u8,
    /// Minimum number of active signals for a verified record.
    pub verified_min_signals: usize,
    /// Conflict count at which a record is suspicious on its own.
    pub suspicious_conflict_count: usize,
}

impl TrustPolicy {
    /// Trust score assigned to every signal from `source`.
    pub fn trust_for(&self, source: SignalSource) -> u8 {
        match source {
            SignalSource::Registration => self.registration,
            SignalSource::AttendanceScanner => self.attendance_scanner,
            SignalSource::AttendanceManual => self.attendance_manual,
            SignalSource::Certificate => self.certificate,
            SignalSource::OrganizerOverride => self.organizer_override,
            SignalSource::System => self.system,
        }
    }

    /// Reject trust scores outside 0..=100.
    pub fn validate(&self) -> Result<(), ReckonError> {
        for source in SignalSource::ALL {
            let score = self.trust_for(source);
            if score > 100 {
                return Err(ReckonError::TrustOutOfRange {
                    source_name: source.as_str(),
                    score,
                });
            }
        }
        Ok(())
    }
}

impl Default for TrustPolicy {
    fn default() -> Self {
        Self {
            registration: 50,
            attendance_manual: 70,
            system: 80,
            organizer_override: 85,
            certificate: 90,
            attendance_scanner: 95,

            high_trust_threshold: 80,

            consistency_bonus: 10,
            conflict_penalty: 15,
            suspicious_penalty: 20,

            review_threshold: 50,
            verified_threshold: 80,
            verified_min_signals: 2,
            suspicious_conflict_count: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_trust_table() {
        let policy = TrustPolicy::default();
        assert_eq!(policy.trust_for(SignalSource::Registration), 50);
        assert_eq!(policy.trust_for(SignalSource::AttendanceManual), 70);
        assert_eq!(policy.trust_for(SignalSource::System), 80);
        assert_eq!(policy.trust_for(SignalSource::OrganizerOverride), 85);
        assert_eq!(policy.trust_for(SignalSource::Certificate), 90);
        assert_eq!(policy.trust_for(SignalSource::AttendanceScanner), 95);
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn out_of_range_trust_is_rejected() {
        let policy = TrustPolicy {
            certificate: 101,
            ..TrustPolicy::default()
        };
        assert_eq!(
            policy.validate(),
            Err(ReckonError::TrustOutOfRange {
                source_name: "CERTIFICATE",
                score: 101
            })
        );
    }
}
