//! Conflict detection: a fixed, additive rule set over active signals.

use reckon_store::Conflict;
use reckon_types::{ConflictType, Signal, SignalType, Timestamp, TrustPolicy};

/// Runs every conflict rule independently; several may fire for one set.
pub struct ConflictDetector<'a> {
    policy: &'a TrustPolicy,
}

impl<'a> ConflictDetector<'a> {
    pub fn new(policy: &'a TrustPolicy) -> Self {
        Self { policy }
    }

    /// Detect conflicts among the active members of `signals`.
    pub fn detect(&self, signals: &[Signal], now: Timestamp) -> Vec<Conflict> {
        let active: Vec<&Signal> = signals.iter().filter(|s| s.is_active).collect();
        let has = |ty: SignalType| active.iter().any(|s| s.signal_type == ty);

        let present = has(SignalType::Present);
        let absent = has(SignalType::Absent);
        let issued = has(SignalType::CertificateIssued);
        let revoked = has(SignalType::CertificateRevoked);

        let mut conflicts = Vec::new();
        let mut raise = |conflict_type: ConflictType, description: String| {
            conflicts.push(Conflict {
                conflict_type,
                description,
                detected_at: now,
            })
        };

        if issued && !present {
            raise(
                ConflictType::CertificateWithoutAttendance,
                "certificate issued but no attendance recorded".to_string(),
            );
        }
        if present && absent {
            raise(
                ConflictType::AttendanceContradiction,
                "attendance marked both present and absent".to_string(),
            );
        }
        if revoked && present {
            raise(
                ConflictType::RevokedWithAttendance,
                "certificate revoked although attendance was recorded".to_string(),
            );
        }
        if let Some((a, b)) = self.high_trust_disagreement(&active) {
            raise(
                ConflictType::HighTrustDisagreement,
                format!(
                    "{} ({}, trust {}) disagrees with {} ({}, trust {})",
                    a.signal_type, a.source, a.trust_score, b.signal_type, b.source, b.trust_score
                ),
            );
        }

        conflicts
    }

    /// First pair of high-trust signals making opposing claims.
    fn high_trust_disagreement<'s>(
        &self,
        active: &[&'s Signal],
    ) -> Option<(&'s Signal, &'s Signal)> {
        let high: Vec<&Signal> = active
            .iter()
            .copied()
            .filter(|s| s.trust_score >= self.policy.high_trust_threshold)
            .collect();
        high.iter().enumerate().find_map(|(i, a)| {
            high[i + 1..]
                .iter()
                .find(|b| a.signal_type.opposes(b.signal_type))
                .map(|b| (*a, *b))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reckon_types::{SignalSource, SourceRef};
    use std::collections::BTreeMap;

    fn sig(source: SignalSource, signal_type: SignalType) -> Signal {
        Signal {
            source,
            signal_type,
            trust_score: TrustPolicy::default().trust_for(source),
            timestamp: Timestamp::new(1),
            recorded_by: None,
            source_ref: SourceRef::new("Test", "1"),
            metadata: BTreeMap::new(),
            is_active: true,
        }
    }

    fn types(conflicts: &[Conflict]) -> Vec<ConflictType> {
        conflicts.iter().map(|c| c.conflict_type).collect()
    }

    #[test]
    fn consistent_set_has_no_conflicts() {
        let policy = TrustPolicy::default();
        let signals = [
            sig(SignalSource::Registration, SignalType::Registered),
            sig(SignalSource::AttendanceScanner, SignalType::Present),
            sig(SignalSource::Certificate, SignalType::CertificateIssued),
        ];
        assert!(ConflictDetector::new(&policy)
            .detect(&signals, Timestamp::new(5))
            .is_empty());
    }

    #[test]
    fn certificate_without_attendance() {
        let policy = TrustPolicy::default();
        let signals = [
            sig(SignalSource::Registration, SignalType::Registered),
            sig(SignalSource::Certificate, SignalType::CertificateIssued),
        ];
        let conflicts = ConflictDetector::new(&policy).detect(&signals, Timestamp::new(5));
        assert_eq!(types(&conflicts), [ConflictType::CertificateWithoutAttendance]);
        assert_eq!(conflicts[0].detected_at, Timestamp::new(5));
    }

    #[test]
    fn scanner_vs_system_absence_fires_two_rules() {
        let policy = TrustPolicy::default();
        let signals = [
            sig(SignalSource::AttendanceScanner, SignalType::Present),
            sig(SignalSource::System, SignalType::Absent),
        ];
        let conflicts = ConflictDetector::new(&policy).detect(&signals, Timestamp::new(5));
        assert_eq!(
            types(&conflicts),
            [
                ConflictType::AttendanceContradiction,
                ConflictType::HighTrustDisagreement
            ]
        );
    }

    #[test]
    fn low_trust_contradiction_is_not_high_trust_disagreement() {
        let policy = TrustPolicy::default();
        // Manual attendance (70) is below the high-trust threshold.
        let signals = [
            sig(SignalSource::AttendanceManual, SignalType::Present),
            sig(SignalSource::System, SignalType::Absent),
        ];
        let conflicts = ConflictDetector::new(&policy).detect(&signals, Timestamp::new(5));
        assert_eq!(types(&conflicts), [ConflictType::AttendanceContradiction]);
    }

    #[test]
    fn revoked_with_attendance() {
        let policy = TrustPolicy::default();
        let signals = [
            sig(SignalSource::AttendanceManual, SignalType::Present),
            sig(SignalSource::Certificate, SignalType::CertificateRevoked),
        ];
        let conflicts = ConflictDetector::new(&policy).detect(&signals, Timestamp::new(5));
        assert_eq!(types(&conflicts), [ConflictType::RevokedWithAttendance]);
    }

    #[test]
    fn inactive_signals_are_ignored() {
        let policy = TrustPolicy::default();
        let mut stale = sig(SignalSource::Certificate, SignalType::CertificateIssued);
        stale.is_active = false;
        let signals = [sig(SignalSource::Registration, SignalType::Registered), stale];
        assert!(ConflictDetector::new(&policy)
            .detect(&signals, Timestamp::new(5))
            .is_empty());
    }
}
