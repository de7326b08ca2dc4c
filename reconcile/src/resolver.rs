//! Canonical status resolution.
//!
//! Deterministic and total over the active signal set: INVALIDATED wins
//! outright, otherwise the highest-trust signal of each category feeds a
//! fixed decision table.

use reckon_store::StatusBreakdown;
use reckon_types::{CanonicalStatus, ResolutionStrategy, Signal, SignalType};
use reckon_types::signal::SignalCategory;

/// Outcome of resolving one signal set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub status: CanonicalStatus,
    pub strategy: ResolutionStrategy,
    pub is_registered: bool,
    pub is_present: bool,
    pub has_certificate: bool,
    pub is_revoked: bool,
    /// Human-readable account of the decisive signals.
    pub notes: String,
}

impl Resolution {
    pub fn breakdown(&self) -> StatusBreakdown {
        StatusBreakdown {
            is_registered: self.is_registered,
            has_attendance: self.is_present,
            has_certificate: self.has_certificate,
            is_revoked: self.is_revoked,
        }
    }
}

pub struct StatusResolver;

impl StatusResolver {
    pub fn resolve(&self, signals: &[Signal]) -> Resolution {
        let active: Vec<&Signal> = signals.iter().filter(|s| s.is_active).collect();

        let registration = winner(&active, SignalCategory::Registration);
        let attendance = winner(&active, SignalCategory::Attendance);
        let certificate = winner(&active, SignalCategory::Certificate);

        let is_registered = registration.is_some();
        let is_present = attendance.is_some_and(|s| s.signal_type == SignalType::Present);
        let has_certificate =
            certificate.is_some_and(|s| s.signal_type == SignalType::CertificateIssued);
        let is_revoked =
            certificate.is_some_and(|s| s.signal_type == SignalType::CertificateRevoked);

        if let Some(invalidation) = winner(&active, SignalCategory::Invalidation) {
            return Resolution {
                status: CanonicalStatus::Invalidated,
                strategy: ResolutionStrategy::InvalidationPrecedence,
                is_registered,
                is_present,
                has_certificate,
                is_revoked,
                notes: format!(
                    "invalidated by {} ({})",
                    invalidation.source, invalidation.source_ref.id
                ),
            };
        }

        if active.is_empty() {
            return Resolution {
                status: CanonicalStatus::RegisteredOnly,
                strategy: ResolutionStrategy::NoEvidence,
                is_registered,
                is_present,
                has_certificate,
                is_revoked,
                notes: "no active signals".to_string(),
            };
        }

        let status = match (has_certificate, is_present) {
            (true, true) => CanonicalStatus::Certified,
            // Certificate without attendance invalidates the participation.
            (true, false) => CanonicalStatus::Invalidated,
            (false, true) => CanonicalStatus::AttendedNoCertificate,
            (false, false) => CanonicalStatus::RegisteredOnly,
        };

        let decisive: Vec<String> = [registration, attendance, certificate]
            .into_iter()
            .flatten()
            .map(|s| format!("{} via {} ({})", s.signal_type, s.source, s.trust_score))
            .collect();

        Resolution {
            status,
            strategy: ResolutionStrategy::TrustPrecedence,
            is_registered,
            is_present,
            has_certificate,
            is_revoked,
            notes: decisive.join("; "),
        }
    }
}

/// Highest-trust active signal of a category. Ties go to the most recent
/// signal, then to the negative claim.
fn winner<'s>(active: &[&'s Signal], category: SignalCategory) -> Option<&'s Signal> {
    active
        .iter()
        .copied()
        .filter(|s| s.signal_type.category() == category)
        .max_by_key(|s| (s.trust_score, s.timestamp, s.signal_type.is_negative()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reckon_types::{SignalSource, SourceRef, Timestamp, TrustPolicy};
    use std::collections::BTreeMap;

    fn sig(source: SignalSource, signal_type: SignalType, at: u64) -> Signal {
        Signal {
            source,
            signal_type,
            trust_score: TrustPolicy::default().trust_for(source),
            timestamp: Timestamp::new(at),
            recorded_by: None,
            source_ref: SourceRef::new("Test", at.to_string()),
            metadata: BTreeMap::new(),
            is_active: true,
        }
    }

    #[test]
    fn no_evidence_defaults_to_registered_only() {
        let resolution = StatusResolver.resolve(&[]);
        assert_eq!(resolution.status, CanonicalStatus::RegisteredOnly);
        assert_eq!(resolution.strategy, ResolutionStrategy::NoEvidence);
        assert!(!resolution.is_registered);
    }

    #[test]
    fn decision_table() {
        use SignalSource::*;
        use SignalType::*;

        let cases: Vec<(Vec<Signal>, CanonicalStatus)> = vec![
            (vec![sig(Registration, Registered, 1)], CanonicalStatus::RegisteredOnly),
            (
                vec![sig(Registration, Registered, 1), sig(AttendanceManual, Present, 2)],
                CanonicalStatus::AttendedNoCertificate,
            ),
            (
                vec![
                    sig(Registration, Registered, 1),
                    sig(AttendanceScanner, Present, 2),
                    sig(Certificate, CertificateIssued, 3),
                ],
                CanonicalStatus::Certified,
            ),
            (
                vec![sig(Registration, Registered, 1), sig(Certificate, CertificateIssued, 3)],
                CanonicalStatus::Invalidated,
            ),
            (
                vec![
                    sig(AttendanceScanner, Present, 2),
                    sig(Certificate, CertificateRevoked, 3),
                ],
                CanonicalStatus::AttendedNoCertificate,
            ),
            (vec![sig(System, Absent, 1)], CanonicalStatus::RegisteredOnly),
        ];

        for (signals, expected) in cases {
            assert_eq!(StatusResolver.resolve(&signals).status, expected, "{signals:?}");
        }
    }

    #[test]
    fn invalidation_overrides_everything() {
        let signals = [
            sig(SignalSource::AttendanceScanner, SignalType::Present, 2),
            sig(SignalSource::Certificate, SignalType::CertificateIssued, 3),
            sig(SignalSource::OrganizerOverride, SignalType::Invalidated, 4),
        ];
        let resolution = StatusResolver.resolve(&signals);
        assert_eq!(resolution.status, CanonicalStatus::Invalidated);
        assert_eq!(resolution.strategy, ResolutionStrategy::InvalidationPrecedence);
        assert!(resolution.is_present && resolution.has_certificate);
    }

    #[test]
    fn highest_trust_wins_within_attendance() {
        // Scanner PRESENT (95) beats system ABSENT (80).
        let signals = [
            sig(SignalSource::System, SignalType::Absent, 9),
            sig(SignalSource::AttendanceScanner, SignalType::Present, 1),
        ];
        assert!(StatusResolver.resolve(&signals).is_present);

        // System ABSENT (80) beats manual PRESENT (70).
        let signals = [
            sig(SignalSource::AttendanceManual, SignalType::Present, 9),
            sig(SignalSource::System, SignalType::Absent, 1),
        ];
        assert!(!StatusResolver.resolve(&signals).is_present);
    }

    #[test]
    fn equal_trust_prefers_recency_then_negative_claim() {
        let mut present = sig(SignalSource::AttendanceManual, SignalType::Present, 5);
        let mut absent = sig(SignalSource::AttendanceManual, SignalType::Absent, 4);
        assert!(StatusResolver.resolve(&[present.clone(), absent.clone()]).is_present);

        absent.timestamp = Timestamp::new(6);
        assert!(!StatusResolver.resolve(&[present.clone(), absent.clone()]).is_present);

        present.timestamp = Timestamp::new(6);
        assert!(!StatusResolver.resolve(&[present, absent]).is_present);
    }

    #[test]
    fn revocation_is_reported_in_breakdown() {
        let signals = [sig(SignalSource::Certificate, SignalType::CertificateRevoked, 3)];
        let breakdown = StatusResolver.resolve(&signals).breakdown();
        assert!(breakdown.is_revoked);
        assert!(!breakdown.has_certificate);
    }
}
