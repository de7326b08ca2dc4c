//! Signal ingestion: normalize upstream records into weighted signals.

use std::collections::BTreeMap;

use reckon_store::{
    AttendanceRecord, AttendanceStatus, CertificateRecord, RegistrationRecord, SignalSources,
    SourceError,
};
use reckon_types::{
    ActorId, ParticipantKey, Signal, SignalSource, SignalType, SourceRef, Timestamp, TrustPolicy,
};

/// The latest record from each source for one `(email, event)` pair.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceSnapshot {
    pub registration: Option<RegistrationRecord>,
    pub attendance: Option<AttendanceRecord>,
    pub certificate: Option<CertificateRecord>,
}

impl SourceSnapshot {
    /// Read every source for `key`. The first failing read aborts the fetch.
    pub fn fetch<R>(sources: &R, key: &ParticipantKey) -> Result<Self, SourceError>
    where
        R: SignalSources + ?Sized,
    {
        Ok(Self {
            registration: sources.registration(key)?,
            attendance: sources.attendance(key)?,
            certificate: sources.certificate(key)?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.registration.is_none() && self.attendance.is_none() && self.certificate.is_none()
    }
}

/// Turns a [`SourceSnapshot`] into signals, weighted by the trust policy.
///
/// Each source contributes at most one signal; a missing source contributes
/// nothing. All produced signals are active.
pub struct SignalIngestor<'a> {
    policy: &'a TrustPolicy,
}

impl<'a> SignalIngestor<'a> {
    pub fn new(policy: &'a TrustPolicy) -> Self {
        Self { policy }
    }

    pub fn ingest(&self, snapshot: &SourceSnapshot) -> Vec<Signal> {
        let mut signals = Vec::with_capacity(3);

        if let Some(registration) = &snapshot.registration {
            signals.push(self.registration_signal(registration));
        }

        match snapshot.attendance.as_ref().filter(|a| a.valid) {
            Some(attendance) => signals.push(self.attendance_signal(attendance)),
            None => {
                if let Some(registration) = snapshot
                    .registration
                    .as_ref()
                    .filter(|r| r.attendance_hint == Some(AttendanceStatus::Absent))
                {
                    signals.push(self.absence_hint_signal(registration));
                }
            }
        }

        if let Some(certificate) = &snapshot.certificate {
            signals.push(self.certificate_signal(certificate));
        }

        signals
    }

    /// A valid registration says REGISTERED; an invalidated one carries the
    /// organizer's INVALIDATED claim instead.
    fn registration_signal(&self, record: &RegistrationRecord) -> Signal {
        if record.valid {
            self.signal(
                SignalSource::Registration,
                SignalType::Registered,
                record.created_at,
                record.created_by.clone(),
                SourceRef::new("Registration", &record.id),
                BTreeMap::new(),
            )
        } else {
            self.signal(
                SignalSource::OrganizerOverride,
                SignalType::Invalidated,
                record.created_at,
                record.created_by.clone(),
                SourceRef::new("Registration", &record.id),
                metadata([("reason", "registration invalidated")]),
            )
        }
    }

    fn attendance_signal(&self, record: &AttendanceRecord) -> Signal {
        let (source, method) = match record.marked_by {
            Some(_) => (SignalSource::AttendanceManual, "manual"),
            None => (SignalSource::AttendanceScanner, "scanner"),
        };
        let signal_type = match record.status {
            AttendanceStatus::Present => SignalType::Present,
            AttendanceStatus::Absent => SignalType::Absent,
        };
        self.signal(
            source,
            signal_type,
            record.scanned_at,
            record.marked_by.clone(),
            SourceRef::new("Attendance", &record.id),
            metadata([("method", method)]),
        )
    }

    fn absence_hint_signal(&self, record: &RegistrationRecord) -> Signal {
        self.signal(
            SignalSource::System,
            SignalType::Absent,
            record.created_at,
            None,
            SourceRef::new("Registration", &record.id),
            metadata([("derived_from", "attendance_hint")]),
        )
    }

    fn certificate_signal(&self, record: &CertificateRecord) -> Signal {
        let status = record.status.as_str().to_string();
        if record.is_revoked() {
            self.signal(
                SignalSource::Certificate,
                SignalType::CertificateRevoked,
                record.revoked_at.unwrap_or(record.issued_at),
                record.revoked_by.clone().or_else(|| record.issued_by.clone()),
                SourceRef::new("Certificate", &record.id),
                BTreeMap::from([
                    ("status".to_string(), status),
                    ("valid".to_string(), record.valid.to_string()),
                ]),
            )
        } else {
            self.signal(
                SignalSource::Certificate,
                SignalType::CertificateIssued,
                record.issued_at,
                record.issued_by.clone(),
                SourceRef::new("Certificate", &record.id),
                BTreeMap::from([("status".to_string(), status)]),
            )
        }
    }

    fn signal(
        &self,
        source: SignalSource,
        signal_type: SignalType,
        timestamp: Timestamp,
        recorded_by: Option<ActorId>,
        source_ref: SourceRef,
        metadata: BTreeMap<String, String>,
    ) -> Signal {
        Signal {
            source,
            signal_type,
            trust_score: self.policy.trust_for(source),
            timestamp,
            recorded_by,
            source_ref,
            metadata,
            is_active: true,
        }
    }
}

fn metadata<const N: usize>(pairs: [(&str, &str); N]) -> BTreeMap<String, String> {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reckon_store::CertificateStatus;

    fn registration(valid: bool, hint: Option<AttendanceStatus>) -> RegistrationRecord {
        RegistrationRecord {
            id: "reg-1".into(),
            valid,
            created_by: None,
            created_at: Timestamp::new(100),
            attendance_hint: hint,
        }
    }

    fn attendance(marked_by: Option<&str>, valid: bool) -> AttendanceRecord {
        AttendanceRecord {
            id: "att-1".into(),
            valid,
            marked_by: marked_by.map(ActorId::new),
            scanned_at: Timestamp::new(200),
            status: AttendanceStatus::Present,
        }
    }

    fn certificate(status: CertificateStatus, valid: bool) -> CertificateRecord {
        CertificateRecord {
            id: "cert-1".into(),
            valid,
            status,
            issued_by: Some(ActorId::new("organizer")),
            issued_at: Timestamp::new(300),
            revoked_by: None,
            revoked_at: None,
        }
    }

    fn kinds(signals: &[Signal]) -> Vec<(SignalSource, SignalType, u8)> {
        signals
            .iter()
            .map(|s| (s.source, s.signal_type, s.trust_score))
            .collect()
    }

    #[test]
    fn empty_snapshot_yields_no_signals() {
        let policy = TrustPolicy::default();
        assert!(SignalIngestor::new(&policy).ingest(&SourceSnapshot::default()).is_empty());
    }

    #[test]
    fn scanner_and_manual_attendance_get_different_trust() {
        let policy = TrustPolicy::default();
        let ingestor = SignalIngestor::new(&policy);

        let scanned = ingestor.ingest(&SourceSnapshot {
            attendance: Some(attendance(None, true)),
            ..Default::default()
        });
        assert_eq!(
            kinds(&scanned),
            [(SignalSource::AttendanceScanner, SignalType::Present, 95)]
        );

        let manual = ingestor.ingest(&SourceSnapshot {
            attendance: Some(attendance(Some("volunteer"), true)),
            ..Default::default()
        });
        assert_eq!(
            kinds(&manual),
            [(SignalSource::AttendanceManual, SignalType::Present, 70)]
        );
        assert_eq!(manual[0].recorded_by, Some(ActorId::new("volunteer")));
    }

    #[test]
    fn absence_hint_only_applies_without_valid_attendance() {
        let policy = TrustPolicy::default();
        let ingestor = SignalIngestor::new(&policy);

        let hinted = ingestor.ingest(&SourceSnapshot {
            registration: Some(registration(true, Some(AttendanceStatus::Absent))),
            attendance: Some(attendance(None, false)),
            ..Default::default()
        });
        assert_eq!(
            kinds(&hinted),
            [
                (SignalSource::Registration, SignalType::Registered, 50),
                (SignalSource::System, SignalType::Absent, 80),
            ]
        );

        let overridden_by_scan = ingestor.ingest(&SourceSnapshot {
            registration: Some(registration(true, Some(AttendanceStatus::Absent))),
            attendance: Some(attendance(None, true)),
            ..Default::default()
        });
        assert_eq!(
            kinds(&overridden_by_scan),
            [
                (SignalSource::Registration, SignalType::Registered, 50),
                (SignalSource::AttendanceScanner, SignalType::Present, 95),
            ]
        );
    }

    #[test]
    fn revoked_or_invalid_certificates_become_revocations() {
        let policy = TrustPolicy::default();
        let ingestor = SignalIngestor::new(&policy);

        for cert in [
            certificate(CertificateStatus::Revoked, true),
            certificate(CertificateStatus::Sent, false),
        ] {
            let signals = ingestor.ingest(&SourceSnapshot {
                certificate: Some(cert),
                ..Default::default()
            });
            assert_eq!(
                kinds(&signals),
                [(SignalSource::Certificate, SignalType::CertificateRevoked, 90)]
            );
        }

        let issued = ingestor.ingest(&SourceSnapshot {
            certificate: Some(certificate(CertificateStatus::Generated, true)),
            ..Default::default()
        });
        assert_eq!(
            kinds(&issued),
            [(SignalSource::Certificate, SignalType::CertificateIssued, 90)]
        );
        assert_eq!(issued[0].metadata.get("status").map(String::as_str), Some("GENERATED"));
    }

    #[test]
    fn invalid_registration_is_an_organizer_invalidation() {
        let policy = TrustPolicy::default();
        let signals = SignalIngestor::new(&policy).ingest(&SourceSnapshot {
            registration: Some(registration(false, None)),
            ..Default::default()
        });
        assert_eq!(
            kinds(&signals),
            [(SignalSource::OrganizerOverride, SignalType::Invalidated, 85)]
        );
        assert!(signals.iter().all(|s| s.is_active));
    }

    #[test]
    fn custom_policy_changes_trust() {
        let policy = TrustPolicy {
            registration: 10,
            ..TrustPolicy::default()
        };
        let signals = SignalIngestor::new(&policy).ingest(&SourceSnapshot {
            registration: Some(registration(true, None)),
            ..Default::default()
        });
        assert_eq!(signals[0].trust_score, 10);
    }
}
