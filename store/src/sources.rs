//! Signal source trait and the upstream record shapes it returns.
//!
//! Each source answers "latest record for (subject, event)". The records are
//! raw upstream data; turning them into weighted signals is the ingestor's job.

use reckon_types::{ActorId, ParticipantKey, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::SourceError;

/// Which upstream system a read went to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Registration,
    Attendance,
    Certificate,
    Roster,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registration => "registration",
            Self::Attendance => "attendance",
            Self::Certificate => "certificate",
            Self::Roster => "roster",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceStatus {
    Present,
    Absent,
}

/// Latest registration of a subject for an event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRecord {
    pub id: String,
    /// `false` when an organizer invalidated the registration.
    pub valid: bool,
    #[serde(default)]
    pub created_by: Option<ActorId>,
    pub created_at: Timestamp,
    /// Attendance as noted on the registration itself, e.g. an organizer
    /// marking a no-show without an attendance record.
    #[serde(default)]
    pub attendance_hint: Option<AttendanceStatus>,
}

/// Latest attendance mark for a subject at an event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: String,
    pub valid: bool,
    /// Set when a person marked attendance by hand; `None` for scanner marks.
    #[serde(default)]
    pub marked_by: Option<ActorId>,
    pub scanned_at: Timestamp,
    pub status: AttendanceStatus,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CertificateStatus {
    Generated,
    Sent,
    Downloaded,
    Revoked,
}

impl CertificateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generated => "GENERATED",
            Self::Sent => "SENT",
            Self::Downloaded => "DOWNLOADED",
            Self::Revoked => "REVOKED",
        }
    }
}

/// Latest certificate issued to a subject for an event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateRecord {
    pub id: String,
    pub valid: bool,
    pub status: CertificateStatus,
    #[serde(default)]
    pub issued_by: Option<ActorId>,
    pub issued_at: Timestamp,
    #[serde(default)]
    pub revoked_by: Option<ActorId>,
    #[serde(default)]
    pub revoked_at: Option<Timestamp>,
}

impl CertificateRecord {
    pub fn is_revoked(&self) -> bool {
        self.status == CertificateStatus::Revoked || !self.valid
    }
}

/// Read access to the independent evidence producers.
///
/// `Ok(None)` means "no record" (absence of evidence); `Err` means the
/// source could not be read and the pair's reconciliation must fail.
pub trait SignalSources {
    fn registration(&self, key: &ParticipantKey)
        -> Result<Option<RegistrationRecord>, SourceError>;

    fn attendance(&self, key: &ParticipantKey) -> Result<Option<AttendanceRecord>, SourceError>;

    fn certificate(&self, key: &ParticipantKey)
        -> Result<Option<CertificateRecord>, SourceError>;
}
