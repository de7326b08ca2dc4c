//! Signal sources and event directory served from a JSON document.
//!
//! The document is an export of the upstream systems:
//!
//! ```json
//! {
//!   "rosters": [{ "event": "hack-2026", "owner": "org-1", "team_leads": [] }],
//!   "registrations": [{ "email": "ada@example.org", "event": "hack-2026",
//!                       "record": { "id": "r1", "valid": true, "created_at": 100 } }],
//!   "attendance": [],
//!   "certificates": []
//! }
//! ```
//!
//! Every registration's subject is added to its event's roster.

use std::collections::HashMap;
use std::path::Path;

use reckon_store::{
    AttendanceRecord, CertificateRecord, EventDirectory, EventRoster, RegistrationRecord,
    SignalSources, SourceError,
};
use reckon_types::{Email, EventId, ParticipantKey};
use serde::{Deserialize, Serialize};

use crate::NodeError;

/// One upstream record addressed by `(email, event)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntry<T> {
    pub email: Email,
    pub event: EventId,
    pub record: T,
}

impl<T> SourceEntry<T> {
    fn key(&self) -> ParticipantKey {
        ParticipantKey::new(self.email.clone(), self.event.clone())
    }
}

/// On-disk shape of a snapshot file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotDocument {
    #[serde(default)]
    pub rosters: Vec<EventRoster>,
    #[serde(default)]
    pub registrations: Vec<SourceEntry<RegistrationRecord>>,
    #[serde(default)]
    pub attendance: Vec<SourceEntry<AttendanceRecord>>,
    #[serde(default)]
    pub certificates: Vec<SourceEntry<CertificateRecord>>,
}

/// Read-only, in-memory view of a [`SnapshotDocument`].
#[derive(Debug, Default)]
pub struct SnapshotSources {
    rosters: HashMap<EventId, EventRoster>,
    registrations: HashMap<ParticipantKey, RegistrationRecord>,
    attendance: HashMap<ParticipantKey, AttendanceRecord>,
    certificates: HashMap<ParticipantKey, CertificateRecord>,
}

impl SnapshotSources {
    pub fn from_json_file(path: &Path) -> Result<Self, NodeError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| NodeError::Snapshot(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(s: &str) -> Result<Self, NodeError> {
        let document: SnapshotDocument =
            serde_json::from_str(s).map_err(|e| NodeError::Snapshot(e.to_string()))?;
        Self::from_document(document)
    }

    /// Index a document. Duplicate entries, duplicate rosters and
    /// registrations for events without a roster are rejected.
    pub fn from_document(document: SnapshotDocument) -> Result<Self, NodeError> {
        let mut sources = Self::default();

        for roster in document.rosters {
            let event = roster.event.clone();
            if sources.rosters.insert(event.clone(), roster).is_some() {
                return Err(NodeError::Snapshot(format!("duplicate roster for {event}")));
            }
        }

        for entry in document.registrations {
            let key = entry.key();
            let roster = sources.rosters.get_mut(&key.event).ok_or_else(|| {
                NodeError::Snapshot(format!("registration {key} has no roster for its event"))
            })?;
            if !roster.registrants.contains(&key.email) {
                roster.registrants.push(key.email.clone());
            }
            insert_unique(&mut sources.registrations, key, entry.record, "registration")?;
        }
        for entry in document.attendance {
            insert_unique(&mut sources.attendance, entry.key(), entry.record, "attendance")?;
        }
        for entry in document.certificates {
            insert_unique(&mut sources.certificates, entry.key(), entry.record, "certificate")?;
        }

        tracing::debug!(
            rosters = sources.rosters.len(),
            registrations = sources.registrations.len(),
            attendance = sources.attendance.len(),
            certificates = sources.certificates.len(),
            "source snapshot loaded"
        );
        Ok(sources)
    }
}

fn insert_unique<T>(
    map: &mut HashMap<ParticipantKey, T>,
    key: ParticipantKey,
    record: T,
    what: &str,
) -> Result<(), NodeError> {
    if map.contains_key(&key) {
        return Err(NodeError::Snapshot(format!("duplicate {what} for {key}")));
    }
    map.insert(key, record);
    Ok(())
}

impl SignalSources for SnapshotSources {
    fn registration(
        &self,
        key: &ParticipantKey,
    ) -> Result<Option<RegistrationRecord>, SourceError> {
        Ok(self.registrations.get(key).cloned())
    }

    fn attendance(&self, key: &ParticipantKey) -> Result<Option<AttendanceRecord>, SourceError> {
        Ok(self.attendance.get(key).cloned())
    }

    fn certificate(
        &self,
        key: &ParticipantKey,
    ) -> Result<Option<CertificateRecord>, SourceError> {
        Ok(self.certificates.get(key).cloned())
    }
}

impl EventDirectory for SnapshotSources {
    fn roster(&self, event: &EventId) -> Result<Option<EventRoster>, SourceError> {
        Ok(self.rosters.get(event).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
        "rosters": [{ "event": "hack", "owner": "org", "team_leads": ["lead"] }],
        "registrations": [
            { "email": "Ada@Example.org", "event": "hack",
              "record": { "id": "r1", "valid": true, "created_at": 100 } },
            { "email": "bob@example.org", "event": "hack",
              "record": { "id": "r2", "valid": false, "created_at": 110 } }
        ],
        "attendance": [
            { "email": "ada@example.org", "event": "hack",
              "record": { "id": "a1", "valid": true, "scanned_at": 200, "status": "PRESENT" } }
        ],
        "certificates": [
            { "email": "ada@example.org", "event": "hack",
              "record": { "id": "c1", "valid": true, "status": "SENT", "issued_at": 300 } }
        ]
    }"#;

    fn key(email: &str) -> ParticipantKey {
        ParticipantKey::new(Email::parse(email).unwrap(), EventId::new("hack").unwrap())
    }

    #[test]
    fn serves_records_by_normalized_key() {
        let sources = SnapshotSources::from_json_str(DOC).unwrap();
        let ada = key("ada@example.org");
        assert_eq!(sources.registration(&ada).unwrap().unwrap().id, "r1");
        assert!(sources.attendance(&ada).unwrap().is_some());
        assert!(sources.certificate(&ada).unwrap().is_some());
        assert!(sources.attendance(&key("bob@example.org")).unwrap().is_none());
    }

    #[test]
    fn registrations_populate_roster() {
        let sources = SnapshotSources::from_json_str(DOC).unwrap();
        let roster = sources
            .roster(&EventId::new("hack").unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(roster.registrants.len(), 2);
        assert!(sources
            .roster(&EventId::new("other").unwrap())
            .unwrap()
            .is_none());
    }

    #[test]
    fn registration_without_roster_is_rejected() {
        let doc = r#"{ "registrations": [{ "email": "a@x.io", "event": "ghost",
            "record": { "id": "r", "valid": true, "created_at": 1 } }] }"#;
        assert!(matches!(
            SnapshotSources::from_json_str(doc),
            Err(NodeError::Snapshot(_))
        ));
    }

    #[test]
    fn duplicate_entries_are_rejected() {
        let doc = r#"{
            "rosters": [{ "event": "hack", "owner": "org" }],
            "attendance": [
                { "email": "a@x.io", "event": "hack",
                  "record": { "id": "a1", "valid": true, "scanned_at": 1, "status": "PRESENT" } },
                { "email": "A@x.io", "event": "hack",
                  "record": { "id": "a2", "valid": true, "scanned_at": 2, "status": "ABSENT" } }
            ]
        }"#;
        assert!(SnapshotSources::from_json_str(doc).is_err());
    }
}
