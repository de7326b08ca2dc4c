//! Nullable signal sources and event directory: in-memory upstream systems.

use reckon_store::{
    AttendanceRecord, CertificateRecord, EventDirectory, EventRoster, RegistrationRecord,
    SignalSources, SourceError, SourceKind,
};
use reckon_types::{ActorId, EventId, ParticipantKey};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// In-memory registration, attendance and certificate sources plus event
/// rosters, with programmable failures and read delays.
pub struct NullSources {
    registrations: Mutex<HashMap<ParticipantKey, RegistrationRecord>>,
    attendance: Mutex<HashMap<ParticipantKey, AttendanceRecord>>,
    certificates: Mutex<HashMap<ParticipantKey, CertificateRecord>>,
    rosters: Mutex<HashMap<EventId, EventRoster>>,
    failures: Mutex<HashMap<(ParticipantKey, SourceKind), String>>,
    roster_failures: Mutex<HashMap<EventId, String>>,
    delays: Mutex<HashMap<SourceKind, Duration>>,
    reads: AtomicU64,
}

impl NullSources {
    /// Owner assigned to rosters created implicitly by [`Self::put_registration`].
    pub const DEFAULT_OWNER: &'static str = "organizer";

    pub fn new() -> Self {
        Self {
            registrations: Mutex::new(HashMap::new()),
            attendance: Mutex::new(HashMap::new()),
            certificates: Mutex::new(HashMap::new()),
            rosters: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
            roster_failures: Mutex::new(HashMap::new()),
            delays: Mutex::new(HashMap::new()),
            reads: AtomicU64::new(0),
        }
    }

    /// Store a registration and list its subject on the event roster,
    /// creating the roster (owned by [`Self::DEFAULT_OWNER`]) if needed.
    pub fn put_registration(&self, key: &ParticipantKey, record: RegistrationRecord) {
        self.registrations.lock().unwrap().insert(key.clone(), record);
        let mut rosters = self.rosters.lock().unwrap();
        let roster = rosters
            .entry(key.event.clone())
            .or_insert_with(|| EventRoster {
                event: key.event.clone(),
                owner: ActorId::new(Self::DEFAULT_OWNER),
                team_leads: Vec::new(),
                registrants: Vec::new(),
            });
        if !roster.registrants.contains(&key.email) {
            roster.registrants.push(key.email.clone());
        }
    }

    pub fn put_attendance(&self, key: &ParticipantKey, record: AttendanceRecord) {
        self.attendance.lock().unwrap().insert(key.clone(), record);
    }

    pub fn put_certificate(&self, key: &ParticipantKey, record: CertificateRecord) {
        self.certificates.lock().unwrap().insert(key.clone(), record);
    }

    pub fn remove_attendance(&self, key: &ParticipantKey) {
        self.attendance.lock().unwrap().remove(key);
    }

    pub fn remove_certificate(&self, key: &ParticipantKey) {
        self.certificates.lock().unwrap().remove(key);
    }

    /// Replace an event's roster wholesale.
    pub fn put_roster(&self, roster: EventRoster) {
        self.rosters
            .lock()
            .unwrap()
            .insert(roster.event.clone(), roster);
    }

    /// Reads of `kind` for `key` fail until [`Self::heal`] is called.
    pub fn fail_source(&self, key: &ParticipantKey, kind: SourceKind, reason: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert((key.clone(), kind), reason.to_string());
    }

    /// Roster reads for `event` fail.
    pub fn fail_roster(&self, event: &EventId, reason: &str) {
        self.roster_failures
            .lock()
            .unwrap()
            .insert(event.clone(), reason.to_string());
    }

    /// Remove every injected failure.
    pub fn heal(&self) {
        self.failures.lock().unwrap().clear();
        self.roster_failures.lock().unwrap().clear();
    }

    /// Every read of `kind` blocks the calling thread for `delay` first.
    pub fn delay_source(&self, kind: SourceKind, delay: Duration) {
        self.delays.lock().unwrap().insert(kind, delay);
    }

    /// Total source reads served (including failed ones).
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }

    fn before_read(&self, key: &ParticipantKey, kind: SourceKind) -> Result<(), SourceError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let delay = self.delays.lock().unwrap().get(&kind).copied();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        match self.failures.lock().unwrap().get(&(key.clone(), kind)) {
            Some(reason) => Err(SourceError::Unavailable {
                kind,
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl Default for NullSources {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalSources for NullSources {
    fn registration(
        &self,
        key: &ParticipantKey,
    ) -> Result<Option<RegistrationRecord>, SourceError> {
        self.before_read(key, SourceKind::Registration)?;
        Ok(self.registrations.lock().unwrap().get(key).cloned())
    }

    fn attendance(&self, key: &ParticipantKey) -> Result<Option<AttendanceRecord>, SourceError> {
        self.before_read(key, SourceKind::Attendance)?;
        Ok(self.attendance.lock().unwrap().get(key).cloned())
    }

    fn certificate(&self, key: &ParticipantKey) -> Result<Option<CertificateRecord>, SourceError> {
        self.before_read(key, SourceKind::Certificate)?;
        Ok(self.certificates.lock().unwrap().get(key).cloned())
    }
}

impl EventDirectory for NullSources {
    fn roster(&self, event: &EventId) -> Result<Option<EventRoster>, SourceError> {
        if let Some(reason) = self.roster_failures.lock().unwrap().get(event) {
            return Err(SourceError::Unavailable {
                kind: SourceKind::Roster,
                reason: reason.clone(),
            });
        }
        Ok(self.rosters.lock().unwrap().get(event).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reckon_types::{Email, Timestamp};

    fn key() -> ParticipantKey {
        ParticipantKey::new(
            Email::parse("ada@example.org").unwrap(),
            EventId::new("hack").unwrap(),
        )
    }

    fn registration() -> RegistrationRecord {
        RegistrationRecord {
            id: "r1".into(),
            valid: true,
            created_by: None,
            created_at: Timestamp::new(1),
            attendance_hint: None,
        }
    }

    #[test]
    fn registration_populates_roster_once() {
        let sources = NullSources::new();
        sources.put_registration(&key(), registration());
        sources.put_registration(&key(), registration());
        let roster = sources.roster(&key().event).unwrap().unwrap();
        assert_eq!(roster.registrants, vec![key().email]);
        assert_eq!(roster.owner, ActorId::new(NullSources::DEFAULT_OWNER));
    }

    #[test]
    fn missing_records_are_none() {
        let sources = NullSources::new();
        assert!(sources.attendance(&key()).unwrap().is_none());
        assert!(sources.roster(&key().event).unwrap().is_none());
    }

    #[test]
    fn injected_failure_until_healed() {
        let sources = NullSources::new();
        sources.fail_source(&key(), SourceKind::Certificate, "down");
        let err = sources.certificate(&key()).unwrap_err();
        assert_eq!(err.kind(), SourceKind::Certificate);
        sources.heal();
        assert!(sources.certificate(&key()).is_ok());
        assert_eq!(sources.read_count(), 2);
    }
}
