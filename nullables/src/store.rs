//! Nullable record store: thread-safe in-memory storage for testing.

use reckon_store::{ParticipationRecord, ParticipationStore, StoreError};
use reckon_types::{Email, EventId, ParticipantKey};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Mutex;

/// An in-memory participation store for testing.
/// Thread-safe for use with tokio's multi-threaded runtime.
///
/// Honors the optimistic version check of [`ParticipationStore::put_record`]
/// and can be told to fail writes for chosen subjects or to lose a number of
/// version races.
pub struct NullParticipationStore {
    records: Mutex<BTreeMap<(EventId, Email), ParticipationRecord>>,
    failing_writes: Mutex<HashSet<Email>>,
    forced_conflicts: AtomicU32,
    writes: AtomicU64,
}

impl NullParticipationStore {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(BTreeMap::new()),
            failing_writes: Mutex::new(HashSet::new()),
            forced_conflicts: AtomicU32::new(0),
            writes: AtomicU64::new(0),
        }
    }

    /// Every later write of a record for `email` fails with a backend error.
    pub fn fail_writes_for(&self, email: &Email) {
        self.failing_writes.lock().unwrap().insert(email.clone());
    }

    /// The next `n` writes fail with [`StoreError::VersionConflict`], as if
    /// another writer had raced ahead.
    pub fn force_version_conflicts(&self, n: u32) {
        self.forced_conflicts.store(n, Ordering::SeqCst);
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Store a record without any version check.
    pub fn insert(&self, record: ParticipationRecord) {
        self.records
            .lock()
            .unwrap()
            .insert((record.event.clone(), record.email.clone()), record);
    }
}

impl Default for NullParticipationStore {
    fn default() -> Self {
        Self::new()
    }
}

fn map_key(key: &ParticipantKey) -> (EventId, Email) {
    (key.event.clone(), key.email.clone())
}

impl ParticipationStore for NullParticipationStore {
    fn get_record(&self, key: &ParticipantKey) -> Result<Option<ParticipationRecord>, StoreError> {
        Ok(self.records.lock().unwrap().get(&map_key(key)).cloned())
    }

    fn put_record(
        &self,
        record: &ParticipationRecord,
        expected_version: Option<u64>,
    ) -> Result<(), StoreError> {
        if self.failing_writes.lock().unwrap().contains(&record.email) {
            return Err(StoreError::Backend(format!(
                "injected write failure for {}",
                record.email
            )));
        }

        let mut records = self.records.lock().unwrap();
        let key = (record.event.clone(), record.email.clone());
        let found = records.get(&key).map(ParticipationRecord::version);

        let forced = self
            .forced_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if forced || found != expected_version {
            return Err(StoreError::VersionConflict {
                key: record.key(),
                expected: expected_version,
                found,
            });
        }

        records.insert(key, record.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn list_event_records(&self, event: &EventId) -> Result<Vec<ParticipationRecord>, StoreError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|((e, _), _)| e == event)
            .map(|(_, r)| r.clone())
            .collect())
    }

    fn record_count(&self) -> Result<u64, StoreError> {
        Ok(self.records.lock().unwrap().len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reckon_types::Timestamp;

    fn key(email: &str, event: &str) -> ParticipantKey {
        ParticipantKey::new(Email::parse(email).unwrap(), EventId::new(event).unwrap())
    }

    #[test]
    fn create_requires_absent_record() {
        let store = NullParticipationStore::new();
        let mut record = ParticipationRecord::new(key("a@x.io", "ev"), Timestamp::new(1));
        record.reconciliation.reconciliation_version = 1;
        store.put_record(&record, None).unwrap();
        assert!(matches!(
            store.put_record(&record, None),
            Err(StoreError::VersionConflict { found: Some(1), .. })
        ));
    }

    #[test]
    fn update_checks_expected_version() {
        let store = NullParticipationStore::new();
        let mut record = ParticipationRecord::new(key("a@x.io", "ev"), Timestamp::new(1));
        record.reconciliation.reconciliation_version = 1;
        store.put_record(&record, None).unwrap();
        record.reconciliation.reconciliation_version = 2;
        assert!(store.put_record(&record, Some(7)).is_err());
        store.put_record(&record, Some(1)).unwrap();
        assert_eq!(store.get_record(&record.key()).unwrap().unwrap().version(), 2);
        assert_eq!(store.write_count(), 2);
    }

    #[test]
    fn lists_only_the_requested_event() {
        let store = NullParticipationStore::new();
        store.insert(ParticipationRecord::new(key("a@x.io", "one"), Timestamp::new(1)));
        store.insert(ParticipationRecord::new(key("b@x.io", "one"), Timestamp::new(1)));
        store.insert(ParticipationRecord::new(key("a@x.io", "two"), Timestamp::new(1)));
        let one = store.list_event_records(&EventId::new("one").unwrap()).unwrap();
        assert_eq!(one.len(), 2);
        assert_eq!(store.record_count().unwrap(), 3);
    }

    #[test]
    fn injected_failures() {
        let store = NullParticipationStore::new();
        let record = ParticipationRecord::new(key("a@x.io", "ev"), Timestamp::new(1));
        store.force_version_conflicts(1);
        assert!(store.put_record(&record, None).is_err());
        store.put_record(&record, None).unwrap();

        store.fail_writes_for(&record.email);
        assert!(matches!(
            store.put_record(&record, Some(0)),
            Err(StoreError::Backend(_))
        ));
    }
}
