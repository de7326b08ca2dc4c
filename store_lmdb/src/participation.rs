//! LMDB implementation of ParticipationStore.
//!
//! Key format: `event_id ++ 0x00 ++ email` (binary composite key). Neither
//! part may contain a NUL byte, so a prefix scan over `event_id ++ 0x00`
//! returns exactly one event's records, ordered by email.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use reckon_store::{ParticipationRecord, ParticipationStore, StoreError};
use reckon_types::{EventId, ParticipantKey};

use crate::LmdbError;

const SEPARATOR: u8 = 0;

pub struct LmdbParticipationStore {
    pub(crate) env: Arc<Env>,
    pub(crate) records_db: Database<Bytes, Bytes>,
}

fn event_prefix(event: &EventId) -> Vec<u8> {
    let event = event.as_str().as_bytes();
    let mut prefix = Vec::with_capacity(event.len() + 1);
    prefix.extend_from_slice(event);
    prefix.push(SEPARATOR);
    prefix
}

fn record_key(key: &ParticipantKey) -> Vec<u8> {
    let mut bytes = event_prefix(&key.event);
    bytes.extend_from_slice(key.email.as_str().as_bytes());
    bytes
}

fn decode(bytes: &[u8]) -> Result<ParticipationRecord, LmdbError> {
    Ok(bincode::deserialize(bytes)?)
}

impl ParticipationStore for LmdbParticipationStore {
    fn get_record(&self, key: &ParticipantKey) -> Result<Option<ParticipationRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .records_db
            .get(&rtxn, &record_key(key))
            .map_err(LmdbError::from)?;
        Ok(val.map(decode).transpose()?)
    }

    fn put_record(
        &self,
        record: &ParticipationRecord,
        expected_version: Option<u64>,
    ) -> Result<(), StoreError> {
        let key = record.key();
        let raw_key = record_key(&key);
        let bytes = bincode::serialize(record).map_err(LmdbError::from)?;

        // The version check and the write share one write transaction, so
        // LMDB's single-writer lock makes them atomic.
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let found = self
            .records_db
            .get(&wtxn, &raw_key)
            .map_err(LmdbError::from)?
            .map(decode)
            .transpose()?
            .map(|r| r.version());
        if found != expected_version {
            // Dropping the transaction aborts it.
            return Err(StoreError::VersionConflict {
                key,
                expected: expected_version,
                found,
            });
        }
        self.records_db
            .put(&mut wtxn, &raw_key, &bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;

        tracing::trace!(key = %key, version = record.version(), "participation record written");
        Ok(())
    }

    fn list_event_records(&self, event: &EventId) -> Result<Vec<ParticipationRecord>, StoreError> {
        let prefix = event_prefix(event);
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let iter = self
            .records_db
            .prefix_iter(&rtxn, &prefix)
            .map_err(LmdbError::from)?;
        let mut results = Vec::new();
        for result in iter {
            let (_key, val) = result.map_err(LmdbError::from)?;
            results.push(decode(val)?);
        }
        Ok(results)
    }

    fn record_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let count = self.records_db.len(&rtxn).map_err(LmdbError::from)?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reckon_types::Email;

    #[test]
    fn keys_group_by_event() {
        let event = EventId::new("ev").unwrap();
        let key = ParticipantKey::new(Email::parse("a@x.io").unwrap(), event.clone());
        let raw = record_key(&key);
        assert!(raw.starts_with(&event_prefix(&event)));
        assert_eq!(raw, b"ev\0a@x.io".to_vec());
    }

    #[test]
    fn event_prefix_does_not_match_longer_event_ids() {
        let short = event_prefix(&EventId::new("ev").unwrap());
        let long = record_key(&ParticipantKey::new(
            Email::parse("a@x.io").unwrap(),
            EventId::new("ev2").unwrap(),
        ));
        assert!(!long.starts_with(&short));
    }
}
