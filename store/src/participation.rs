//! Participation record storage trait.

use reckon_types::{EventId, ParticipantKey};

use crate::{ParticipationRecord, StoreError};

/// Durable home of [`ParticipationRecord`]s, one per `(email, event)`.
///
/// Writes are optimistic: `expected_version` is the
/// `reconciliation_version` the caller read (or `None` when it saw no record).
/// A backend must reject the write with [`StoreError::VersionConflict`] when
/// the stored version differs, so a stale pass never clobbers a newer one.
pub trait ParticipationStore {
    /// Fetch the record for a pair, if one has been created.
    fn get_record(&self, key: &ParticipantKey) -> Result<Option<ParticipationRecord>, StoreError>;

    /// Insert or replace a record, guarded by the version the caller read.
    fn put_record(
        &self,
        record: &ParticipationRecord,
        expected_version: Option<u64>,
    ) -> Result<(), StoreError>;

    /// All records of one event, ordered by email.
    fn list_event_records(&self, event: &EventId) -> Result<Vec<ParticipationRecord>, StoreError>;

    /// Total number of records across all events.
    fn record_count(&self) -> Result<u64, StoreError>;
}
