//! Read-side views: public status, filtered listings, per-event statistics.

use std::collections::BTreeMap;

use reckon_store::{ParticipationRecord, RecordFlags, StatusBreakdown};
use reckon_types::{CanonicalStatus, Email, EventId, ResolutionStrategy, Timestamp};
use serde::{Deserialize, Serialize};

/// Public view of one record. Safe to expose without authorization; it backs
/// certificate verification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusView {
    pub email: Email,
    pub event: EventId,
    pub canonical_status: CanonicalStatus,
    pub confidence_score: u8,
    pub flags: RecordFlags,
    pub status_breakdown: StatusBreakdown,
    pub resolution_strategy: ResolutionStrategy,
    pub is_overridden: bool,
    pub last_reconciled_at: Option<Timestamp>,
    pub reconciliation_version: u64,
}

impl From<&ParticipationRecord> for StatusView {
    fn from(record: &ParticipationRecord) -> Self {
        Self {
            email: record.email.clone(),
            event: record.event.clone(),
            canonical_status: record.canonical_status,
            confidence_score: record.reconciliation.confidence_score,
            flags: record.flags,
            status_breakdown: record.status_breakdown,
            resolution_strategy: record.reconciliation.resolution_strategy,
            is_overridden: record.manual_override.is_overridden,
            last_reconciled_at: record.reconciliation.last_reconciled_at,
            reconciliation_version: record.reconciliation.reconciliation_version,
        }
    }
}

/// Listing filter; `None` fields match everything.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFilter {
    pub status: Option<CanonicalStatus>,
    pub requires_review: Option<bool>,
    pub suspicious: Option<bool>,
    pub verified: Option<bool>,
}

impl RecordFilter {
    pub fn matches(&self, record: &ParticipationRecord) -> bool {
        fn check(want: Option<bool>, have: bool) -> bool {
            want.map_or(true, |w| w == have)
        }
        self.status.map_or(true, |s| s == record.canonical_status)
            && check(self.requires_review, record.flags.requires_manual_review)
            && check(self.suspicious, record.flags.is_suspicious)
            && check(self.verified, record.flags.is_verified)
    }
}

/// Counts of one event's records.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventStats {
    pub event: EventId,
    pub total: u64,
    /// Every canonical status appears, with zero for unused ones.
    pub by_status: BTreeMap<CanonicalStatus, u64>,
    pub with_conflicts: u64,
    pub requires_review: u64,
    pub suspicious: u64,
    pub verified: u64,
    pub overridden: u64,
}

impl EventStats {
    pub fn from_records(event: EventId, records: &[ParticipationRecord]) -> Self {
        let mut by_status: BTreeMap<CanonicalStatus, u64> =
            CanonicalStatus::ALL.iter().map(|s| (*s, 0)).collect();
        let mut stats = Self {
            event,
            total: 0,
            by_status: BTreeMap::new(),
            with_conflicts: 0,
            requires_review: 0,
            suspicious: 0,
            verified: 0,
            overridden: 0,
        };
        for record in records {
            stats.total += 1;
            *by_status.entry(record.canonical_status).or_insert(0) += 1;
            stats.with_conflicts += u64::from(record.flags.has_conflicts);
            stats.requires_review += u64::from(record.flags.requires_manual_review);
            stats.suspicious += u64::from(record.flags.is_suspicious);
            stats.verified += u64::from(record.flags.is_verified);
            stats.overridden += u64::from(record.manual_override.is_overridden);
        }
        stats.by_status = by_status;
        stats
    }

    pub fn count(&self, status: CanonicalStatus) -> u64 {
        self.by_status.get(&status).copied().unwrap_or(0)
    }
}
