//! The participation record: durable output of reconciliation.
//!
//! The field layout and enum spellings are a durable contract: public
//! certificate verification and statistics dashboards read
//! `canonical_status` bit-exact.

use reckon_types::{
    ActorId, CanonicalStatus, ConflictType, Email, EventId, ParticipantKey, ResolutionStrategy,
    Signal, Timestamp,
};
use serde::{Deserialize, Serialize};

/// A logical inconsistency detected between active signals.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub conflict_type: ConflictType,
    pub description: String,
    pub detected_at: Timestamp,
}

/// Bookkeeping of the most recent reconciliation pass.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationMeta {
    pub last_reconciled_at: Option<Timestamp>,
    /// Strictly increases on every automatic pass and every override.
    pub reconciliation_version: u64,
    /// 0–100.
    pub confidence_score: u8,
    pub conflicts: Vec<Conflict>,
    pub resolution_strategy: ResolutionStrategy,
    pub notes: String,
}

/// Derived flags. Never set by clients.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFlags {
    pub has_conflicts: bool,
    pub requires_manual_review: bool,
    pub is_suspicious: bool,
    pub is_verified: bool,
}

/// Denormalized booleans for fast filtering.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusBreakdown {
    pub is_registered: bool,
    pub has_attendance: bool,
    pub has_certificate: bool,
    pub is_revoked: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualOverride {
    pub is_overridden: bool,
    pub overridden_by: Option<ActorId>,
    pub overridden_at: Option<Timestamp>,
    pub override_reason: Option<String>,
    /// Status immediately before the override took effect.
    pub previous_status: Option<CanonicalStatus>,
}

/// Aggregate root, unique per `(email, event)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipationRecord {
    pub email: Email,
    pub event: EventId,
    /// Current signals plus superseded history (`is_active = false`).
    pub signals: Vec<Signal>,
    pub canonical_status: CanonicalStatus,
    pub reconciliation: ReconciliationMeta,
    pub flags: RecordFlags,
    pub status_breakdown: StatusBreakdown,
    pub manual_override: ManualOverride,
    pub created_at: Timestamp,
}

impl ParticipationRecord {
    /// A fresh record with no passes applied yet (version 0).
    pub fn new(key: ParticipantKey, now: Timestamp) -> Self {
        Self {
            email: key.email,
            event: key.event,
            signals: Vec::new(),
            canonical_status: CanonicalStatus::default(),
            reconciliation: ReconciliationMeta::default(),
            flags: RecordFlags::default(),
            status_breakdown: StatusBreakdown::default(),
            manual_override: ManualOverride::default(),
            created_at: now,
        }
    }

    pub fn key(&self) -> ParticipantKey {
        ParticipantKey::new(self.email.clone(), self.event.clone())
    }

    pub fn version(&self) -> u64 {
        self.reconciliation.reconciliation_version
    }

    pub fn active_signals(&self) -> impl Iterator<Item = &Signal> {
        self.signals.iter().filter(|s| s.is_active)
    }
}
