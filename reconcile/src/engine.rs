//! The reconciliation engine: automatic passes, manual overrides, queries.
//!
//! One automatic pass for `(email, event)` reads every signal source, merges
//! the observed signals into the record's history, assesses the active set
//! and writes the record back as a single versioned update. Writes are
//! optimistic; a pass that loses a version race re-reads and recomputes.

use std::collections::BTreeSet;
use std::sync::Arc;

use reckon_store::{
    EventDirectory, ParticipationRecord, ParticipationStore, SignalSources, StoreError,
};
use reckon_types::{
    Actor, CanonicalStatus, Email, EventId, ParticipantKey, ResolutionStrategy, Signal,
    Timestamp, TrustPolicy,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::authorization::authorize_override;
use crate::history::merge_signals;
use crate::{
    Assessment, Assessor, BatchSummary, EventStats, ReconcileError, RecordFilter, SignalIngestor,
    SourceSnapshot, StatusView,
};

/// Behavioural knobs of the engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Keep an overridden status pinned across automatic passes. When `false`
    /// the next automatic pass replaces the overridden status.
    pub respect_manual_override: bool,
    /// Superseded signals retained per record.
    pub signal_history_limit: usize,
    /// Read-compute-write attempts before giving up on a contended record.
    pub max_write_attempts: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            respect_manual_override: true,
            signal_history_limit: 20,
            max_write_attempts: 3,
        }
    }
}

/// Result of one automatic pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileSummary {
    pub email: Email,
    pub event: EventId,
    pub canonical_status: CanonicalStatus,
    pub confidence_score: u8,
    pub conflict_count: usize,
    /// Active signals after the pass.
    pub signal_count: usize,
    pub requires_manual_review: bool,
    pub reconciliation_version: u64,
}

impl ReconcileSummary {
    fn of(record: &ParticipationRecord) -> Self {
        Self {
            email: record.email.clone(),
            event: record.event.clone(),
            canonical_status: record.canonical_status,
            confidence_score: record.reconciliation.confidence_score,
            conflict_count: record.reconciliation.conflicts.len(),
            signal_count: record.active_signals().count(),
            requires_manual_review: record.flags.requires_manual_review,
            reconciliation_version: record.version(),
        }
    }
}

/// Reconciles participation records held in `S` from evidence served by `U`.
pub struct ReconciliationEngine<S, U> {
    store: Arc<S>,
    upstream: Arc<U>,
    policy: TrustPolicy,
    settings: EngineSettings,
}

impl<S, U> ReconciliationEngine<S, U>
where
    S: ParticipationStore,
    U: SignalSources + EventDirectory,
{
    pub fn new(store: Arc<S>, upstream: Arc<U>, policy: TrustPolicy) -> Self {
        Self {
            store,
            upstream,
            policy,
            settings: EngineSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn policy(&self) -> &TrustPolicy {
        &self.policy
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn upstream(&self) -> &Arc<U> {
        &self.upstream
    }

    // ── Automatic path ──────────────────────────────────────────────────

    /// Read every source for `key`. A failing read aborts with
    /// [`ReconcileError::Source`]; missing records are not errors.
    pub fn fetch_snapshot(&self, key: &ParticipantKey) -> Result<SourceSnapshot, ReconcileError> {
        SourceSnapshot::fetch(self.upstream.as_ref(), key).map_err(|source| {
            ReconcileError::Source {
                key: key.clone(),
                source,
            }
        })
    }

    /// Run one full automatic pass for `key`, creating the record if needed.
    ///
    /// On a source failure the stored record is left untouched.
    pub fn reconcile(
        &self,
        key: &ParticipantKey,
        now: Timestamp,
    ) -> Result<ReconcileSummary, ReconcileError> {
        let snapshot = self.fetch_snapshot(key)?;
        self.apply_snapshot(key, &snapshot, now)
    }

    /// Apply an already-fetched snapshot to the stored record.
    pub fn apply_snapshot(
        &self,
        key: &ParticipantKey,
        snapshot: &SourceSnapshot,
        now: Timestamp,
    ) -> Result<ReconcileSummary, ReconcileError> {
        let observed = SignalIngestor::new(&self.policy).ingest(snapshot);
        let record = self.update_with_retry(key, |current| {
            let mut record =
                current.unwrap_or_else(|| ParticipationRecord::new(key.clone(), now));
            self.apply_pass(&mut record, observed.clone(), now);
            Ok(record)
        })?;

        let summary = ReconcileSummary::of(&record);
        if summary.conflict_count > 0 {
            warn!(
                email = %key.email,
                event = %key.event,
                conflicts = summary.conflict_count,
                status = %summary.canonical_status,
                "reconciliation detected conflicts"
            );
        }
        info!(
            email = %key.email,
            event = %key.event,
            status = %summary.canonical_status,
            confidence = summary.confidence_score,
            version = summary.reconciliation_version,
            "participation reconciled"
        );
        Ok(summary)
    }

    fn apply_pass(&self, record: &mut ParticipationRecord, observed: Vec<Signal>, now: Timestamp) {
        record.signals =
            merge_signals(&record.signals, observed, self.settings.signal_history_limit);

        let Assessment {
            conflicts,
            resolution,
            confidence,
            mut flags,
            ..
        } = Assessor::new(&self.policy).assess(&record.signals, now);

        let overridden = record.manual_override.is_overridden;
        if overridden && self.settings.respect_manual_override {
            flags.requires_manual_review = false;
            record.reconciliation.resolution_strategy = ResolutionStrategy::ManualOverride;
            record.reconciliation.notes = format!(
                "automatic resolution {} held back by manual override ({})",
                resolution.status, resolution.notes
            );
        } else {
            if overridden && record.canonical_status != resolution.status {
                warn!(
                    email = %record.email,
                    event = %record.event,
                    overridden = %record.canonical_status,
                    automatic = %resolution.status,
                    "automatic pass replaced a manually overridden status"
                );
            }
            record.canonical_status = resolution.status;
            record.reconciliation.resolution_strategy = resolution.strategy;
            record.reconciliation.notes = resolution.notes.clone();
        }

        record.status_breakdown = resolution.breakdown();
        record.flags = flags;
        record.reconciliation.conflicts = conflicts;
        record.reconciliation.confidence_score = confidence;
        record.reconciliation.last_reconciled_at = Some(now);
    }

    /// Reconcile every registrant of `event`, one after another.
    ///
    /// Individual failures are counted and logged; the batch always runs to
    /// completion. Fails only when the event roster itself cannot be read.
    pub fn reconcile_event(
        &self,
        event: &EventId,
        now: Timestamp,
    ) -> Result<BatchSummary, ReconcileError> {
        let registrants = self.registrants(event)?;
        let mut batch = BatchSummary::new(event.clone());

        for email in registrants {
            let key = ParticipantKey::new(email.clone(), event.clone());
            match self.reconcile(&key, now) {
                Ok(summary) => batch.record_success(&summary),
                Err(e) => {
                    warn!(email = %email, event = %event, error = %e, "reconciliation failed");
                    batch.record_failure(email, &e);
                }
            }
        }

        info!(
            event = %event,
            total = batch.total,
            reconciled = batch.reconciled,
            failed = batch.failed,
            conflicts = batch.conflicts,
            requires_review = batch.requires_review,
            "event reconciliation finished"
        );
        Ok(batch)
    }

    /// Distinct registrants of `event`, in email order.
    pub fn registrants(&self, event: &EventId) -> Result<Vec<Email>, ReconcileError> {
        let roster = self
            .upstream
            .roster(event)
            .map_err(|source| ReconcileError::Directory {
                event: event.clone(),
                source,
            })?
            .ok_or_else(|| ReconcileError::UnknownEvent(event.clone()))?;
        let unique: BTreeSet<Email> = roster.registrants.into_iter().collect();
        Ok(unique.into_iter().collect())
    }

    // ── Manual path ─────────────────────────────────────────────────────

    /// Force the canonical status of an existing record.
    ///
    /// Checks authorization, then validates `new_status` and `reason`, all
    /// before touching the store. A record must already exist.
    pub fn override_status(
        &self,
        key: &ParticipantKey,
        new_status: &str,
        actor: &Actor,
        reason: &str,
        now: Timestamp,
    ) -> Result<ParticipationRecord, ReconcileError> {
        self.authorize(actor, &key.event)?;
        let status: CanonicalStatus = new_status
            .trim()
            .parse()
            .map_err(|_| ReconcileError::InvalidStatus(new_status.to_string()))?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ReconcileError::MissingReason);
        }

        let record = self.update_with_retry(key, |current| {
            let mut record = current.ok_or_else(|| ReconcileError::NotFound(key.clone()))?;
            let previous = record.canonical_status;
            record.canonical_status = status;
            record.manual_override.is_overridden = true;
            record.manual_override.overridden_by = Some(actor.id.clone());
            record.manual_override.overridden_at = Some(now);
            record.manual_override.override_reason = Some(reason.to_string());
            record.manual_override.previous_status = Some(previous);
            record.flags.requires_manual_review = false;
            record.reconciliation.resolution_strategy = ResolutionStrategy::ManualOverride;
            record.reconciliation.notes =
                format!("status set from {previous} to {status} by {}: {reason}", actor.id);
            Ok(record)
        })?;

        info!(
            email = %key.email,
            event = %key.event,
            actor = %actor.id,
            previous = ?record.manual_override.previous_status,
            status = %record.canonical_status,
            version = record.version(),
            "participation status overridden"
        );
        Ok(record)
    }

    /// Release a manual override and restore the automatically resolved
    /// status from the record's current active signals.
    pub fn clear_override(
        &self,
        key: &ParticipantKey,
        actor: &Actor,
        now: Timestamp,
    ) -> Result<ParticipationRecord, ReconcileError> {
        self.authorize(actor, &key.event)?;

        let record = self.update_with_retry(key, |current| {
            let mut record = current.ok_or_else(|| ReconcileError::NotFound(key.clone()))?;
            if !record.manual_override.is_overridden {
                return Err(ReconcileError::NotOverridden(key.clone()));
            }
            let assessment = Assessor::new(&self.policy).assess(&record.signals, now);
            record.manual_override.is_overridden = false;
            record.canonical_status = assessment.resolution.status;
            record.status_breakdown = assessment.resolution.breakdown();
            record.flags = assessment.flags;
            record.reconciliation.conflicts = assessment.conflicts;
            record.reconciliation.confidence_score = assessment.confidence;
            record.reconciliation.resolution_strategy = assessment.resolution.strategy;
            record.reconciliation.notes = format!(
                "manual override cleared by {}; {}",
                actor.id, assessment.resolution.notes
            );
            record.reconciliation.last_reconciled_at = Some(now);
            Ok(record)
        })?;

        info!(
            email = %key.email,
            event = %key.event,
            actor = %actor.id,
            status = %record.canonical_status,
            "manual override cleared"
        );
        Ok(record)
    }

    fn authorize(&self, actor: &Actor, event: &EventId) -> Result<(), ReconcileError> {
        if actor.is_platform_admin() {
            return authorize_override(actor, event, None);
        }
        let roster = self
            .upstream
            .roster(event)
            .map_err(|source| ReconcileError::Directory {
                event: event.clone(),
                source,
            })?;
        authorize_override(actor, event, roster.as_ref())
    }

    // ── Queries ─────────────────────────────────────────────────────────

    pub fn get_status(&self, key: &ParticipantKey) -> Result<Option<StatusView>, ReconcileError> {
        Ok(self.store.get_record(key)?.as_ref().map(StatusView::from))
    }

    pub fn get_record(
        &self,
        key: &ParticipantKey,
    ) -> Result<Option<ParticipationRecord>, ReconcileError> {
        Ok(self.store.get_record(key)?)
    }

    pub fn list_records(
        &self,
        event: &EventId,
        filter: &RecordFilter,
    ) -> Result<Vec<ParticipationRecord>, ReconcileError> {
        let mut records = self.store.list_event_records(event)?;
        records.retain(|r| filter.matches(r));
        Ok(records)
    }

    pub fn event_stats(&self, event: &EventId) -> Result<EventStats, ReconcileError> {
        let records = self.store.list_event_records(event)?;
        Ok(EventStats::from_records(event.clone(), &records))
    }

    // ── Store plumbing ──────────────────────────────────────────────────

    /// Read the record, let `mutate` produce its next state, bump the
    /// version and write it back guarded by the version that was read.
    /// Lost races are retried from a fresh read.
    fn update_with_retry<F>(
        &self,
        key: &ParticipantKey,
        mutate: F,
    ) -> Result<ParticipationRecord, ReconcileError>
    where
        F: Fn(Option<ParticipationRecord>) -> Result<ParticipationRecord, ReconcileError>,
    {
        let attempts = self.settings.max_write_attempts.max(1);
        for attempt in 1..=attempts {
            let current = self.store.get_record(key)?;
            let expected = current.as_ref().map(ParticipationRecord::version);
            let mut record = mutate(current)?;
            record.reconciliation.reconciliation_version = expected.unwrap_or(0) + 1;

            match self.store.put_record(&record, expected) {
                Ok(()) => return Ok(record),
                Err(StoreError::VersionConflict { found, .. }) => {
                    debug!(
                        email = %key.email,
                        event = %key.event,
                        attempt,
                        expected = ?expected,
                        found = ?found,
                        "lost version race, retrying"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(ReconcileError::WriteContention {
            key: key.clone(),
            attempts,
        })
    }
}
