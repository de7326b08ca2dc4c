//! The reckon node: one LMDB record store, one engine, one worker pool.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use reckon_reconcile::{
    BatchSummary, EventStats, ReconcileSummary, ReconciliationEngine, RecordFilter, StatusView,
};
use reckon_store::{EventDirectory, ParticipationRecord, ParticipationStore, SignalSources};
use reckon_store_lmdb::{LmdbEnvironment, LmdbParticipationStore};
use reckon_types::{Actor, ActorId, EventId, ParticipantKey, Timestamp};
use tracing::info;

use crate::tracing_spans::override_span;
use crate::{
    NodeConfig, NodeError, ReconcileMetrics, ReconcileScheduler, ScanSession, ScanSessionStore,
    ShutdownController,
};

pub type LmdbEngine<U> = ReconciliationEngine<LmdbParticipationStore, U>;

pub struct ReckonNode<U> {
    config: NodeConfig,
    environment: LmdbEnvironment,
    scheduler: ReconcileScheduler<LmdbParticipationStore, U>,
    metrics: Option<Arc<ReconcileMetrics>>,
    sessions: Mutex<ScanSessionStore>,
    shutdown: ShutdownController,
}

impl<U> ReckonNode<U>
where
    U: SignalSources + EventDirectory + Send + Sync + 'static,
{
    /// Open the record store under `config.data_dir` and start the worker
    /// pool. Must be called from within a tokio runtime.
    pub fn start(config: NodeConfig, upstream: Arc<U>) -> Result<Self, NodeError> {
        config.validate()?;
        let environment = LmdbEnvironment::open(&config.data_dir, config.map_size)?;
        let store = Arc::new(environment.participation_store());

        let engine = Arc::new(
            ReconciliationEngine::new(store, upstream, config.trust.clone())
                .with_settings(config.engine_settings()),
        );
        let metrics = if config.enable_metrics {
            Some(Arc::new(ReconcileMetrics::new()?))
        } else {
            None
        };
        let shutdown = ShutdownController::new();
        let scheduler = ReconcileScheduler::start(
            engine,
            &config.scheduler_config(),
            metrics.clone(),
            &shutdown,
        );
        let sessions = Mutex::new(ScanSessionStore::new(
            config.session_ttl_secs,
            config.session_capacity,
        ));

        info!(
            data_dir = %config.data_dir.display(),
            workers = config.worker_count,
            metrics = config.enable_metrics,
            "reckon node started"
        );
        Ok(Self {
            config,
            environment,
            scheduler,
            metrics,
            sessions,
            shutdown,
        })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn engine(&self) -> &Arc<LmdbEngine<U>> {
        self.scheduler.engine()
    }

    pub fn scheduler(&self) -> &ReconcileScheduler<LmdbParticipationStore, U> {
        &self.scheduler
    }

    pub fn shutdown_controller(&self) -> &ShutdownController {
        &self.shutdown
    }

    // ── Reconciliation ──────────────────────────────────────────────────

    pub async fn reconcile(&self, key: ParticipantKey) -> Result<ReconcileSummary, NodeError> {
        self.scheduler.reconcile(key).await
    }

    pub async fn reconcile_event(&self, event: &EventId) -> Result<BatchSummary, NodeError> {
        self.scheduler.reconcile_event(event).await
    }

    /// Fire-and-forget pass; fails fast when the owning queue is full.
    pub fn trigger(&self, key: ParticipantKey) -> Result<(), NodeError> {
        self.scheduler.try_schedule(key)
    }

    pub fn override_status(
        &self,
        key: &ParticipantKey,
        new_status: &str,
        actor: &Actor,
        reason: &str,
    ) -> Result<ParticipationRecord, NodeError> {
        let _span = override_span(key, actor.id.as_str()).entered();
        let record =
            self.engine()
                .override_status(key, new_status, actor, reason, Timestamp::now())?;
        self.count_override();
        Ok(record)
    }

    pub fn clear_override(
        &self,
        key: &ParticipantKey,
        actor: &Actor,
    ) -> Result<ParticipationRecord, NodeError> {
        let _span = override_span(key, actor.id.as_str()).entered();
        let record = self.engine().clear_override(key, actor, Timestamp::now())?;
        self.count_override();
        Ok(record)
    }

    // ── Queries ─────────────────────────────────────────────────────────

    pub fn get_status(&self, key: &ParticipantKey) -> Result<Option<StatusView>, NodeError> {
        Ok(self.engine().get_status(key)?)
    }

    pub fn get_record(
        &self,
        key: &ParticipantKey,
    ) -> Result<Option<ParticipationRecord>, NodeError> {
        Ok(self.engine().get_record(key)?)
    }

    pub fn list_records(
        &self,
        event: &EventId,
        filter: &RecordFilter,
    ) -> Result<Vec<ParticipationRecord>, NodeError> {
        Ok(self.engine().list_records(event, filter)?)
    }

    pub fn event_stats(&self, event: &EventId) -> Result<EventStats, NodeError> {
        Ok(self.engine().event_stats(event)?)
    }

    pub fn record_count(&self) -> Result<u64, NodeError> {
        Ok(self.environment.participation_store().record_count()?)
    }

    /// Metrics in Prometheus text format, if collection is enabled.
    pub fn metrics_text(&self) -> Result<Option<String>, NodeError> {
        self.metrics.as_ref().map(|m| m.encode()).transpose()
    }

    // ── Scan sessions ───────────────────────────────────────────────────

    pub fn open_scan_session(&self, event: EventId, opened_by: ActorId) -> ScanSession {
        let session = self.sessions().open(event, opened_by, Timestamp::now());
        info!(event = %session.event, opened_by = %session.opened_by, "scan session opened");
        session
    }

    pub fn scan_session(&self, token: &str) -> Option<ScanSession> {
        self.sessions().get(token, Timestamp::now()).cloned()
    }

    pub fn close_scan_session(&self, token: &str) -> Option<ScanSession> {
        self.sessions().close(token)
    }

    pub fn evict_expired_sessions(&self) -> usize {
        self.sessions().evict_expired(Timestamp::now())
    }

    // ── Lifecycle ───────────────────────────────────────────────────────

    /// Drain queued jobs and stop the workers.
    pub async fn shutdown(self) {
        self.scheduler.shutdown().await;
        info!("reckon node stopped");
    }

    fn sessions(&self) -> MutexGuard<'_, ScanSessionStore> {
        // The store stays consistent even if a holder panicked.
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn count_override(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.overrides.inc();
        }
    }
}
