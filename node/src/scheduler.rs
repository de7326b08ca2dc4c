//! Reconcile worker pool.
//!
//! `worker_count` tasks, each draining its own bounded queue. Jobs are routed
//! by a hash of the `(email, event)` pair, so every job for one pair runs on
//! the same worker, in submission order. Different pairs proceed in parallel.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::{Duration, Instant};

use reckon_reconcile::{BatchSummary, ReconcileSummary, ReconciliationEngine};
use reckon_store::{EventDirectory, ParticipationStore, SignalSources};
use reckon_types::{EventId, ParticipantKey, Timestamp};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn, Instrument};

use crate::fetch::fetch_snapshot;
use crate::tracing_spans::{batch_span, reconcile_span};
use crate::{NodeError, ReconcileMetrics, ShutdownController};

type Reply = oneshot::Sender<Result<ReconcileSummary, NodeError>>;

/// Worker pool sizing and per-read timeout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub worker_count: usize,
    pub queue_capacity: usize,
    pub source_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            worker_count: 4,
            queue_capacity: 1024,
            source_timeout: Duration::from_secs(5),
        }
    }
}

struct ReconcileJob {
    key: ParticipantKey,
    reply: Option<Reply>,
}

struct Worker<S, U> {
    index: usize,
    engine: Arc<ReconciliationEngine<S, U>>,
    metrics: Option<Arc<ReconcileMetrics>>,
    source_timeout: Duration,
}

impl<S, U> Worker<S, U>
where
    S: ParticipationStore + Send + Sync + 'static,
    U: SignalSources + EventDirectory + Send + Sync + 'static,
{
    async fn run(
        self,
        mut jobs: mpsc::Receiver<ReconcileJob>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        debug!(worker = self.index, "reconcile worker started");
        loop {
            tokio::select! {
                job = jobs.recv() => match job {
                    Some(job) => self.handle(job).await,
                    // Every sender dropped: queue drained, stop.
                    None => break,
                },
                _ = shutdown.recv() => {
                    debug!(worker = self.index, "reconcile worker interrupted");
                    break;
                }
            }
        }
        debug!(worker = self.index, "reconcile worker stopped");
    }

    async fn handle(&self, job: ReconcileJob) {
        if let Some(metrics) = &self.metrics {
            metrics.queue_depth.dec();
        }
        let started = Instant::now();
        let span = reconcile_span(&job.key, self.index);
        let result = self.reconcile(job.key).instrument(span).await;

        if let Some(metrics) = &self.metrics {
            metrics
                .reconcile_latency_ms
                .observe(started.elapsed().as_secs_f64() * 1000.0);
            match &result {
                Ok(summary) => {
                    metrics.reconciliations.inc();
                    metrics
                        .conflicts_detected
                        .inc_by(summary.conflict_count as u64);
                }
                Err(_) => metrics.failures.inc(),
            }
        }

        match job.reply {
            Some(reply) => {
                // The submitter may have stopped waiting; that is not an error.
                let _ = reply.send(result);
            }
            None => {
                if let Err(e) = result {
                    warn!(worker = self.index, error = %e, "scheduled reconciliation failed");
                }
            }
        }
    }

    async fn reconcile(&self, key: ParticipantKey) -> Result<ReconcileSummary, NodeError> {
        let snapshot = fetch_snapshot(
            Arc::clone(self.engine.upstream()),
            &key,
            self.source_timeout,
            self.metrics.as_deref(),
        )
        .await?;

        let engine = Arc::clone(&self.engine);
        let summary = tokio::task::spawn_blocking(move || {
            engine.apply_snapshot(&key, &snapshot, Timestamp::now())
        })
        .await
        .map_err(|e| NodeError::TaskFailed(e.to_string()))??;
        Ok(summary)
    }
}

/// Fans reconcile jobs out over a fixed set of workers.
pub struct ReconcileScheduler<S, U> {
    engine: Arc<ReconciliationEngine<S, U>>,
    senders: Vec<mpsc::Sender<ReconcileJob>>,
    handles: Vec<JoinHandle<()>>,
    metrics: Option<Arc<ReconcileMetrics>>,
}

impl<S, U> ReconcileScheduler<S, U>
where
    S: ParticipationStore + Send + Sync + 'static,
    U: SignalSources + EventDirectory + Send + Sync + 'static,
{
    /// Spawn the workers on the current tokio runtime.
    pub fn start(
        engine: Arc<ReconciliationEngine<S, U>>,
        config: &SchedulerConfig,
        metrics: Option<Arc<ReconcileMetrics>>,
        shutdown: &ShutdownController,
    ) -> Self {
        let worker_count = config.worker_count.max(1);
        let mut senders = Vec::with_capacity(worker_count);
        let mut handles = Vec::with_capacity(worker_count);

        for index in 0..worker_count {
            let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
            let worker = Worker {
                index,
                engine: Arc::clone(&engine),
                metrics: metrics.clone(),
                source_timeout: config.source_timeout,
            };
            handles.push(tokio::spawn(worker.run(rx, shutdown.subscribe())));
            senders.push(tx);
        }

        info!(
            workers = worker_count,
            queue_capacity = config.queue_capacity,
            source_timeout_ms = config.source_timeout.as_millis() as u64,
            "reconcile scheduler started"
        );
        Self {
            engine,
            senders,
            handles,
            metrics,
        }
    }

    pub fn engine(&self) -> &Arc<ReconciliationEngine<S, U>> {
        &self.engine
    }

    pub fn worker_count(&self) -> usize {
        self.senders.len()
    }

    /// Worker that owns every job for `key`.
    pub fn worker_for(&self, key: &ParticipantKey) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() % self.senders.len() as u64) as usize
    }

    /// Enqueue a fire-and-forget pass without waiting.
    ///
    /// Fails with [`NodeError::QueueFull`] when the owning worker's queue is
    /// at capacity.
    pub fn try_schedule(&self, key: ParticipantKey) -> Result<(), NodeError> {
        let worker = self.worker_for(&key);
        self.adjust_depth(1);
        match self.senders[worker].try_send(ReconcileJob { key, reply: None }) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(job)) => {
                self.adjust_depth(-1);
                if let Some(metrics) = &self.metrics {
                    metrics.jobs_rejected.inc();
                }
                warn!(
                    worker,
                    email = %job.key.email,
                    event = %job.key.event,
                    "reconcile queue full, job rejected"
                );
                Err(NodeError::QueueFull { worker })
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.adjust_depth(-1);
                Err(NodeError::SchedulerStopped)
            }
        }
    }

    /// Enqueue a fire-and-forget pass, waiting for queue space.
    pub async fn schedule(&self, key: ParticipantKey) -> Result<(), NodeError> {
        self.submit(key, None).await
    }

    /// Run one pass through the owning worker and wait for its outcome.
    pub async fn reconcile(&self, key: ParticipantKey) -> Result<ReconcileSummary, NodeError> {
        let (tx, rx) = oneshot::channel();
        self.submit(key, Some(tx)).await?;
        rx.await.map_err(|_| NodeError::SchedulerStopped)?
    }

    /// Reconcile every registrant of `event` across the pool.
    ///
    /// Each subject is counted once, as a success or a failure.
    pub async fn reconcile_event(&self, event: &EventId) -> Result<BatchSummary, NodeError> {
        let span = batch_span(event);
        async {
            let engine = Arc::clone(&self.engine);
            let lookup = event.clone();
            let registrants = tokio::task::spawn_blocking(move || engine.registrants(&lookup))
                .await
                .map_err(|e| NodeError::TaskFailed(e.to_string()))??;

            let mut pending = Vec::with_capacity(registrants.len());
            for email in registrants {
                let key = ParticipantKey::new(email.clone(), event.clone());
                let (tx, rx) = oneshot::channel();
                self.submit(key, Some(tx)).await?;
                pending.push((email, rx));
            }

            let mut batch = BatchSummary::new(event.clone());
            for (email, rx) in pending {
                match rx.await {
                    Ok(Ok(summary)) => batch.record_success(&summary),
                    Ok(Err(e)) => {
                        warn!(email = %email, error = %e, "reconciliation failed");
                        batch.record_failure(email, &e);
                    }
                    Err(_) => batch.record_failure(email, &NodeError::SchedulerStopped),
                }
            }

            info!(
                total = batch.total,
                reconciled = batch.reconciled,
                failed = batch.failed,
                conflicts = batch.conflicts,
                requires_review = batch.requires_review,
                "event reconciliation finished"
            );
            Ok::<_, NodeError>(batch)
        }
        .instrument(span)
        .await
    }

    /// Stop accepting jobs, let workers drain their queues, and wait for them.
    pub async fn shutdown(self) {
        drop(self.senders);
        for handle in self.handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "reconcile worker ended abnormally");
            }
        }
        info!("reconcile scheduler stopped");
    }

    async fn submit(&self, key: ParticipantKey, reply: Option<Reply>) -> Result<(), NodeError> {
        let worker = self.worker_for(&key);
        self.adjust_depth(1);
        if self.senders[worker]
            .send(ReconcileJob { key, reply })
            .await
            .is_err()
        {
            self.adjust_depth(-1);
            return Err(NodeError::SchedulerStopped);
        }
        Ok(())
    }

    /// Counted before the send so the worker's decrement never runs first.
    fn adjust_depth(&self, delta: i64) {
        if let Some(metrics) = &self.metrics {
            metrics.queue_depth.add(delta);
        }
    }
}
