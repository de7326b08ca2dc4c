//! Timed source reads.
//!
//! Each signal source is read on the blocking pool and bounded by a timeout.
//! A read that times out contributes no signal; a read that fails aborts the
//! pair with [`ReconcileError::Source`].

use std::sync::Arc;
use std::time::Duration;

use reckon_reconcile::{ReconcileError, SourceSnapshot};
use reckon_store::{SignalSources, SourceError, SourceKind};
use reckon_types::ParticipantKey;
use tracing::warn;

use crate::ReconcileMetrics;

/// Read all three sources for `key` concurrently, each bounded by `limit`.
pub async fn fetch_snapshot<U>(
    upstream: Arc<U>,
    key: &ParticipantKey,
    limit: Duration,
    metrics: Option<&ReconcileMetrics>,
) -> Result<SourceSnapshot, ReconcileError>
where
    U: SignalSources + Send + Sync + 'static,
{
    let (registration, attendance, certificate) = tokio::join!(
        read_source(
            Arc::clone(&upstream),
            key,
            SourceKind::Registration,
            limit,
            metrics,
            |u: &U, k: &ParticipantKey| u.registration(k),
        ),
        read_source(
            Arc::clone(&upstream),
            key,
            SourceKind::Attendance,
            limit,
            metrics,
            |u: &U, k: &ParticipantKey| u.attendance(k),
        ),
        read_source(
            upstream,
            key,
            SourceKind::Certificate,
            limit,
            metrics,
            |u: &U, k: &ParticipantKey| u.certificate(k),
        ),
    );

    Ok(SourceSnapshot {
        registration: registration?,
        attendance: attendance?,
        certificate: certificate?,
    })
}

async fn read_source<U, T, F>(
    upstream: Arc<U>,
    key: &ParticipantKey,
    kind: SourceKind,
    limit: Duration,
    metrics: Option<&ReconcileMetrics>,
    read: F,
) -> Result<Option<T>, ReconcileError>
where
    U: Send + Sync + 'static,
    T: Send + 'static,
    F: FnOnce(&U, &ParticipantKey) -> Result<Option<T>, SourceError> + Send + 'static,
{
    let task_key = key.clone();
    let task = tokio::task::spawn_blocking(move || read(&upstream, &task_key));

    match tokio::time::timeout(limit, task).await {
        Ok(Ok(result)) => result.map_err(|source| ReconcileError::Source {
            key: key.clone(),
            source,
        }),
        Ok(Err(join)) => Err(ReconcileError::Source {
            key: key.clone(),
            source: SourceError::Unavailable {
                kind,
                reason: format!("read task failed: {join}"),
            },
        }),
        Err(_) => {
            if let Some(metrics) = metrics {
                metrics.source_timeouts.inc();
            }
            warn!(
                email = %key.email,
                event = %key.event,
                source = %kind,
                timeout_ms = limit.as_millis() as u64,
                "source read timed out, treating as no signal"
            );
            Ok(None)
        }
    }
}
