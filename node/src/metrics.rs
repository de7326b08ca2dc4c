//! Prometheus metrics for reconciliation.
//!
//! [`ReconcileMetrics`] owns a dedicated [`Registry`]; [`ReconcileMetrics::encode`]
//! renders it in the Prometheus text exposition format.

use prometheus::{
    register_histogram_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, Encoder, Histogram, HistogramOpts, IntCounter, IntGauge,
    Opts, Registry, TextEncoder,
};

use crate::NodeError;

pub struct ReconcileMetrics {
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Automatic passes that wrote a record.
    pub reconciliations: IntCounter,
    /// Passes that failed (source, store or contention errors).
    pub failures: IntCounter,
    /// Conflicts found across all successful passes.
    pub conflicts_detected: IntCounter,
    /// Manual overrides applied or cleared.
    pub overrides: IntCounter,
    /// Jobs refused because a worker queue was full.
    pub jobs_rejected: IntCounter,
    /// Source reads that hit the timeout and were treated as absent.
    pub source_timeouts: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// Jobs waiting in worker queues.
    pub queue_depth: IntGauge,

    // ── Histograms ──────────────────────────────────────────────────────
    /// Time from dequeue to completed write, in milliseconds.
    pub reconcile_latency_ms: Histogram,
}

impl ReconcileMetrics {
    pub fn new() -> Result<Self, NodeError> {
        let registry = Registry::new();

        let reconciliations = register_int_counter_with_registry!(
            Opts::new(
                "reckon_reconciliations_total",
                "Automatic reconciliation passes completed"
            ),
            registry
        )?;
        let failures = register_int_counter_with_registry!(
            Opts::new(
                "reckon_reconcile_failures_total",
                "Automatic reconciliation passes that failed"
            ),
            registry
        )?;
        let conflicts_detected = register_int_counter_with_registry!(
            Opts::new(
                "reckon_conflicts_detected_total",
                "Conflicts detected across reconciliation passes"
            ),
            registry
        )?;
        let overrides = register_int_counter_with_registry!(
            Opts::new("reckon_overrides_total", "Manual overrides applied or cleared"),
            registry
        )?;
        let jobs_rejected = register_int_counter_with_registry!(
            Opts::new(
                "reckon_jobs_rejected_total",
                "Reconcile jobs refused because the worker queue was full"
            ),
            registry
        )?;
        let source_timeouts = register_int_counter_with_registry!(
            Opts::new(
                "reckon_source_timeouts_total",
                "Signal source reads that timed out"
            ),
            registry
        )?;

        let queue_depth = register_int_gauge_with_registry!(
            Opts::new("reckon_queue_depth", "Reconcile jobs waiting in worker queues"),
            registry
        )?;

        // Exponential buckets covering 0.5 ms to ~8 s.
        let reconcile_latency_ms = register_histogram_with_registry!(
            HistogramOpts::new(
                "reckon_reconcile_latency_ms",
                "Reconcile job latency in milliseconds"
            )
            .buckets(prometheus::exponential_buckets(0.5, 2.0, 15)?),
            registry
        )?;

        Ok(Self {
            registry,
            reconciliations,
            failures,
            conflicts_detected,
            overrides,
            jobs_rejected,
            source_timeouts,
            queue_depth,
            reconcile_latency_ms,
        })
    }

    /// Render every metric in the text exposition format.
    pub fn encode(&self) -> Result<String, NodeError> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_registered_metrics() {
        let metrics = ReconcileMetrics::new().unwrap();
        metrics.reconciliations.inc();
        metrics.queue_depth.set(3);
        metrics.reconcile_latency_ms.observe(12.0);

        let text = metrics.encode().unwrap();
        assert!(text.contains("reckon_reconciliations_total 1"));
        assert!(text.contains("reckon_queue_depth 3"));
        assert!(text.contains("reckon_reconcile_latency_ms_count 1"));
    }

    #[test]
    fn registries_are_independent() {
        let a = ReconcileMetrics::new().unwrap();
        let b = ReconcileMetrics::new().unwrap();
        a.jobs_rejected.inc();
        assert_eq!(b.jobs_rejected.get(), 0);
    }
}
