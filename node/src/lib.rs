//! Reckon node: runs the reconciliation engine as a service.
//!
//! The node owns:
//! - the LMDB participation record store
//! - a worker pool that serializes passes per `(email, event)` pair
//! - timed reads of the upstream signal sources
//! - ephemeral scan sessions
//! - configuration, structured logging and Prometheus metrics

pub mod config;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod metrics;
pub mod node;
pub mod scan_sessions;
pub mod scheduler;
pub mod shutdown;
pub mod snapshot_sources;
pub mod tracing_spans;

pub use config::NodeConfig;
pub use error::NodeError;
pub use fetch::fetch_snapshot;
pub use logging::{init_logging, LogFormat};
pub use metrics::ReconcileMetrics;
pub use node::{LmdbEngine, ReckonNode};
pub use scan_sessions::{ScanSession, ScanSessionStore};
pub use scheduler::{ReconcileScheduler, SchedulerConfig};
pub use shutdown::ShutdownController;
pub use snapshot_sources::{SnapshotDocument, SnapshotSources, SourceEntry};
