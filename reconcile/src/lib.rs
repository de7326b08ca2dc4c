//! Participation reconciliation.
//!
//! Independent sources each claim something about whether a person took part
//! in an event. A reconciliation pass turns those claims into one canonical,
//! explainable status:
//!
//! 1. **Ingest**: read every source and normalize its record into a weighted
//!    [`Signal`](reckon_types::Signal).
//! 2. **Detect**: run the fixed conflict rules over the active signals.
//! 3. **Resolve**: precedence plus highest-trust-per-category decides the
//!    [`CanonicalStatus`](reckon_types::CanonicalStatus).
//! 4. **Score**: average trust, consistency bonus, conflict and suspicion
//!    penalties give a 0–100 confidence.
//! 5. **Flag**: review/suspicion/verification flags fall out of the above.
//!
//! The result is written to the record store as one versioned update.
//! Authorized actors can override the status by hand; the batch reconciler
//! runs the pass over every registrant of an event.

pub mod assessment;
pub mod authorization;
pub mod batch;
pub mod confidence;
pub mod conflict;
pub mod engine;
pub mod error;
pub mod flags;
pub mod history;
pub mod ingest;
pub mod query;
pub mod resolver;

pub use assessment::{Assessment, Assessor};
pub use batch::{BatchFailure, BatchSummary};
pub use confidence::ConfidenceScorer;
pub use conflict::ConflictDetector;
pub use engine::{EngineSettings, ReconcileSummary, ReconciliationEngine};
pub use error::ReconcileError;
pub use flags::FlagEvaluator;
pub use ingest::{SignalIngestor, SourceSnapshot};
pub use query::{EventStats, RecordFilter, StatusView};
pub use resolver::{Resolution, StatusResolver};
