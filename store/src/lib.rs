//! Abstract storage and source traits for the reckon engine.
//!
//! Every record backend (LMDB, in-memory for testing) implements
//! [`ParticipationStore`]; every upstream system that produces evidence is
//! reached through [`SignalSources`] and [`EventDirectory`]. The engine
//! depends only on these traits.

pub mod error;
pub mod events;
pub mod participation;
pub mod record;
pub mod sources;

pub use error::{SourceError, StoreError};
pub use events::{EventDirectory, EventRoster};
pub use participation::ParticipationStore;
pub use record::{
    Conflict, ManualOverride, ParticipationRecord, ReconciliationMeta, RecordFlags,
    StatusBreakdown,
};
pub use sources::{
    AttendanceRecord, AttendanceStatus, CertificateRecord, CertificateStatus, RegistrationRecord,
    SignalSources, SourceKind,
};
