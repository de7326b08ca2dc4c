//! Fundamental types for the reckon workspace.
//!
//! This crate defines the vocabulary shared by every other crate: participant
//! identities, timestamps, signals and their sources, the canonical status
//! enum, and the trust policy that weights every signal.

pub mod actor;
pub mod error;
pub mod policy;
pub mod signal;
pub mod status;
pub mod subject;
pub mod time;

pub use actor::{Actor, ActorId, ActorRole};
pub use error::ReckonError;
pub use policy::TrustPolicy;
pub use signal::{Signal, SignalSource, SignalType, SourceRef};
pub use status::{CanonicalStatus, ConflictType, ResolutionStrategy};
pub use subject::{Email, EventId, ParticipantKey};
pub use time::Timestamp;
