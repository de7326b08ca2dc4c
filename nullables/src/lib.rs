//! Nullable infrastructure for deterministic testing.
//!
//! All external dependencies (clock, record store, signal sources, event
//! directory) are abstracted behind traits. This crate provides
//! test-friendly implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically, including injected failures and delays
//! - Never touch the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;
pub mod sources;
pub mod store;

pub use clock::NullClock;
pub use sources::NullSources;
pub use store::NullParticipationStore;
