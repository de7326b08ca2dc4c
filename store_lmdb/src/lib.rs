//! LMDB storage backend for reckon.
//!
//! Implements [`reckon_store::ParticipationStore`] using the `heed` LMDB
//! bindings. All databases live in a single environment.

pub mod environment;
pub mod error;
pub mod meta;
pub mod migration;
pub mod participation;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use meta::LmdbMetaStore;
pub use migration::{Migrator, CURRENT_SCHEMA_VERSION};
pub use participation::LmdbParticipationStore;
