//! LMDB environment setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use crate::{LmdbError, LmdbMetaStore, LmdbParticipationStore, Migrator};

/// Named databases inside the environment.
const RECORDS_DB: &str = "participation_records";
const META_DB: &str = "meta";

/// Default map size: 1 GiB.
pub const DEFAULT_MAP_SIZE: usize = 1 << 30;

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    env: Arc<Env>,
    path: PathBuf,
    records_db: Database<Bytes, Bytes>,
    meta_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment in the directory `path`, creating
    /// every database and bringing the schema up to date.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;

        // SAFETY: the environment is opened once per process and the
        // directory is not shared with another LMDB user that might
        // truncate the memory map underneath us.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(4)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let records_db: Database<Bytes, Bytes> = env.create_database(&mut wtxn, Some(RECORDS_DB))?;
        let meta_db: Database<Bytes, Bytes> = env.create_database(&mut wtxn, Some(META_DB))?;
        wtxn.commit()?;

        let environment = Self {
            env: Arc::new(env),
            path: path.to_path_buf(),
            records_db,
            meta_db,
        };
        Migrator::run(&environment.meta_store())?;

        tracing::info!(path = %path.display(), map_size, "LMDB environment opened");
        Ok(environment)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn participation_store(&self) -> LmdbParticipationStore {
        LmdbParticipationStore {
            env: Arc::clone(&self.env),
            records_db: self.records_db,
        }
    }

    pub fn meta_store(&self) -> LmdbMetaStore {
        LmdbMetaStore {
            env: Arc::clone(&self.env),
            meta_db: self.meta_db,
        }
    }
}
