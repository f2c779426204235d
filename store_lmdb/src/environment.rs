//! LMDB environment setup.

use std::path::Path;
use std::sync::Arc;

use heed::types::{Bytes, Str};
use heed::{Database, Env, EnvOpenOptions};
use tracing::info;

use civitas_store::meta::{MetaStore, CURRENT_SCHEMA_VERSION};
use civitas_store::StoreError;

use crate::{LmdbError, LmdbIdentityStore, LmdbMetaStore};

/// Number of named databases: identity + meta.
const MAX_DBS: u32 = 2;

const IDENTITY_DB: &str = "identity";
const META_DB: &str = "meta";

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    env: Arc<Env>,
    identity_db: Database<Str, Bytes>,
    meta_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given directory.
    ///
    /// Creates the directory if needed and stamps the schema version on a
    /// fresh database. A database written by a newer schema is refused.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, StoreError> {
        std::fs::create_dir_all(path).map_err(|e| LmdbError::Io(e.to_string()))?;

        // SAFETY: the environment is opened once per process for this path and
        // the memory map is not modified outside of heed.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(MAX_DBS)
                .open(path)
                .map_err(LmdbError::from)?
        };

        let mut wtxn = env.write_txn().map_err(LmdbError::from)?;
        let identity_db: Database<Str, Bytes> = env
            .create_database(&mut wtxn, Some(IDENTITY_DB))
            .map_err(LmdbError::from)?;
        let meta_db: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, Some(META_DB))
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;

        let environment = Self {
            env: Arc::new(env),
            identity_db,
            meta_db,
        };

        let meta = environment.meta_store();
        match meta.get_schema_version()? {
            0 => meta.set_schema_version(CURRENT_SCHEMA_VERSION)?,
            v if v > CURRENT_SCHEMA_VERSION => {
                return Err(StoreError::Corruption(format!(
                    "schema version {v} is newer than supported {CURRENT_SCHEMA_VERSION}"
                )));
            }
            _ => {}
        }
        environment.identity_store().backfill_count()?;

        info!(path = %path.display(), "opened LMDB identity store");
        Ok(environment)
    }

    /// Handle implementing [`civitas_store::IdentityStore`].
    pub fn identity_store(&self) -> LmdbIdentityStore {
        LmdbIdentityStore {
            env: Arc::clone(&self.env),
            identity_db: self.identity_db,
            meta_db: self.meta_db,
        }
    }

    /// Handle implementing [`civitas_store::MetaStore`].
    pub fn meta_store(&self) -> LmdbMetaStore {
        LmdbMetaStore {
            env: Arc::clone(&self.env),
            meta_db: self.meta_db,
        }
    }
}
