//! LMDB implementation of IdentityStore.
//!
//! Bindings are bincode-encoded under `binding:<handle>`; the wallet index
//! stores the raw handle string under `wallet-index:<wallet>`. Each put or
//! delete is its own write transaction, matching the single-key contract of
//! the trait. The number of bindings is kept under `binding_count` in the
//! meta database and updated in the same transaction as the binding write.

use std::sync::Arc;

use heed::types::{Bytes, Str};
use heed::{Database, Env, RoTxn, RwTxn};

use civitas_store::keys::{binding_key, wallet_index_key, BINDING_PREFIX};
use civitas_store::{IdentityStore, StoreError};
use civitas_types::{IdentityBinding, IdentityHandle, WalletAddress};

use tracing::info;

use crate::LmdbError;

pub(crate) const BINDING_COUNT_KEY: &[u8] = b"binding_count";

pub struct LmdbIdentityStore {
    pub(crate) env: Arc<Env>,
    pub(crate) identity_db: Database<Str, Bytes>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

impl LmdbIdentityStore {
    fn read_count(&self, rtxn: &RoTxn) -> Result<Option<u64>, LmdbError> {
        match self.meta_db.get(rtxn, BINDING_COUNT_KEY)? {
            Some(bytes) => {
                let arr: [u8; 8] = bytes.try_into().map_err(|_| {
                    LmdbError::Corruption("binding_count has unexpected byte length".into())
                })?;
                Ok(Some(u64::from_le_bytes(arr)))
            }
            None => Ok(None),
        }
    }

    fn write_count(&self, wtxn: &mut RwTxn, count: u64) -> Result<(), LmdbError> {
        self.meta_db.put(wtxn, BINDING_COUNT_KEY, &count.to_le_bytes())?;
        Ok(())
    }

    fn scan_count(&self, rtxn: &RoTxn) -> Result<u64, LmdbError> {
        let mut count = 0u64;
        for entry in self.identity_db.prefix_iter(rtxn, BINDING_PREFIX)? {
            entry?;
            count += 1;
        }
        Ok(count)
    }

    /// Write the binding counter for databases created before it existed.
    pub(crate) fn backfill_count(&self) -> Result<(), LmdbError> {
        let mut wtxn = self.env.write_txn()?;
        if self.read_count(&wtxn)?.is_none() {
            let count = self.scan_count(&wtxn)?;
            self.write_count(&mut wtxn, count)?;
            wtxn.commit()?;
            info!(count, "backfilled binding counter");
        }
        Ok(())
    }

    fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, LmdbError> {
        let rtxn = self.env.read_txn()?;
        let val = self.identity_db.get(&rtxn, key)?.map(|b| b.to_vec());
        Ok(val)
    }

    fn put_raw(&self, key: &str, value: &[u8]) -> Result<(), LmdbError> {
        let mut wtxn = self.env.write_txn()?;
        self.identity_db.put(&mut wtxn, key, value)?;
        wtxn.commit()?;
        Ok(())
    }

    fn delete_raw(&self, key: &str) -> Result<(), LmdbError> {
        let mut wtxn = self.env.write_txn()?;
        self.identity_db.delete(&mut wtxn, key)?;
        wtxn.commit()?;
        Ok(())
    }
}

impl IdentityStore for LmdbIdentityStore {
    fn get_binding(&self, identity: &IdentityHandle) -> Result<Option<IdentityBinding>, StoreError> {
        let Some(bytes) = self.get_raw(&binding_key(identity))? else {
            return Ok(None);
        };
        let binding: IdentityBinding = bincode::deserialize(&bytes).map_err(LmdbError::from)?;
        if &binding.identity != identity {
            return Err(LmdbError::Corruption(format!(
                "binding stored under {identity} names {}",
                binding.identity
            ))
            .into());
        }
        Ok(Some(binding))
    }

    fn put_binding(&self, binding: &IdentityBinding) -> Result<(), StoreError> {
        let bytes = bincode::serialize(binding).map_err(LmdbError::from)?;
        let key = binding_key(&binding.identity);
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let is_new = self
            .identity_db
            .get(&wtxn, &key)
            .map_err(LmdbError::from)?
            .is_none();
        self.identity_db
            .put(&mut wtxn, &key, &bytes)
            .map_err(LmdbError::from)?;
        if is_new {
            let count = self.read_count(&wtxn)?.unwrap_or(0);
            self.write_count(&mut wtxn, count + 1)?;
        }
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn delete_binding(&self, identity: &IdentityHandle) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let removed = self
            .identity_db
            .delete(&mut wtxn, &binding_key(identity))
            .map_err(LmdbError::from)?;
        if removed {
            let count = self.read_count(&wtxn)?.unwrap_or(0);
            self.write_count(&mut wtxn, count.saturating_sub(1))?;
        }
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_wallet_owner(&self, wallet: &WalletAddress) -> Result<Option<IdentityHandle>, StoreError> {
        let Some(bytes) = self.get_raw(&wallet_index_key(wallet))? else {
            return Ok(None);
        };
        let raw = String::from_utf8(bytes)
            .map_err(|e| LmdbError::Corruption(format!("wallet index for {wallet}: {e}")))?;
        let handle = IdentityHandle::new(raw)
            .map_err(|e| LmdbError::Corruption(format!("wallet index for {wallet}: {e}")))?;
        Ok(Some(handle))
    }

    fn put_wallet_owner(&self, wallet: &WalletAddress, identity: &IdentityHandle) -> Result<(), StoreError> {
        self.put_raw(&wallet_index_key(wallet), identity.as_str().as_bytes())?;
        Ok(())
    }

    fn delete_wallet_owner(&self, wallet: &WalletAddress) -> Result<(), StoreError> {
        self.delete_raw(&wallet_index_key(wallet))?;
        Ok(())
    }

    fn binding_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let count = match self.read_count(&rtxn)? {
            Some(count) => count,
            None => self.scan_count(&rtxn)?,
        };
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LmdbEnvironment;
    use civitas_store::MetaStore;
    use civitas_types::{BindingStatus, Timestamp};

    const MAP_SIZE: usize = 16 * 1024 * 1024;

    fn temp_env() -> (tempfile::TempDir, LmdbEnvironment) {
        let dir = tempfile::tempdir().expect("temp dir");
        let env = LmdbEnvironment::open(dir.path(), MAP_SIZE).expect("open env");
        (dir, env)
    }

    fn handle(s: &str) -> IdentityHandle {
        IdentityHandle::new(s).unwrap()
    }

    fn wallet(n: u8) -> WalletAddress {
        WalletAddress::from_bytes([n; 20])
    }

    #[test]
    fn binding_put_get_delete() {
        let (_dir, env) = temp_env();
        let store = env.identity_store();
        let h = handle("h1");

        assert!(store.get_binding(&h).unwrap().is_none());

        let b = IdentityBinding::pending(h.clone(), wallet(1), Timestamp::new(5));
        store.put_binding(&b).unwrap();
        assert_eq!(store.get_binding(&h).unwrap(), Some(b.clone()));

        let c = b.completed(Timestamp::new(6));
        store.put_binding(&c).unwrap();
        assert_eq!(
            store.get_binding(&h).unwrap().unwrap().status,
            BindingStatus::Complete
        );

        store.delete_binding(&h).unwrap();
        assert!(store.get_binding(&h).unwrap().is_none());
    }

    #[test]
    fn deleting_absent_keys_is_ok() {
        let (_dir, env) = temp_env();
        let store = env.identity_store();
        store.delete_binding(&handle("nobody")).unwrap();
        store.delete_wallet_owner(&wallet(9)).unwrap();
    }

    #[test]
    fn wallet_index_roundtrip() {
        let (_dir, env) = temp_env();
        let store = env.identity_store();
        store.put_wallet_owner(&wallet(2), &handle("h2")).unwrap();
        assert_eq!(store.get_wallet_owner(&wallet(2)).unwrap(), Some(handle("h2")));
        store.delete_wallet_owner(&wallet(2)).unwrap();
        assert!(store.get_wallet_owner(&wallet(2)).unwrap().is_none());
    }

    #[test]
    fn orphaned_index_entry_resolves_to_none() {
        let (_dir, env) = temp_env();
        let store = env.identity_store();
        let h = handle("h3");
        store
            .put_binding(&IdentityBinding::pending(h.clone(), wallet(4), Timestamp::new(1)))
            .unwrap();
        store.put_wallet_owner(&wallet(3), &h).unwrap();
        store.put_wallet_owner(&wallet(4), &h).unwrap();

        assert!(store.binding_for_wallet(&wallet(3)).unwrap().is_none());
        assert_eq!(store.binding_for_wallet(&wallet(4)).unwrap().unwrap().identity, h);
    }

    #[test]
    fn binding_count_ignores_index_entries() {
        let (_dir, env) = temp_env();
        let store = env.identity_store();
        for (i, name) in ["a", "b", "c"].iter().enumerate() {
            let h = handle(name);
            store
                .put_binding(&IdentityBinding::pending(h.clone(), wallet(i as u8), Timestamp::new(1)))
                .unwrap();
            store.put_wallet_owner(&wallet(i as u8), &h).unwrap();
        }
        assert_eq!(store.binding_count().unwrap(), 3);
    }

    #[test]
    fn binding_count_tracks_overwrites_and_deletes() {
        let dir = tempfile::tempdir().unwrap();
        {
            let env = LmdbEnvironment::open(dir.path(), MAP_SIZE).unwrap();
            let store = env.identity_store();
            let b = IdentityBinding::pending(handle("h1"), wallet(1), Timestamp::new(1));
            store.put_binding(&b).unwrap();
            store.put_binding(&b.completed(Timestamp::new(2))).unwrap();
            store
                .put_binding(&IdentityBinding::pending(handle("h2"), wallet(2), Timestamp::new(3)))
                .unwrap();
            assert_eq!(store.binding_count().unwrap(), 2);

            store.delete_binding(&handle("h1")).unwrap();
            store.delete_binding(&handle("h1")).unwrap();
            assert_eq!(store.binding_count().unwrap(), 1);
        }
        let env = LmdbEnvironment::open(dir.path(), MAP_SIZE).unwrap();
        assert_eq!(env.identity_store().binding_count().unwrap(), 1);
    }

    #[test]
    fn missing_counter_is_backfilled_on_open() {
        let dir = tempfile::tempdir().unwrap();
        {
            let env = LmdbEnvironment::open(dir.path(), MAP_SIZE).unwrap();
            let store = env.identity_store();
            for n in 1..=3u8 {
                let h = handle(&format!("h{n}"));
                store
                    .put_binding(&IdentityBinding::pending(h, wallet(n), Timestamp::new(1)))
                    .unwrap();
            }
            let mut wtxn = store.env.write_txn().unwrap();
            store.meta_db.delete(&mut wtxn, BINDING_COUNT_KEY).unwrap();
            wtxn.commit().unwrap();
        }
        let env = LmdbEnvironment::open(dir.path(), MAP_SIZE).unwrap();
        let store = env.identity_store();
        let rtxn = store.env.read_txn().unwrap();
        assert_eq!(store.read_count(&rtxn).unwrap(), Some(3));
        drop(rtxn);
        assert_eq!(store.binding_count().unwrap(), 3);
    }

    #[test]
    fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let h = handle("persist");
        {
            let env = LmdbEnvironment::open(dir.path(), MAP_SIZE).unwrap();
            let store = env.identity_store();
            store
                .put_binding(&IdentityBinding::pending(h.clone(), wallet(8), Timestamp::new(1)))
                .unwrap();
        }
        let env = LmdbEnvironment::open(dir.path(), MAP_SIZE).unwrap();
        assert_eq!(env.identity_store().get_binding(&h).unwrap().unwrap().wallet, wallet(8));
    }

    #[test]
    fn schema_version_stamped_on_open() {
        let (_dir, env) = temp_env();
        assert_eq!(
            env.meta_store().get_schema_version().unwrap(),
            civitas_store::meta::CURRENT_SCHEMA_VERSION
        );
    }

    #[test]
    fn newer_schema_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        {
            let env = LmdbEnvironment::open(dir.path(), MAP_SIZE).unwrap();
            env.meta_store().set_schema_version(99).unwrap();
        }
        assert!(LmdbEnvironment::open(dir.path(), MAP_SIZE).is_err());
    }
}
