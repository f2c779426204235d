//! Nullable identity store: thread-safe in-memory storage for testing.

use civitas_store::{IdentityStore, StoreError};
use civitas_types::{IdentityBinding, IdentityHandle, WalletAddress};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// An in-memory binding + wallet-index store for testing.
/// Thread-safe for use with tokio's multi-threaded runtime.
pub struct NullIdentityStore {
    bindings: Mutex<HashMap<String, IdentityBinding>>,
    wallet_index: Mutex<HashMap<String, IdentityHandle>>,
    unavailable: AtomicBool,
    writes_unavailable: AtomicBool,
    writes: AtomicUsize,
}

impl NullIdentityStore {
    pub fn new() -> Self {
        Self {
            bindings: Mutex::new(HashMap::new()),
            wallet_index: Mutex::new(HashMap::new()),
            unavailable: AtomicBool::new(false),
            writes_unavailable: AtomicBool::new(false),
            writes: AtomicUsize::new(0),
        }
    }

    /// Make every operation fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Keep reads working but fail every write.
    pub fn set_writes_unavailable(&self, unavailable: bool) {
        self.writes_unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of successful mutating calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Seed a binding and its index entry directly.
    pub fn insert(&self, binding: IdentityBinding) {
        self.wallet_index
            .lock()
            .unwrap()
            .insert(binding.wallet.to_string(), binding.identity.clone());
        self.bindings
            .lock()
            .unwrap()
            .insert(binding.identity.to_string(), binding);
    }

    /// Seed a bare index entry, e.g. an orphan left by an interrupted switch.
    pub fn insert_wallet_owner(&self, wallet: &WalletAddress, identity: &IdentityHandle) {
        self.wallet_index
            .lock()
            .unwrap()
            .insert(wallet.to_string(), identity.clone());
    }

    fn check_read(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("null store offline".into()));
        }
        Ok(())
    }

    fn check_write(&self) -> Result<(), StoreError> {
        self.check_read()?;
        if self.writes_unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("null store rejecting writes".into()));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Default for NullIdentityStore {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityStore for NullIdentityStore {
    fn get_binding(&self, identity: &IdentityHandle) -> Result<Option<IdentityBinding>, StoreError> {
        self.check_read()?;
        Ok(self.bindings.lock().unwrap().get(identity.as_str()).cloned())
    }

    fn put_binding(&self, binding: &IdentityBinding) -> Result<(), StoreError> {
        self.check_write()?;
        self.bindings
            .lock()
            .unwrap()
            .insert(binding.identity.to_string(), binding.clone());
        Ok(())
    }

    fn delete_binding(&self, identity: &IdentityHandle) -> Result<(), StoreError> {
        self.check_write()?;
        self.bindings.lock().unwrap().remove(identity.as_str());
        Ok(())
    }

    fn get_wallet_owner(&self, wallet: &WalletAddress) -> Result<Option<IdentityHandle>, StoreError> {
        self.check_read()?;
        Ok(self.wallet_index.lock().unwrap().get(wallet.as_str()).cloned())
    }

    fn put_wallet_owner(&self, wallet: &WalletAddress, identity: &IdentityHandle) -> Result<(), StoreError> {
        self.check_write()?;
        self.wallet_index
            .lock()
            .unwrap()
            .insert(wallet.to_string(), identity.clone());
        Ok(())
    }

    fn delete_wallet_owner(&self, wallet: &WalletAddress) -> Result<(), StoreError> {
        self.check_write()?;
        self.wallet_index.lock().unwrap().remove(wallet.as_str());
        Ok(())
    }

    fn binding_count(&self) -> Result<u64, StoreError> {
        self.check_read()?;
        Ok(self.bindings.lock().unwrap().len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use civitas_types::Timestamp;

    fn binding(handle: &str, byte: u8) -> IdentityBinding {
        IdentityBinding::pending(
            IdentityHandle::new(handle).unwrap(),
            WalletAddress::from_bytes([byte; 20]),
            Timestamp::new(100),
        )
    }

    #[test]
    fn seeded_binding_resolves_by_wallet() {
        let store = NullIdentityStore::new();
        let b = binding("h1", 0xAA);
        store.insert(b.clone());
        assert_eq!(store.binding_for_wallet(&b.wallet).unwrap(), Some(b));
        assert_eq!(store.binding_count().unwrap(), 1);
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn outage_fails_reads_and_writes() {
        let store = NullIdentityStore::new();
        store.set_unavailable(true);
        let b = binding("h1", 0xAA);
        assert!(matches!(store.get_binding(&b.identity), Err(StoreError::Unavailable(_))));
        assert!(store.put_binding(&b).is_err());
        store.set_unavailable(false);
        assert!(store.put_binding(&b).is_ok());
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn write_outage_keeps_reads() {
        let store = NullIdentityStore::new();
        let b = binding("h1", 0xAA);
        store.insert(b.clone());
        store.set_writes_unavailable(true);
        assert!(store.get_binding(&b.identity).unwrap().is_some());
        assert!(store.delete_binding(&b.identity).is_err());
    }
}
