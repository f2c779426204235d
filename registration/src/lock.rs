//! Per-identity registration locks.
//!
//! Acquisition never waits: a second caller for a handle that is already
//! locked gets `None` immediately. The lock is process-local; running more
//! than one registrar process against the same store needs a distributed
//! lock instead.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use civitas_types::IdentityHandle;

/// The set of identity handles with a registration in flight.
#[derive(Default)]
pub struct RegistrationLocks {
    held: Mutex<HashSet<IdentityHandle>>,
}

/// Holds the lock for one identity; releases it when dropped, on every exit
/// path including panics and cancelled futures.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct RegistrationGuard<'a> {
    locks: &'a RegistrationLocks,
    identity: IdentityHandle,
}

impl RegistrationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn held(&self) -> MutexGuard<'_, HashSet<IdentityHandle>> {
        // The set is only touched by insert/remove, so a panic elsewhere
        // cannot leave it half-updated.
        self.held.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock `identity`, or return `None` if it is already locked.
    pub fn try_acquire(&self, identity: &IdentityHandle) -> Option<RegistrationGuard<'_>> {
        if !self.held().insert(identity.clone()) {
            return None;
        }
        Some(RegistrationGuard {
            locks: self,
            identity: identity.clone(),
        })
    }

    pub fn is_locked(&self, identity: &IdentityHandle) -> bool {
        self.held().contains(identity)
    }

    /// Number of registrations currently holding a lock.
    pub fn in_flight(&self) -> usize {
        self.held().len()
    }
}

impl RegistrationGuard<'_> {
    pub fn identity(&self) -> &IdentityHandle {
        &self.identity
    }
}

impl Drop for RegistrationGuard<'_> {
    fn drop(&mut self) {
        self.locks.held().remove(&self.identity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(s: &str) -> IdentityHandle {
        IdentityHandle::new(s).unwrap()
    }

    #[test]
    fn second_acquire_is_busy() {
        let locks = RegistrationLocks::new();
        let guard = locks.try_acquire(&handle("h1")).unwrap();
        assert!(locks.try_acquire(&handle("h1")).is_none());
        assert!(locks.is_locked(guard.identity()));
        assert_eq!(locks.in_flight(), 1);
    }

    #[test]
    fn distinct_handles_do_not_contend() {
        let locks = RegistrationLocks::new();
        let _a = locks.try_acquire(&handle("h1")).unwrap();
        let _b = locks.try_acquire(&handle("h2")).unwrap();
        assert_eq!(locks.in_flight(), 2);
    }

    #[test]
    fn drop_releases() {
        let locks = RegistrationLocks::new();
        {
            let _guard = locks.try_acquire(&handle("h1")).unwrap();
        }
        assert!(!locks.is_locked(&handle("h1")));
        assert!(locks.try_acquire(&handle("h1")).is_some());
    }

    #[test]
    fn panic_while_held_still_releases() {
        let locks = RegistrationLocks::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = locks.try_acquire(&handle("h1")).unwrap();
            panic!("boom");
        }));
        assert!(result.is_err());
        assert_eq!(locks.in_flight(), 0);
    }
}
