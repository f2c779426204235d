//! Nullable collaborators: scripted verifier and chain oracles.

use async_trait::async_trait;
use civitas_oracles::{BalanceOracle, FinalityOracle, OracleError, ProofVerifier, VerificationOutcome};
use civitas_types::{IdentityHandle, PersonhoodProof, WalletAddress};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// A proof verifier that accepts every well-formed proof unless told
/// otherwise. Accepted proofs resolve to the submitted nullifier hash.
pub struct NullProofVerifier {
    rejected_wallets: Mutex<HashMap<String, String>>,
    handle_overrides: Mutex<HashMap<String, IdentityHandle>>,
    reject_all: Mutex<Option<String>>,
    unreachable: AtomicBool,
    delay: Mutex<Option<Duration>>,
    calls: AtomicUsize,
}

impl NullProofVerifier {
    pub fn new() -> Self {
        Self {
            rejected_wallets: Mutex::new(HashMap::new()),
            handle_overrides: Mutex::new(HashMap::new()),
            reject_all: Mutex::new(None),
            unreachable: AtomicBool::new(false),
            delay: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    /// Reject proofs whose signal is `wallet`.
    pub fn reject_wallet(&self, wallet: &WalletAddress, reason: &str) {
        self.rejected_wallets
            .lock()
            .unwrap()
            .insert(wallet.to_string(), reason.to_string());
    }

    /// Reject every proof.
    pub fn reject_all(&self, reason: &str) {
        *self.reject_all.lock().unwrap() = Some(reason.to_string());
    }

    /// Answer proofs for `wallet` with a different handle than the submitted one.
    pub fn resolve_wallet_to(&self, wallet: &WalletAddress, identity: IdentityHandle) {
        self.handle_overrides
            .lock()
            .unwrap()
            .insert(wallet.to_string(), identity);
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Sleep this long before answering.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for NullProofVerifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProofVerifier for NullProofVerifier {
    async fn verify(
        &self,
        proof: &PersonhoodProof,
        wallet: &WalletAddress,
    ) -> Result<VerificationOutcome, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(OracleError::Unreachable("null verifier offline".into()));
        }
        if let Some(reason) = self.reject_all.lock().unwrap().clone() {
            return Ok(VerificationOutcome::Rejected { reason });
        }
        if let Some(reason) = self.rejected_wallets.lock().unwrap().get(wallet.as_str()) {
            return Ok(VerificationOutcome::Rejected {
                reason: reason.clone(),
            });
        }
        if let Some(identity) = self.handle_overrides.lock().unwrap().get(wallet.as_str()) {
            return Ok(VerificationOutcome::Accepted {
                identity: identity.clone(),
            });
        }
        let identity = IdentityHandle::new(proof.nullifier_hash.as_str())
            .map_err(|e| OracleError::InvalidResponse(e.to_string()))?;
        Ok(VerificationOutcome::Accepted { identity })
    }
}

/// A token-balance oracle backed by a map. Unknown wallets hold the default
/// balance.
pub struct NullBalanceOracle {
    balances: Mutex<HashMap<String, u128>>,
    default_balance: u128,
    unavailable: AtomicBool,
    calls: AtomicUsize,
}

impl NullBalanceOracle {
    pub fn new(default_balance: u128) -> Self {
        Self {
            balances: Mutex::new(HashMap::new()),
            default_balance,
            unavailable: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_balance(&self, wallet: &WalletAddress, balance: u128) {
        self.balances
            .lock()
            .unwrap()
            .insert(wallet.to_string(), balance);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for NullBalanceOracle {
    fn default() -> Self {
        Self::new(0)
    }
}

#[async_trait]
impl BalanceOracle for NullBalanceOracle {
    async fn balance_of(&self, wallet: &WalletAddress) -> Result<u128, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(OracleError::Unreachable("null balance oracle offline".into()));
        }
        Ok(self
            .balances
            .lock()
            .unwrap()
            .get(wallet.as_str())
            .copied()
            .unwrap_or(self.default_balance))
    }
}

/// A finality oracle backed by a set of finalized wallets.
pub struct NullFinalityOracle {
    finalized: Mutex<HashSet<String>>,
    unreachable: AtomicBool,
    calls: AtomicUsize,
}

impl NullFinalityOracle {
    pub fn new() -> Self {
        Self {
            finalized: Mutex::new(HashSet::new()),
            unreachable: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn finalize(&self, wallet: &WalletAddress) {
        self.finalized.lock().unwrap().insert(wallet.to_string());
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for NullFinalityOracle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FinalityOracle for NullFinalityOracle {
    async fn is_finalized(&self, wallet: &WalletAddress) -> Result<bool, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(OracleError::Unreachable("null finality oracle offline".into()));
        }
        Ok(self.finalized.lock().unwrap().contains(wallet.as_str()))
    }
}
