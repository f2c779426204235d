//! The registrar: pre-check and issue-credential.
//!
//! `issue_credential` is the only code that mutates bindings, and it only
//! does so while holding the identity's registration lock. Every external
//! call carries `call_timeout`. All checks against external systems finish
//! before the first write, so an upstream failure leaves the store exactly
//! as it was.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, error, info, info_span, warn, Instrument};

use civitas_crypto::IssuerKey;
use civitas_oracles::{BalanceOracle, FinalityOracle, OracleError, ProofVerifier, VerificationOutcome};
use civitas_store::IdentityStore;
use civitas_types::{
    CredentialSignature, IdentityBinding, IdentityHandle, PersonhoodProof, Timestamp, WalletAddress,
};

use crate::state_machine::{classify, decide_switch, wallet_taken, RegistrationPath, SwitchDecision};
use crate::validation::{validate_issue, validate_wallet};
use crate::{Dependency, RegistrationError, RegistrationLocks, RegistrationMetrics};

/// Reason code for a wallet that is already registered.
const REASON_ALREADY_REGISTERED: &str = "wallet_already_registered";

#[derive(Clone, Debug)]
pub struct RegistrarConfig {
    /// Minimum governance-token balance, in base units.
    pub min_token_balance: u128,
    /// Upper bound on each external call.
    pub call_timeout: Duration,
}

impl Default for RegistrarConfig {
    fn default() -> Self {
        Self {
            min_token_balance: 1,
            call_timeout: Duration::from_secs(10),
        }
    }
}

/// An issue-credential request as received from a client.
#[derive(Clone, Debug)]
pub struct IssueRequest {
    pub wallet: String,
    pub proof: PersonhoodProof,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssuedCredential {
    pub signature: CredentialSignature,
    pub identity: IdentityHandle,
    pub wallet: WalletAddress,
}

/// Advisory answer to "would this wallet be allowed to register?".
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PreCheckOutcome {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl PreCheckOutcome {
    fn accepted() -> Self {
        Self {
            accepted: true,
            reason: None,
        }
    }

    fn rejected(reason: &str) -> Self {
        Self {
            accepted: false,
            reason: Some(reason.to_string()),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Diagnostics {
    pub min_token_balance: String,
    pub in_flight_registrations: usize,
    /// `None` when the store could not be read.
    pub bindings: Option<u64>,
    pub uptime_secs: u64,
    pub version: &'static str,
}

#[derive(Clone, Debug, Serialize)]
pub struct RegistrarStatus {
    pub issuer_address: WalletAddress,
    pub diagnostics: Diagnostics,
}

pub struct Registrar {
    store: Arc<dyn IdentityStore>,
    verifier: Arc<dyn ProofVerifier>,
    balances: Arc<dyn BalanceOracle>,
    finality: Arc<dyn FinalityOracle>,
    issuer: IssuerKey,
    config: RegistrarConfig,
    locks: RegistrationLocks,
    metrics: RegistrationMetrics,
    started_at: Instant,
}

impl Registrar {
    pub fn new(
        store: Arc<dyn IdentityStore>,
        verifier: Arc<dyn ProofVerifier>,
        balances: Arc<dyn BalanceOracle>,
        finality: Arc<dyn FinalityOracle>,
        issuer: IssuerKey,
        config: RegistrarConfig,
    ) -> Self {
        Self {
            store,
            verifier,
            balances,
            finality,
            issuer,
            config,
            locks: RegistrationLocks::new(),
            metrics: RegistrationMetrics::new(),
            started_at: Instant::now(),
        }
    }

    pub fn issuer_address(&self) -> &WalletAddress {
        self.issuer.address()
    }

    pub fn config(&self) -> &RegistrarConfig {
        &self.config
    }

    pub fn metrics(&self) -> &RegistrationMetrics {
        &self.metrics
    }

    pub fn locks(&self) -> &RegistrationLocks {
        &self.locks
    }

    /// Read-only eligibility check. Takes no lock and writes nothing.
    ///
    /// Oracle failures are logged and skipped; only the store and input
    /// validation can fail the call.
    pub async fn pre_check(&self, wallet: &str) -> Result<PreCheckOutcome, RegistrationError> {
        let wallet = validate_wallet(wallet)?;
        self.metrics.pre_checks.inc();

        if self
            .store
            .binding_for_wallet(&wallet)?
            .is_some_and(|binding| binding.is_complete())
        {
            return Ok(PreCheckOutcome::rejected(REASON_ALREADY_REGISTERED));
        }

        match self.call(self.finality.is_finalized(&wallet)).await {
            Ok(true) => return Ok(PreCheckOutcome::rejected(REASON_ALREADY_REGISTERED)),
            Ok(false) => {}
            Err(e) => warn!(%wallet, error = %e, "pre-check: finality oracle unavailable, skipping"),
        }

        match self.call(self.balances.balance_of(&wallet)).await {
            Ok(balance) if balance < self.config.min_token_balance => {
                return Ok(PreCheckOutcome::rejected("insufficient_token_balance"));
            }
            Ok(_) => {}
            Err(e) => warn!(%wallet, error = %e, "pre-check: balance oracle unavailable, skipping"),
        }

        Ok(PreCheckOutcome::accepted())
    }

    /// Verify, decide, persist and sign. See [`crate::state_machine`].
    pub async fn issue_credential(
        &self,
        request: &IssueRequest,
    ) -> Result<IssuedCredential, RegistrationError> {
        let started = Instant::now();
        let result = match validate_issue(&request.wallet, &request.proof) {
            Ok((wallet, identity)) => {
                let span = info_span!(
                    "issue_credential",
                    wallet = %wallet,
                    identity = %identity
                );
                self.issue_locked(wallet, identity, &request.proof)
                    .instrument(span)
                    .await
            }
            Err(e) => Err(e),
        };

        self.metrics
            .issue_duration_ms
            .observe(started.elapsed().as_secs_f64() * 1000.0);
        match &result {
            Ok(_) => self.metrics.credentials_issued.inc(),
            Err(e) => {
                self.metrics.record_rejection(e.code());
                match e {
                    RegistrationError::Internal(message) => {
                        error!(error = %message, "issue-credential failed")
                    }
                    other => info!(reason = other.code(), error = %other, "issue-credential rejected"),
                }
            }
        }
        result
    }

    async fn issue_locked(
        &self,
        wallet: WalletAddress,
        identity: IdentityHandle,
        proof: &PersonhoodProof,
    ) -> Result<IssuedCredential, RegistrationError> {
        let _guard = self
            .locks
            .try_acquire(&identity)
            .ok_or(RegistrationError::Busy)?;

        let existing = self.store.get_binding(&identity)?;
        let path = classify(existing.as_ref(), &wallet);
        debug!(path = path.as_str(), "classified registration");

        let signature = match path {
            RegistrationPath::Fresh => self.register(existing, &wallet, &identity, proof).await?,
            RegistrationPath::RetryPending => {
                info!("retrying pending registration");
                self.register(existing, &wallet, &identity, proof).await?
            }
            RegistrationPath::Reissue => {
                self.require_balance(&wallet).await?;
                let signature = self.issuer.sign_credential(&wallet)?;
                info!("re-issued credential");
                signature
            }
            RegistrationPath::SwitchCandidate { previous_wallet } => {
                self.switch(existing, &previous_wallet, &wallet, &identity, proof)
                    .await?
            }
        };

        Ok(IssuedCredential {
            signature,
            identity,
            wallet,
        })
    }

    /// Fresh registration, or a retry over a stale PENDING record.
    async fn register(
        &self,
        existing: Option<IdentityBinding>,
        wallet: &WalletAddress,
        identity: &IdentityHandle,
        proof: &PersonhoodProof,
    ) -> Result<CredentialSignature, RegistrationError> {
        self.verify_proof(proof, wallet, identity).await?;
        self.require_balance(wallet).await?;
        self.ensure_wallet_free(wallet, identity)?;

        let now = Timestamp::now();
        let pending = match existing {
            Some(stale) => stale.rebound(wallet.clone(), now),
            None => IdentityBinding::pending(identity.clone(), wallet.clone(), now),
        };
        self.store.put_binding(&pending)?;
        self.store.put_wallet_owner(wallet, identity)?;

        let signature = self.issuer.sign_credential(wallet)?;
        self.store.put_binding(&pending.completed(Timestamp::now()))?;
        info!("registered new binding");
        Ok(signature)
    }

    /// Move `identity` from `previous` to `wallet`, if `previous` has not
    /// finalized on-chain.
    async fn switch(
        &self,
        existing: Option<IdentityBinding>,
        previous: &WalletAddress,
        wallet: &WalletAddress,
        identity: &IdentityHandle,
        proof: &PersonhoodProof,
    ) -> Result<CredentialSignature, RegistrationError> {
        let finalized = match self.call(self.finality.is_finalized(previous)).await {
            Ok(finalized) => Some(finalized),
            Err(e) => {
                warn!(previous = %previous, error = %e, "finality oracle unavailable during switch");
                None
            }
        };
        match decide_switch(finalized) {
            SwitchDecision::Approve => {}
            SwitchDecision::RejectFinalized => {
                info!(previous = %previous, "switch rejected: previous wallet finalized");
                return Err(RegistrationError::SybilConflict);
            }
            SwitchDecision::RejectUnverified => {
                return Err(RegistrationError::upstream(
                    Dependency::FinalityOracle,
                    "finality of the bound wallet could not be established",
                ));
            }
        }

        self.verify_proof(proof, wallet, identity).await?;
        self.require_balance(wallet).await?;
        self.ensure_wallet_free(wallet, identity)?;

        let Some(current) = existing else {
            return Err(RegistrationError::Internal("switch without a binding".into()));
        };
        let now = Timestamp::now();
        let pending = current.rebound(wallet.clone(), now);
        self.store.put_binding(&pending)?;
        self.store.put_wallet_owner(wallet, identity)?;
        if self.store.get_wallet_owner(previous)?.as_ref() == Some(identity) {
            self.store.delete_wallet_owner(previous)?;
        }

        let signature = self.issuer.sign_credential(wallet)?;
        self.store.put_binding(&pending.completed(Timestamp::now()))?;
        self.metrics.wallet_switches.inc();
        info!(previous = %previous, "switch approved");
        Ok(signature)
    }

    async fn verify_proof(
        &self,
        proof: &PersonhoodProof,
        wallet: &WalletAddress,
        identity: &IdentityHandle,
    ) -> Result<(), RegistrationError> {
        let outcome = self
            .call(self.verifier.verify(proof, wallet))
            .await
            .map_err(|e| RegistrationError::upstream(Dependency::Verifier, e.to_string()))?;
        match outcome {
            VerificationOutcome::Accepted { identity: verified } if &verified == identity => Ok(()),
            VerificationOutcome::Accepted { identity: verified } => {
                warn!(verified = %verified, "verifier returned a different identity");
                Err(RegistrationError::ProofRejected("identity mismatch".into()))
            }
            VerificationOutcome::Rejected { reason } => Err(RegistrationError::ProofRejected(reason)),
        }
    }

    async fn require_balance(&self, wallet: &WalletAddress) -> Result<(), RegistrationError> {
        let balance = self
            .call(self.balances.balance_of(wallet))
            .await
            .map_err(|e| RegistrationError::upstream(Dependency::BalanceOracle, e.to_string()))?;
        let required = self.config.min_token_balance;
        if balance < required {
            return Err(RegistrationError::InsufficientBalance { balance, required });
        }
        Ok(())
    }

    fn ensure_wallet_free(
        &self,
        wallet: &WalletAddress,
        identity: &IdentityHandle,
    ) -> Result<(), RegistrationError> {
        let owner = self.store.binding_for_wallet(wallet)?;
        if wallet_taken(owner.as_ref(), identity) {
            return Err(RegistrationError::WalletTaken);
        }
        Ok(())
    }

    /// Run an oracle call under `call_timeout`.
    async fn call<T>(
        &self,
        fut: impl Future<Output = Result<T, OracleError>>,
    ) -> Result<T, OracleError> {
        tokio::time::timeout(self.config.call_timeout, fut)
            .await
            .map_err(|_| {
                OracleError::Timeout(format!("no answer within {:?}", self.config.call_timeout))
            })?
    }

    /// Issuer identity plus operational counters. Never fails.
    pub fn status(&self) -> RegistrarStatus {
        let bindings = match self.store.binding_count() {
            Ok(count) => Some(count),
            Err(e) => {
                warn!(error = %e, "status: binding count unavailable");
                None
            }
        };
        RegistrarStatus {
            issuer_address: self.issuer.address().clone(),
            diagnostics: Diagnostics {
                min_token_balance: self.config.min_token_balance.to_string(),
                in_flight_registrations: self.locks.in_flight(),
                bindings,
                uptime_secs: self.started_at.elapsed().as_secs(),
                version: env!("CARGO_PKG_VERSION"),
            },
        }
    }
}
