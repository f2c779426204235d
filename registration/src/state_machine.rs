//! Sybil-prevention decisions.
//!
//! Per identity: UNKNOWN -> PENDING -> COMPLETE. A COMPLETE binding may move
//! back to PENDING with a new wallet only through a wallet switch, and a
//! switch is only allowed while the old wallet has not finalized on-chain.
//!
//! These functions are pure; the orchestrator supplies the store and oracle
//! answers and performs the side effects.

use civitas_types::{IdentityBinding, IdentityHandle, WalletAddress};

/// Which branch an issue-credential call takes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistrationPath {
    /// No binding for this identity.
    Fresh,
    /// COMPLETE binding to the same wallet: re-sign without mutation.
    Reissue,
    /// PENDING binding to the same wallet: redo verification and overwrite.
    RetryPending,
    /// Bound to another wallet: allowed only if that wallet is not finalized.
    SwitchCandidate { previous_wallet: WalletAddress },
}

impl RegistrationPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fresh => "fresh",
            Self::Reissue => "reissue",
            Self::RetryPending => "retry_pending",
            Self::SwitchCandidate { .. } => "switch",
        }
    }
}

/// Pick the branch for `candidate` given the identity's current binding.
pub fn classify(existing: Option<&IdentityBinding>, candidate: &WalletAddress) -> RegistrationPath {
    match existing {
        None => RegistrationPath::Fresh,
        Some(binding) if &binding.wallet == candidate => {
            if binding.is_complete() {
                RegistrationPath::Reissue
            } else {
                RegistrationPath::RetryPending
            }
        }
        Some(binding) => RegistrationPath::SwitchCandidate {
            previous_wallet: binding.wallet.clone(),
        },
    }
}

/// Outcome of the finality check on a switch candidate's old wallet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SwitchDecision {
    Approve,
    /// The old wallet finalized on-chain: this is a second registration.
    RejectFinalized,
    /// Finality could not be established. Never treated as "not finalized".
    RejectUnverified,
}

/// Decide a switch from the finality oracle's answer (`None` if it failed).
pub fn decide_switch(old_wallet_finalized: Option<bool>) -> SwitchDecision {
    match old_wallet_finalized {
        Some(false) => SwitchDecision::Approve,
        Some(true) => SwitchDecision::RejectFinalized,
        None => SwitchDecision::RejectUnverified,
    }
}

/// Whether `wallet`'s current owner (per the store) blocks binding it to
/// `identity`. Orphaned index entries must already be filtered out.
pub fn wallet_taken(owner: Option<&IdentityBinding>, identity: &IdentityHandle) -> bool {
    owner.is_some_and(|binding| &binding.identity != identity)
}
