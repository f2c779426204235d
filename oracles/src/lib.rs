//! External collaborators of the registrar.
//!
//! Three questions are asked of the outside world:
//! - **Is this a unique human?** [`ProofVerifier`], backed by a
//!   proof-of-personhood service.
//! - **Does this wallet hold enough governance tokens?** [`BalanceOracle`],
//!   backed by an ERC-20 `balanceOf` call.
//! - **Has this wallet finished registration on-chain?** [`FinalityOracle`],
//!   backed by the voter registry contract.
//!
//! All three are network calls that can fail or stall. Callers
//! impose their own timeouts on top of the transport timeouts set here.

pub mod error;
pub mod evm;
pub mod personhood;

use async_trait::async_trait;
use civitas_types::{IdentityHandle, PersonhoodProof, WalletAddress};

pub use error::OracleError;
pub use evm::{EvmRpcClient, RegistryFinalityOracle, TokenBalanceOracle};
pub use personhood::{PersonhoodClient, PersonhoodConfig};

/// Verdict of the proof-of-personhood verifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// The proof is valid for the given signal; `identity` is the verifier's
    /// stable handle for this human.
    Accepted { identity: IdentityHandle },
    /// The verifier looked at the proof and said no.
    Rejected { reason: String },
}

/// Validates personhood attestations.
#[async_trait]
pub trait ProofVerifier: Send + Sync {
    /// Verify `proof` with the signal bound to `wallet`, so the same proof
    /// cannot be replayed for a different wallet.
    async fn verify(
        &self,
        proof: &PersonhoodProof,
        wallet: &WalletAddress,
    ) -> Result<VerificationOutcome, OracleError>;
}

/// Governance-token balance lookup.
#[async_trait]
pub trait BalanceOracle: Send + Sync {
    /// Token balance in base units. Values above `u128::MAX` saturate.
    async fn balance_of(&self, wallet: &WalletAddress) -> Result<u128, OracleError>;
}

/// Authoritative on-chain registration lookup.
#[async_trait]
pub trait FinalityOracle: Send + Sync {
    /// Whether `wallet` has completed voter registration on-chain.
    async fn is_finalized(&self, wallet: &WalletAddress) -> Result<bool, OracleError>;
}
