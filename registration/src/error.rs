use civitas_crypto::CryptoError;
use civitas_store::StoreError;
use std::fmt;
use thiserror::Error;

/// External dependency that failed to answer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dependency {
    Verifier,
    BalanceOracle,
    FinalityOracle,
    Store,
}

impl Dependency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Verifier => "verifier",
            Self::BalanceOracle => "balance_oracle",
            Self::FinalityOracle => "finality_oracle",
            Self::Store => "store",
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a registration request did not produce a credential.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// Malformed input, caught before any external call.
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("a registration for this identity is already in progress")]
    Busy,

    #[error("proof rejected: {0}")]
    ProofRejected(String),

    #[error("token balance {balance} below required {required}")]
    InsufficientBalance { balance: u128, required: u128 },

    /// The identity is bound to a wallet that has finalized on-chain.
    #[error("identity already registered to a finalized wallet")]
    SybilConflict,

    #[error("wallet is bound to another identity")]
    WalletTaken,

    #[error("{dependency} unavailable: {message}")]
    Upstream {
        dependency: Dependency,
        message: String,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

impl RegistrationError {
    pub fn upstream(dependency: Dependency, message: impl Into<String>) -> Self {
        Self::Upstream {
            dependency,
            message: message.into(),
        }
    }

    /// Stable machine-readable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "invalid_request",
            Self::Busy => "registration_in_progress",
            Self::ProofRejected(_) => "proof_rejected",
            Self::InsufficientBalance { .. } => "insufficient_token_balance",
            Self::SybilConflict => "identity_already_registered",
            Self::WalletTaken => "wallet_bound_to_other_identity",
            Self::Upstream { .. } => "upstream_unavailable",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Whether the same request may succeed if sent again later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Busy | Self::Upstream { .. })
    }
}

impl From<StoreError> for RegistrationError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Unavailable(_) | StoreError::Backend(_) => {
                Self::upstream(Dependency::Store, e.to_string())
            }
            StoreError::Serialization(_) | StoreError::Corruption(_) => Self::Internal(e.to_string()),
        }
    }
}

impl From<CryptoError> for RegistrationError {
    fn from(e: CryptoError) -> Self {
        Self::Internal(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_categories() {
        assert!(RegistrationError::Busy.is_retryable());
        assert!(RegistrationError::upstream(Dependency::FinalityOracle, "down").is_retryable());
        assert!(!RegistrationError::SybilConflict.is_retryable());
        assert!(!RegistrationError::Internal("x".into()).is_retryable());
    }

    #[test]
    fn store_outage_is_upstream() {
        let err: RegistrationError = StoreError::Unavailable("disk".into()).into();
        assert_eq!(err.code(), "upstream_unavailable");
        assert!(matches!(
            err,
            RegistrationError::Upstream {
                dependency: Dependency::Store,
                ..
            }
        ));

        let err: RegistrationError = StoreError::Corruption("bad".into()).into();
        assert_eq!(err.code(), "internal_error");
    }
}
