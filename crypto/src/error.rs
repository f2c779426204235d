use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid issuer key: {0}")]
    InvalidKey(String),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("signature recovery failed: {0}")]
    Recovery(String),

    #[error("entropy source unavailable: {0}")]
    Entropy(String),
}
