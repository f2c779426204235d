//! Top-level error type shared across crates.

use thiserror::Error;

/// Common error type for malformed domain values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CivitasError {
    #[error("invalid wallet address: {0}")]
    InvalidAddress(String),

    #[error("invalid identity handle: {0}")]
    InvalidIdentityHandle(String),

    #[error("invalid proof: {0}")]
    InvalidProof(String),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),
}
