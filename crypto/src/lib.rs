//! Cryptographic primitives for the Civitas registrar.
//!
//! - **secp256k1** recoverable ECDSA for issuer credentials (EVM compatible)
//! - **Keccak-256** for message hashing and address derivation
//! - **EIP-191** personal-message prefixing, so the registry contract can
//!   verify credentials with a plain `ecrecover`
//!
//! The credential scheme is fixed and must stay byte-for-byte reproducible by
//! the on-chain verifier:
//!
//! ```text
//! message = keccak256(wallet_address_20_bytes)
//! digest  = keccak256("\x19Ethereum Signed Message:\n32" ++ message)
//! sig     = r ++ s ++ v      (v = 27 + recovery id)
//! ```

pub mod address;
pub mod error;
pub mod hash;
pub mod keys;
pub mod sign;

pub use address::address_from_verifying_key;
pub use error::CryptoError;
pub use hash::{credential_message_hash, eth_signed_message_hash, function_selector, keccak256, signal_hash};
pub use keys::IssuerKey;
pub use sign::{recover_signer, verify_credential};
