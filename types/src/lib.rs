//! Fundamental types for the Civitas voter registrar.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! wallet addresses, identity handles, bindings, personhood proofs, credential
//! signatures and timestamps.

pub mod address;
pub mod binding;
pub mod error;
pub mod proof;
pub mod signature;
pub mod time;

pub use address::WalletAddress;
pub use binding::{BindingStatus, IdentityBinding, IdentityHandle};
pub use error::CivitasError;
pub use proof::PersonhoodProof;
pub use signature::CredentialSignature;
pub use time::Timestamp;
