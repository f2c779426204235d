//! Nullable infrastructure for deterministic testing.
//!
//! Every external dependency of the registrar (identity store, proof
//! verifier, token-balance oracle, finality oracle) sits behind a trait.
//! This crate provides in-memory implementations that:
//! - Return scripted answers
//! - Can be switched into an outage at any point
//! - Count calls so tests can assert which paths ran
//! - Never touch the filesystem or network
//!
//! Usage: hand these to the registrar in place of the real adapters.

pub mod oracles;
pub mod store;

pub use oracles::{NullBalanceOracle, NullFinalityOracle, NullProofVerifier};
pub use store::NullIdentityStore;
