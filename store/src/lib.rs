//! Abstract storage traits for the Civitas registrar.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The registration core depends only on the traits, so it can be
//! handed any backend at construction time.
//!
//! The store is a cache subordinate to the on-chain registry: it answers
//! "who did we last bind?" quickly, but never "is this finalized?".

pub mod error;
pub mod identity;
pub mod keys;
pub mod meta;

pub use error::StoreError;
pub use identity::IdentityStore;
pub use meta::MetaStore;
