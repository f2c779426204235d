//! LMDB storage backend for the Civitas registrar.
//!
//! Implements the storage traits from `civitas-store` using the `heed` LMDB
//! bindings. Bindings and the wallet index share one named database using the
//! flat `binding:` / `wallet-index:` key layout; a second database holds
//! metadata such as the schema version.

pub mod environment;
pub mod error;
pub mod identity;
pub mod meta;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use identity::LmdbIdentityStore;
pub use meta::LmdbMetaStore;
