//! Registration core of the Civitas voter registrar.
//!
//! Binds one proof of unique personhood to exactly one wallet and issues the
//! signed credential the on-chain registry accepts. The pieces:
//!
//! - [`lock`]: non-blocking, per-identity mutual exclusion.
//! - [`state_machine`]: decides between fresh registration, re-issue, retry
//!   and wallet switch.
//! - [`orchestrator`]: the [`Registrar`], which runs pre-check and
//!   issue-credential against the store, the verifier and the chain oracles.
//!
//! The identity store is a cache. Only the finality oracle can say whether a
//! wallet has finalized on-chain, and a switch is refused whenever it cannot
//! answer.

pub mod error;
pub mod lock;
pub mod metrics;
pub mod orchestrator;
pub mod state_machine;
pub mod validation;

pub use error::{Dependency, RegistrationError};
pub use lock::{RegistrationGuard, RegistrationLocks};
pub use metrics::RegistrationMetrics;
pub use orchestrator::{
    Diagnostics, IssueRequest, IssuedCredential, PreCheckOutcome, Registrar, RegistrarConfig,
    RegistrarStatus,
};
pub use state_machine::{RegistrationPath, SwitchDecision};
