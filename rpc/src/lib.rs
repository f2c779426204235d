//! HTTP/JSON server for the Civitas registrar.
//!
//! Provides endpoints for:
//! - Wallet pre-check (advisory, read-only)
//! - Credential issuance
//! - Registrar status and diagnostics
//! - Liveness and Prometheus metrics

pub mod error;
pub mod handlers;
pub mod server;

pub use error::RpcError;
pub use server::{router, RpcServer, RpcState};
