//! Shared utilities for the Civitas registrar.

pub mod logging;

pub use logging::{init_logging, LogFormat, LoggingError};
