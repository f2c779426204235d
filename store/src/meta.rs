//! Metadata storage trait.

use crate::StoreError;

/// Schema version written by the current code.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Internal bookkeeping that doesn't belong to the binding layout.
pub trait MetaStore {
    /// Get the current database schema version (0 when never set).
    fn get_schema_version(&self) -> Result<u32, StoreError>;

    /// Set the database schema version.
    fn set_schema_version(&self, version: u32) -> Result<(), StoreError>;
}
