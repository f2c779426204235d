//! Identity binding storage trait.

use crate::StoreError;
use civitas_types::{IdentityBinding, IdentityHandle, WalletAddress};

/// Trait for the identity cache: `binding:<handle>` records plus the
/// `wallet-index:<wallet>` reverse lookup.
///
/// Only single-key operations are offered. Callers that write a binding and
/// its index entry do so as two related writes; there is no cross-key
/// transaction.
pub trait IdentityStore: Send + Sync {
    /// Fetch the binding for an identity, if any.
    fn get_binding(&self, identity: &IdentityHandle) -> Result<Option<IdentityBinding>, StoreError>;

    /// Insert or overwrite the binding for `binding.identity`.
    fn put_binding(&self, binding: &IdentityBinding) -> Result<(), StoreError>;

    /// Remove the binding for an identity. Removing an absent key is not an error.
    fn delete_binding(&self, identity: &IdentityHandle) -> Result<(), StoreError>;

    /// Resolve the identity a wallet is indexed to.
    fn get_wallet_owner(&self, wallet: &WalletAddress) -> Result<Option<IdentityHandle>, StoreError>;

    /// Point `wallet` at `identity`.
    fn put_wallet_owner(&self, wallet: &WalletAddress, identity: &IdentityHandle) -> Result<(), StoreError>;

    /// Remove a wallet's index entry. Removing an absent key is not an error.
    fn delete_wallet_owner(&self, wallet: &WalletAddress) -> Result<(), StoreError>;

    /// Number of stored bindings.
    fn binding_count(&self) -> Result<u64, StoreError>;

    /// The binding a wallet currently belongs to.
    ///
    /// An index entry whose binding no longer names this wallet is an orphan
    /// left by an interrupted switch and resolves to `None`.
    fn binding_for_wallet(&self, wallet: &WalletAddress) -> Result<Option<IdentityBinding>, StoreError> {
        let Some(owner) = self.get_wallet_owner(wallet)? else {
            return Ok(None);
        };
        Ok(self
            .get_binding(&owner)?
            .filter(|binding| &binding.wallet == wallet))
    }
}
