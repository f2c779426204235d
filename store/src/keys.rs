//! Persisted key layout.
//!
//! ```text
//! binding:<identityHandle>  -> IdentityBinding
//! wallet-index:<wallet>     -> identityHandle
//! ```
//!
//! Flat key/value; wallets are always stored in normalized lower-case form.

use civitas_types::{IdentityHandle, WalletAddress};

pub const BINDING_PREFIX: &str = "binding:";
pub const WALLET_INDEX_PREFIX: &str = "wallet-index:";

pub fn binding_key(identity: &IdentityHandle) -> String {
    format!("{BINDING_PREFIX}{}", identity.as_str())
}

pub fn wallet_index_key(wallet: &WalletAddress) -> String {
    format!("{WALLET_INDEX_PREFIX}{}", wallet.as_str())
}
