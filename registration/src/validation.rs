//! Request shape validation, run before any lock, external call or write.

use civitas_types::{IdentityHandle, PersonhoodProof, WalletAddress};

use crate::RegistrationError;

pub fn validate_wallet(raw: &str) -> Result<WalletAddress, RegistrationError> {
    WalletAddress::parse(raw).map_err(|e| RegistrationError::Validation(e.to_string()))
}

/// Validate an issue-credential request, returning the normalized wallet and
/// the identity handle the proof claims.
pub fn validate_issue(
    wallet: &str,
    proof: &PersonhoodProof,
) -> Result<(WalletAddress, IdentityHandle), RegistrationError> {
    let wallet = validate_wallet(wallet)?;
    let identity = proof
        .validate_shape()
        .map_err(|e| RegistrationError::Validation(e.to_string()))?;
    Ok((wallet, identity))
}
