//! Credential signing and recovery.

use civitas_types::{CredentialSignature, WalletAddress};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};

use crate::address::address_from_verifying_key;
use crate::hash::{credential_message_hash, eth_signed_message_hash};
use crate::{CryptoError, IssuerKey};

/// Offset added to the recovery id to form `v`.
const V_OFFSET: u8 = 27;

fn credential_digest(wallet: &WalletAddress) -> [u8; 32] {
    eth_signed_message_hash(&credential_message_hash(wallet))
}

impl IssuerKey {
    /// Sign the eligibility credential for `wallet`.
    ///
    /// Nothing but the wallet address enters the signed message.
    pub fn sign_credential(&self, wallet: &WalletAddress) -> Result<CredentialSignature, CryptoError> {
        let digest = credential_digest(wallet);
        let (sig, recid) = self
            .signing_key()
            .sign_prehash_recoverable(&digest)
            .map_err(|e| CryptoError::Signing(e.to_string()))?;

        let mut out = [0u8; 65];
        out[..64].copy_from_slice(&sig.to_bytes());
        out[64] = V_OFFSET + recid.to_byte();
        Ok(CredentialSignature(out))
    }
}

/// Recover the address that signed `wallet`'s credential, exactly as the
/// registry contract's `ecrecover` would.
pub fn recover_signer(
    wallet: &WalletAddress,
    signature: &CredentialSignature,
) -> Result<WalletAddress, CryptoError> {
    let raw = signature.as_bytes();
    let v = raw[64];
    let recid = v
        .checked_sub(V_OFFSET)
        .and_then(RecoveryId::from_byte)
        .ok_or_else(|| CryptoError::Recovery(format!("invalid v byte {v}")))?;
    let sig =
        Signature::from_slice(&raw[..64]).map_err(|e| CryptoError::Recovery(e.to_string()))?;
    let digest = credential_digest(wallet);
    let key = VerifyingKey::recover_from_prehash(&digest, &sig, recid)
        .map_err(|e| CryptoError::Recovery(e.to_string()))?;
    Ok(address_from_verifying_key(&key))
}

/// Whether `signature` is `issuer`'s credential for `wallet`.
pub fn verify_credential(
    wallet: &WalletAddress,
    signature: &CredentialSignature,
    issuer: &WalletAddress,
) -> bool {
    recover_signer(wallet, signature).is_ok_and(|signer| &signer == issuer)
}
