//! EVM address derivation from secp256k1 public keys.
//!
//! Address = last 20 bytes of keccak256(uncompressed_public_key[1..]).

use civitas_types::WalletAddress;
use k256::ecdsa::VerifyingKey;

use crate::hash::keccak256;

/// Derive the EVM address controlled by a public key.
pub fn address_from_verifying_key(key: &VerifyingKey) -> WalletAddress {
    let point = key.to_encoded_point(false);
    // Skip the 0x04 uncompressed-point tag.
    let hash = keccak256(&point.as_bytes()[1..]);
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&hash[12..]);
    WalletAddress::from_bytes(bytes)
}
