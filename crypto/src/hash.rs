//! Keccak-256 hashing for credentials, calldata and verifier signals.

use civitas_types::WalletAddress;
use sha3::{Digest, Keccak256};

/// EIP-191 prefix for a 32-byte personal message.
const EIP191_PREFIX_32: &[u8] = b"\x19Ethereum Signed Message:\n32";

/// Compute a 256-bit Keccak hash of arbitrary data.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// The credential message for a wallet: `keccak256(abi.encodePacked(wallet))`.
///
/// Only the 20 address bytes enter the hash.
pub fn credential_message_hash(wallet: &WalletAddress) -> [u8; 32] {
    keccak256(&wallet.to_bytes())
}

/// Wrap a 32-byte message in the EIP-191 personal-sign envelope.
pub fn eth_signed_message_hash(message: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(EIP191_PREFIX_32);
    hasher.update(message);
    hasher.finalize().into()
}

/// First four bytes of `keccak256(signature)`, e.g. `balanceOf(address)`.
pub fn function_selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Hash a verifier signal into the field: keccak256 shifted right by 8 bits,
/// rendered as `0x`-prefixed hex.
///
/// The signal is the lower-case wallet address, which binds the proof to the
/// wallet it was generated for.
pub fn signal_hash(signal: &str) -> String {
    let hash = keccak256(signal.as_bytes());
    let mut shifted = [0u8; 32];
    shifted[1..].copy_from_slice(&hash[..31]);
    format!("0x{}", hex::encode(shifted))
}
