//! Issuer key management.
//!
//! The issuer key is the single secret whose compromise defeats Sybil
//! resistance. It is held only in memory, never logged, and zeroized on drop
//! by `k256`.

use std::fmt;

use civitas_types::WalletAddress;
use k256::ecdsa::SigningKey;
use zeroize::Zeroizing;

use crate::address::address_from_verifying_key;
use crate::CryptoError;

/// Attempts before giving up on drawing a valid scalar from the OS RNG.
const MAX_KEYGEN_ATTEMPTS: usize = 8;

/// The issuer's secp256k1 signing key plus its cached EVM address.
pub struct IssuerKey {
    signing_key: SigningKey,
    address: WalletAddress,
}

impl IssuerKey {
    /// Build from 32 raw secret bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let signing_key =
            SigningKey::from_slice(bytes).map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        let address = address_from_verifying_key(signing_key.verifying_key());
        Ok(Self {
            signing_key,
            address,
        })
    }

    /// Parse a hex-encoded secret (with or without `0x`).
    pub fn from_hex(hex_key: &str) -> Result<Self, CryptoError> {
        let trimmed = hex_key.trim();
        let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = Zeroizing::new(
            hex::decode(digits).map_err(|e| CryptoError::InvalidKey(format!("hex decode: {e}")))?,
        );
        if bytes.len() != 32 {
            return Err(CryptoError::InvalidKey(format!(
                "expected 32 bytes, got {}",
                bytes.len()
            )));
        }
        Self::from_bytes(&bytes)
    }

    /// Generate a fresh key from the operating system's entropy source.
    pub fn generate() -> Result<Self, CryptoError> {
        for _ in 0..MAX_KEYGEN_ATTEMPTS {
            let mut seed = Zeroizing::new([0u8; 32]);
            getrandom::getrandom(&mut seed[..])
                .map_err(|e| CryptoError::Entropy(e.to_string()))?;
            // Zero or >= curve order are rejected; draw again.
            if let Ok(key) = Self::from_bytes(&seed[..]) {
                return Ok(key);
            }
        }
        Err(CryptoError::Entropy(
            "no valid scalar after repeated draws".into(),
        ))
    }

    /// The EVM address the on-chain registry trusts as issuer.
    pub fn address(&self) -> &WalletAddress {
        &self.address
    }

    /// Hex-encoded secret, for key export by the operator tooling only.
    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.signing_key.to_bytes()))
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }
}

impl fmt::Debug for IssuerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuerKey")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_ONE: &str = "0x0000000000000000000000000000000000000000000000000000000000000001";

    #[test]
    fn from_hex_with_and_without_prefix() {
        let a = IssuerKey::from_hex(KEY_ONE).unwrap();
        let b = IssuerKey::from_hex(KEY_ONE.trim_start_matches("0x")).unwrap();
        assert_eq!(a.address(), b.address());
        assert_eq!(a.address().as_str(), "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf");
    }

    #[test]
    fn zero_key_rejected() {
        assert!(IssuerKey::from_bytes(&[0u8; 32]).is_err());
    }

    #[test]
    fn short_key_rejected() {
        assert!(IssuerKey::from_hex("0x01").is_err());
        assert!(IssuerKey::from_hex("not hex").is_err());
    }

    #[test]
    fn generated_keys_differ() {
        let a = IssuerKey::generate().unwrap();
        let b = IssuerKey::generate().unwrap();
        assert_ne!(a.address(), b.address());
    }

    #[test]
    fn export_roundtrip() {
        let a = IssuerKey::generate().unwrap();
        let b = IssuerKey::from_hex(&a.to_hex()).unwrap();
        assert_eq!(a.address(), b.address());
    }

    #[test]
    fn debug_does_not_leak_secret() {
        let key = IssuerKey::from_hex(KEY_ONE).unwrap();
        let dbg = format!("{key:?}");
        assert!(dbg.contains("0x7e5f4552"));
        assert!(!dbg.contains(&"0".repeat(63)));
    }
}
