//! Credential signature: 65-byte recoverable secp256k1 signature (`r ‖ s ‖ v`).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::CivitasError;

/// A signed eligibility credential, as accepted by the on-chain registry.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CredentialSignature(pub [u8; 65]);

impl CredentialSignature {
    pub fn as_bytes(&self) -> &[u8; 65] {
        &self.0
    }

    /// `0x`-prefixed lower-case hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    pub fn from_hex(s: &str) -> Result<Self, CivitasError> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let bytes =
            hex::decode(digits).map_err(|e| CivitasError::InvalidSignature(e.to_string()))?;
        let arr: [u8; 65] = bytes
            .try_into()
            .map_err(|v: Vec<u8>| CivitasError::InvalidSignature(format!("{} bytes", v.len())))?;
        Ok(Self(arr))
    }

    /// The recovery byte (27 or 28).
    pub fn v(&self) -> u8 {
        self.0[64]
    }
}

impl fmt::Debug for CredentialSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CredentialSignature({})", self.to_hex())
    }
}

impl fmt::Display for CredentialSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl TryFrom<String> for CredentialSignature {
    type Error = CivitasError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_hex(&s)
    }
}

impl From<CredentialSignature> for String {
    fn from(sig: CredentialSignature) -> Self {
        sig.to_hex()
    }
}
