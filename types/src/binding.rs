//! Identity bindings: the durable link between one unique human and one wallet.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{CivitasError, Timestamp, WalletAddress};

/// Opaque identifier of a unique human, issued by the proof-of-personhood
/// verifier (nullifier-like). Never generated locally.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IdentityHandle(String);

impl IdentityHandle {
    /// Wrap a handle string. Surrounding whitespace is trimmed; empty handles are rejected.
    ///
    /// `0x`-prefixed hex handles are field elements, so they are canonicalised
    /// to lower case without leading zeros: `0x002BF8` and `0x2bf8` name the
    /// same human. Other handles are kept verbatim.
    pub fn new(raw: impl Into<String>) -> Result<Self, CivitasError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CivitasError::InvalidIdentityHandle("empty".into()));
        }
        Ok(Self(canonical_hex(trimmed).unwrap_or_else(|| trimmed.to_string())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn canonical_hex(s: &str) -> Option<String> {
    let digits = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let significant = digits.trim_start_matches('0');
    let significant = if significant.is_empty() { "0" } else { significant };
    Some(format!("0x{}", significant.to_ascii_lowercase()))
}

impl fmt::Display for IdentityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for IdentityHandle {
    type Error = CivitasError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<IdentityHandle> for String {
    fn from(handle: IdentityHandle) -> Self {
        handle.0
    }
}

/// Lifecycle status of a binding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BindingStatus {
    /// Proof and balance checked, credential not yet signed.
    Pending,
    /// A credential has been signed for the bound wallet.
    Complete,
}

impl BindingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Complete => "complete",
        }
    }
}

/// The persisted `binding:<identityHandle>` record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityBinding {
    pub identity: IdentityHandle,
    pub wallet: WalletAddress,
    pub status: BindingStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl IdentityBinding {
    /// A fresh pending binding.
    pub fn pending(identity: IdentityHandle, wallet: WalletAddress, now: Timestamp) -> Self {
        Self {
            identity,
            wallet,
            status: BindingStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebind to `wallet` as pending, keeping the original creation time.
    pub fn rebound(&self, wallet: WalletAddress, now: Timestamp) -> Self {
        Self {
            identity: self.identity.clone(),
            wallet,
            status: BindingStatus::Pending,
            created_at: self.created_at,
            updated_at: now,
        }
    }

    /// Promote to complete.
    pub fn completed(&self, now: Timestamp) -> Self {
        Self {
            status: BindingStatus::Complete,
            updated_at: now,
            ..self.clone()
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status == BindingStatus::Complete
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wallet(n: u8) -> WalletAddress {
        WalletAddress::from_bytes([n; 20])
    }

    #[test]
    fn empty_handle_rejected() {
        assert!(IdentityHandle::new("").is_err());
        assert!(IdentityHandle::new("   ").is_err());
    }

    #[test]
    fn handle_is_trimmed() {
        assert_eq!(IdentityHandle::new(" 0xabc ").unwrap().as_str(), "0xabc");
    }

    #[test]
    fn hex_handles_are_canonical() {
        let lower = IdentityHandle::new("0x2bf8ab").unwrap();
        assert_eq!(IdentityHandle::new("0x2BF8AB").unwrap(), lower);
        assert_eq!(IdentityHandle::new("0X2Bf8aB").unwrap(), lower);
        assert_eq!(IdentityHandle::new("0x00002bf8ab").unwrap(), lower);
        assert_eq!(IdentityHandle::new("0x000").unwrap().as_str(), "0x0");
    }

    #[test]
    fn non_hex_handles_are_verbatim() {
        assert_eq!(IdentityHandle::new("Handle-1").unwrap().as_str(), "Handle-1");
        assert_eq!(IdentityHandle::new("0xZZ").unwrap().as_str(), "0xZZ");
        assert_eq!(IdentityHandle::new("0x").unwrap().as_str(), "0x");
    }

    #[test]
    fn deserialized_handles_are_canonical() {
        let h: IdentityHandle = serde_json::from_str("\"0x00AB\"").unwrap();
        assert_eq!(h.as_str(), "0xab");
    }

    #[test]
    fn lifecycle_keeps_created_at() {
        let h = IdentityHandle::new("h1").unwrap();
        let b = IdentityBinding::pending(h, wallet(1), Timestamp::new(10));
        assert_eq!(b.status, BindingStatus::Pending);

        let c = b.completed(Timestamp::new(20));
        assert!(c.is_complete());
        assert_eq!(c.created_at, Timestamp::new(10));
        assert_eq!(c.updated_at, Timestamp::new(20));

        let r = c.rebound(wallet(2), Timestamp::new(30));
        assert_eq!(r.status, BindingStatus::Pending);
        assert_eq!(r.wallet, wallet(2));
        assert_eq!(r.created_at, Timestamp::new(10));
    }

    #[test]
    fn binding_bincode_roundtrip() {
        let b = IdentityBinding::pending(
            IdentityHandle::new("h1").unwrap(),
            wallet(7),
            Timestamp::new(1_700_000_000),
        );
        let bytes = bincode::serialize(&b).unwrap();
        let back: IdentityBinding = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, b);
    }
}
