//! Proof-of-personhood attestation as submitted by the client.

use serde::{Deserialize, Serialize};

use crate::{CivitasError, IdentityHandle};

/// A zero-knowledge proof of unique personhood.
///
/// All fields are opaque to this service; they are forwarded to the verifier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonhoodProof {
    /// The identity handle (nullifier hash) the proof claims.
    pub nullifier_hash: String,
    pub merkle_root: String,
    pub proof: String,
    pub verification_level: String,
}

impl PersonhoodProof {
    /// Check that every field is present, returning the claimed identity handle.
    pub fn validate_shape(&self) -> Result<IdentityHandle, CivitasError> {
        for (name, value) in [
            ("merkle_root", &self.merkle_root),
            ("proof", &self.proof),
            ("verification_level", &self.verification_level),
        ] {
            if value.trim().is_empty() {
                return Err(CivitasError::InvalidProof(format!("missing {name}")));
            }
        }
        IdentityHandle::new(self.nullifier_hash.as_str())
            .map_err(|_| CivitasError::InvalidProof("missing nullifier_hash".into()))
    }
}
