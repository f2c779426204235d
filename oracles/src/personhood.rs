//! HTTP client for the proof-of-personhood verifier.
//!
//! Sends `POST {base_url}/api/v2/verify/{app_id}` with the attestation, the
//! action, and the hashed signal. The signal is the candidate wallet, so an
//! attestation generated for one wallet fails verification for any other.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use civitas_crypto::signal_hash;
use civitas_types::{IdentityHandle, PersonhoodProof, WalletAddress};

use crate::{OracleError, ProofVerifier, VerificationOutcome};

/// Default timeout for verification requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Where and as whom to verify.
#[derive(Clone, Debug)]
pub struct PersonhoodConfig {
    /// Verifier base URL, e.g. `https://developer.worldcoin.org`.
    pub base_url: String,
    /// Application identifier registered with the verifier.
    pub app_id: String,
    /// Action the proof must be scoped to.
    pub action: String,
    pub timeout: Duration,
}

impl PersonhoodConfig {
    pub fn new(base_url: impl Into<String>, app_id: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            app_id: app_id.into(),
            action: action.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Client for the verifier's cloud verification endpoint.
pub struct PersonhoodClient {
    http_client: reqwest::Client,
    config: PersonhoodConfig,
}

#[derive(Debug, Serialize)]
struct VerifyRequest<'a> {
    nullifier_hash: &'a str,
    merkle_root: &'a str,
    proof: &'a str,
    verification_level: &'a str,
    action: &'a str,
    signal_hash: String,
}

/// Body of a successful verification.
#[derive(Debug, Default, Deserialize)]
struct VerifySuccess {
    #[serde(default)]
    nullifier_hash: Option<String>,
}

/// Body of a rejected verification: `{"code": "...", "detail": "..."}`.
#[derive(Debug, Default, Deserialize)]
struct VerifyFailure {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

impl PersonhoodClient {
    pub fn new(config: PersonhoodConfig) -> Result<Self, OracleError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .map_err(|e| OracleError::RequestFailed(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http_client,
            config,
        })
    }

    fn verify_url(&self) -> String {
        format!(
            "{}/api/v2/verify/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.app_id
        )
    }
}

#[async_trait]
impl ProofVerifier for PersonhoodClient {
    async fn verify(
        &self,
        proof: &PersonhoodProof,
        wallet: &WalletAddress,
    ) -> Result<VerificationOutcome, OracleError> {
        let body = VerifyRequest {
            nullifier_hash: &proof.nullifier_hash,
            merkle_root: &proof.merkle_root,
            proof: &proof.proof,
            verification_level: &proof.verification_level,
            action: &self.config.action,
            signal_hash: signal_hash(wallet.as_str()),
        };

        let response = self
            .http_client
            .post(self.verify_url())
            .json(&body)
            .send()
            .await
            .map_err(OracleError::from_transport)?;

        let status = response.status();
        debug!(%status, %wallet, "personhood verifier responded");

        if status.is_success() {
            let success: VerifySuccess = response.json().await.unwrap_or_default();
            let raw = success
                .nullifier_hash
                .filter(|h| !h.trim().is_empty())
                .unwrap_or_else(|| proof.nullifier_hash.clone());
            let identity = IdentityHandle::new(raw)
                .map_err(|e| OracleError::InvalidResponse(e.to_string()))?;
            return Ok(VerificationOutcome::Accepted { identity });
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(OracleError::RequestFailed("verifier rate limited".into()));
        }

        if status.is_client_error() {
            let failure: VerifyFailure = response.json().await.unwrap_or_default();
            let reason = failure
                .code
                .or(failure.detail)
                .unwrap_or_else(|| format!("HTTP status {status}"));
            return Ok(VerificationOutcome::Rejected { reason });
        }

        Err(OracleError::RequestFailed(format!("HTTP status {status}")))
    }
}
