//! RPC request and response bodies, and the route handlers.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};

use civitas_registration::{IssueRequest, PreCheckOutcome, RegistrarStatus};
use civitas_types::PersonhoodProof;

use crate::{RpcError, RpcState};

// ── Pre-check ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct PreCheckRequest {
    pub wallet: String,
}

pub async fn pre_check(
    State(state): State<Arc<RpcState>>,
    body: Result<Json<PreCheckRequest>, JsonRejection>,
) -> Result<Json<PreCheckOutcome>, RpcError> {
    let Json(req) = body?;
    Ok(Json(state.registrar.pre_check(&req.wallet).await?))
}

// ── Credentials ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct IssueCredentialRequest {
    pub wallet: String,
    pub proof: PersonhoodProof,
}

#[derive(Serialize)]
pub struct IssueCredentialResponse {
    /// `0x`-prefixed 65-byte `r ‖ s ‖ v` signature.
    pub signature: String,
    pub identity_handle: String,
    pub wallet: String,
}

/// Runs on its own task: a client that disconnects mid-request cannot
/// cancel a registration halfway through its writes.
pub async fn issue_credential(
    State(state): State<Arc<RpcState>>,
    body: Result<Json<IssueCredentialRequest>, JsonRejection>,
) -> Result<Json<IssueCredentialResponse>, RpcError> {
    let Json(req) = body?;
    let request = IssueRequest {
        wallet: req.wallet,
        proof: req.proof,
    };
    let registrar = state.registrar.clone();
    let issued = tokio::spawn(async move { registrar.issue_credential(&request).await })
        .await
        .map_err(|e| RpcError::Server(format!("issue task failed: {e}")))??;

    Ok(Json(IssueCredentialResponse {
        signature: issued.signature.to_hex(),
        identity_handle: issued.identity.to_string(),
        wallet: issued.wallet.to_string(),
    }))
}

// ── Status ───────────────────────────────────────────────────────────────

pub async fn status(State(state): State<Arc<RpcState>>) -> Json<RegistrarStatus> {
    Json(state.registrar.status())
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn metrics(State(state): State<Arc<RpcState>>) -> Result<impl IntoResponse, RpcError> {
    let encoder = TextEncoder::new();
    let families = state.registrar.metrics().registry.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&families, &mut buffer)
        .map_err(|e| RpcError::Server(format!("metrics encoding failed: {e}")))?;
    let body = String::from_utf8(buffer).map_err(|e| RpcError::Server(e.to_string()))?;
    Ok(([(header::CONTENT_TYPE, encoder.format_type().to_string())], body))
}
