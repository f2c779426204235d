//! EVM chain oracles over JSON-RPC `eth_call`.
//!
//! Both oracles issue a read-only call against the `latest` block:
//! - [`TokenBalanceOracle`]: `balanceOf(address) returns (uint256)` on the
//!   governance token.
//! - [`RegistryFinalityOracle`]: `isRegistered(address) returns (bool)` (or a
//!   configured equivalent) on the voter registry.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use civitas_crypto::function_selector;
use civitas_types::WalletAddress;

use crate::{BalanceOracle, FinalityOracle, OracleError};

/// Default timeout for node requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Solidity signature of the ERC-20 balance getter.
pub const BALANCE_OF_SIGNATURE: &str = "balanceOf(address)";

/// Default registry getter answering "has this wallet finalized?".
pub const DEFAULT_FINALITY_SIGNATURE: &str = "isRegistered(address)";

/// Minimal JSON-RPC client for an Ethereum-compatible node.
pub struct EvmRpcClient {
    http: reqwest::Client,
    rpc_url: String,
    next_id: AtomicU64,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

impl EvmRpcClient {
    pub fn new(rpc_url: impl Into<String>) -> Result<Self, OracleError> {
        Self::with_timeout(rpc_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(rpc_url: impl Into<String>, timeout: Duration) -> Result<Self, OracleError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .map_err(|e| OracleError::RequestFailed(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            rpc_url: rpc_url.into(),
            next_id: AtomicU64::new(1),
        })
    }

    /// The configured node URL.
    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    /// Execute `eth_call` against `to` and return the raw return data.
    pub async fn eth_call(&self, to: &WalletAddress, data: &[u8]) -> Result<Vec<u8>, OracleError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "eth_call",
            "params": [
                { "to": to.as_str(), "data": format!("0x{}", hex::encode(data)) },
                "latest"
            ],
        });

        let response = self
            .http
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(OracleError::from_transport)?;

        if !response.status().is_success() {
            return Err(OracleError::RequestFailed(format!(
                "node returned HTTP {}",
                response.status()
            )));
        }

        let rpc: RpcResponse = response
            .json()
            .await
            .map_err(|e| OracleError::InvalidResponse(format!("invalid JSON-RPC response: {e}")))?;

        if let Some(err) = rpc.error {
            return Err(OracleError::Rpc {
                code: err.code,
                message: err.message,
            });
        }

        let result = rpc
            .result
            .ok_or_else(|| OracleError::InvalidResponse("missing result".into()))?;
        let digits = result.strip_prefix("0x").unwrap_or(&result);
        hex::decode(digits).map_err(|e| OracleError::InvalidResponse(format!("result hex: {e}")))
    }
}

/// `selector ++ address left-padded to 32 bytes`.
fn encode_address_call(selector: [u8; 4], wallet: &WalletAddress) -> Vec<u8> {
    let mut data = Vec::with_capacity(36);
    data.extend_from_slice(&selector);
    data.extend_from_slice(&[0u8; 12]);
    data.extend_from_slice(&wallet.to_bytes());
    data
}

fn first_word(data: &[u8]) -> Result<&[u8], OracleError> {
    data.get(..32).ok_or_else(|| {
        OracleError::InvalidResponse(format!("expected a 32-byte word, got {} bytes", data.len()))
    })
}

/// Decode a uint256 word, saturating at `u128::MAX`.
fn decode_uint(data: &[u8]) -> Result<u128, OracleError> {
    let word = first_word(data)?;
    if word[..16].iter().any(|&b| b != 0) {
        return Ok(u128::MAX);
    }
    let mut low = [0u8; 16];
    low.copy_from_slice(&word[16..]);
    Ok(u128::from_be_bytes(low))
}

fn decode_bool(data: &[u8]) -> Result<bool, OracleError> {
    Ok(first_word(data)?.iter().any(|&b| b != 0))
}

/// ERC-20 balance oracle.
pub struct TokenBalanceOracle {
    rpc: Arc<EvmRpcClient>,
    token: WalletAddress,
    selector: [u8; 4],
}

impl TokenBalanceOracle {
    pub fn new(rpc: Arc<EvmRpcClient>, token: WalletAddress) -> Self {
        Self {
            rpc,
            token,
            selector: function_selector(BALANCE_OF_SIGNATURE),
        }
    }
}

#[async_trait]
impl BalanceOracle for TokenBalanceOracle {
    async fn balance_of(&self, wallet: &WalletAddress) -> Result<u128, OracleError> {
        let data = self
            .rpc
            .eth_call(&self.token, &encode_address_call(self.selector, wallet))
            .await?;
        let balance = decode_uint(&data)?;
        debug!(%wallet, balance, "token balance");
        Ok(balance)
    }
}

/// Voter-registry finality oracle.
pub struct RegistryFinalityOracle {
    rpc: Arc<EvmRpcClient>,
    registry: WalletAddress,
    selector: [u8; 4],
}

impl RegistryFinalityOracle {
    pub fn new(rpc: Arc<EvmRpcClient>, registry: WalletAddress) -> Self {
        Self::with_function(rpc, registry, DEFAULT_FINALITY_SIGNATURE)
    }

    /// Use a different `fn(address) returns (bool)` getter.
    pub fn with_function(rpc: Arc<EvmRpcClient>, registry: WalletAddress, signature: &str) -> Self {
        Self {
            rpc,
            registry,
            selector: function_selector(signature),
        }
    }
}

#[async_trait]
impl FinalityOracle for RegistryFinalityOracle {
    async fn is_finalized(&self, wallet: &WalletAddress) -> Result<bool, OracleError> {
        let data = self
            .rpc
            .eth_call(&self.registry, &encode_address_call(self.selector, wallet))
            .await?;
        let finalized = decode_bool(&data)?;
        debug!(%wallet, finalized, "registry finality");
        Ok(finalized)
    }
}
