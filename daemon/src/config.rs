//! Daemon configuration with TOML file support.
//!
//! The issuer private key is deliberately absent: it comes from
//! `CIVITAS_ISSUER_KEY` or a key file, never from the config file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use zeroize::Zeroizing;

use civitas_crypto::IssuerKey;
use civitas_types::WalletAddress;
use civitas_utils::LogFormat;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {message}")]
    Read { path: String, message: String },

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("missing required setting `{0}`")]
    Missing(&'static str),

    #[error("invalid setting `{field}`: {message}")]
    Invalid { field: &'static str, message: String },

    #[error("issuer key: {0}")]
    IssuerKey(String),
}

/// Configuration for the registrar daemon.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Port of the HTTP API.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Directory holding the LMDB identity store.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Log filter, e.g. "info" or "info,civitas_registration=debug".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Base URL of the proof-of-personhood verifier.
    #[serde(default = "default_verifier_url")]
    pub verifier_url: String,

    /// Application id registered with the verifier.
    #[serde(default)]
    pub app_id: String,

    /// Action every proof must be scoped to.
    #[serde(default = "default_action")]
    pub action: String,

    /// JSON-RPC endpoint of an Ethereum-compatible node.
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    /// Governance token (ERC-20) contract.
    #[serde(default)]
    pub token_contract: Option<WalletAddress>,

    /// Voter registry contract.
    #[serde(default)]
    pub registry_contract: Option<WalletAddress>,

    /// Registry getter answering "has this wallet finalized?".
    #[serde(default = "default_finality_function")]
    pub finality_function: String,

    /// Minimum token balance in base units. Accepts an integer or a decimal
    /// string, since 18-decimal amounts overflow TOML integers.
    #[serde(
        default = "default_min_token_balance",
        deserialize_with = "de_amount",
        serialize_with = "ser_amount"
    )]
    pub min_token_balance: u128,

    /// Upper bound on each verifier/oracle call, in milliseconds.
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,

    /// LMDB memory map size in bytes.
    #[serde(default = "default_lmdb_map_size")]
    pub lmdb_map_size: usize,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_listen_port() -> u16 {
    8787
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./civitas_data")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_verifier_url() -> String {
    "https://developer.worldcoin.org".to_string()
}

fn default_action() -> String {
    "register-voter".to_string()
}

fn default_rpc_url() -> String {
    "http://127.0.0.1:8545".to_string()
}

fn default_finality_function() -> String {
    civitas_oracles::evm::DEFAULT_FINALITY_SIGNATURE.to_string()
}

fn default_min_token_balance() -> u128 {
    1
}

fn default_call_timeout_ms() -> u64 {
    10_000
}

fn default_lmdb_map_size() -> usize {
    1 << 30
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Amount {
    Int(u64),
    Text(String),
}

fn de_amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
    match Amount::deserialize(deserializer)? {
        Amount::Int(n) => Ok(u128::from(n)),
        Amount::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

fn ser_amount<S: Serializer>(amount: &u128, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&amount.to_string())
}

// ── Impl ───────────────────────────────────────────────────────────────

impl DaemonConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    /// Check the settings `run` cannot work without.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("verifier_url", &self.verifier_url),
            ("app_id", &self.app_id),
            ("action", &self.action),
            ("rpc_url", &self.rpc_url),
            ("finality_function", &self.finality_function),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Missing(field));
            }
        }
        if self.token_contract.is_none() {
            return Err(ConfigError::Missing("token_contract"));
        }
        if self.registry_contract.is_none() {
            return Err(ConfigError::Missing("registry_contract"));
        }
        if self.call_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "call_timeout_ms",
                message: "must be positive".into(),
            });
        }
        if !self.finality_function.ends_with("(address)") {
            return Err(ConfigError::Invalid {
                field: "finality_function",
                message: "must take a single address argument".into(),
            });
        }
        Ok(())
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            listen_port: default_listen_port(),
            data_dir: default_data_dir(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            verifier_url: default_verifier_url(),
            app_id: String::new(),
            action: default_action(),
            rpc_url: default_rpc_url(),
            token_contract: None,
            registry_contract: None,
            finality_function: default_finality_function(),
            min_token_balance: default_min_token_balance(),
            call_timeout_ms: default_call_timeout_ms(),
            lmdb_map_size: default_lmdb_map_size(),
        }
    }
}

/// Load the issuer key from an inline hex value or a key file holding one.
pub fn load_issuer_key(inline: Option<&str>, file: Option<&Path>) -> Result<IssuerKey, ConfigError> {
    let hex_key = match (inline, file) {
        (Some(_), Some(_)) => {
            return Err(ConfigError::IssuerKey(
                "set either CIVITAS_ISSUER_KEY or --issuer-key-file, not both".into(),
            ))
        }
        (Some(inline), None) => Zeroizing::new(inline.to_string()),
        (None, Some(path)) => {
            Zeroizing::new(std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
                path: path.display().to_string(),
                message: e.to_string(),
            })?)
        }
        (None, None) => {
            return Err(ConfigError::IssuerKey(
                "no key configured (CIVITAS_ISSUER_KEY or --issuer-key-file)".into(),
            ))
        }
    };
    IssuerKey::from_hex(hex_key.trim()).map_err(|e| ConfigError::IssuerKey(e.to_string()))
}
