//! Civitas daemon: entry point for running the voter registrar.

mod config;
mod shutdown;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use zeroize::Zeroizing;

use civitas_crypto::IssuerKey;
use civitas_oracles::{
    EvmRpcClient, PersonhoodClient, PersonhoodConfig, RegistryFinalityOracle, TokenBalanceOracle,
};
use civitas_registration::{Registrar, RegistrarConfig};
use civitas_rpc::RpcServer;
use civitas_store_lmdb::LmdbEnvironment;
use civitas_types::WalletAddress;
use civitas_utils::{init_logging, LogFormat};

use crate::config::{load_issuer_key, ConfigError, DaemonConfig};

const ISSUER_KEY_ENV: &str = "CIVITAS_ISSUER_KEY";

#[derive(Parser)]
#[command(name = "civitas-daemon", about = "Sybil-resistant voter registrar", version)]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "CIVITAS_CONFIG")]
    config: Option<PathBuf>,

    /// HTTP API port.
    #[arg(long, env = "CIVITAS_LISTEN_PORT")]
    listen_port: Option<u16>,

    /// Directory holding the identity store.
    #[arg(long, env = "CIVITAS_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log format: "human" or "json".
    #[arg(long, env = "CIVITAS_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "CIVITAS_LOG_LEVEL")]
    log_level: Option<String>,

    /// Proof-of-personhood verifier base URL.
    #[arg(long, env = "CIVITAS_VERIFIER_URL")]
    verifier_url: Option<String>,

    /// Verifier application id.
    #[arg(long, env = "CIVITAS_APP_ID")]
    app_id: Option<String>,

    /// Verifier action proofs must be scoped to.
    #[arg(long, env = "CIVITAS_ACTION")]
    action: Option<String>,

    /// Ethereum JSON-RPC endpoint.
    #[arg(long, env = "CIVITAS_RPC_URL")]
    rpc_url: Option<String>,

    /// Governance token contract address.
    #[arg(long, env = "CIVITAS_TOKEN_CONTRACT")]
    token_contract: Option<WalletAddress>,

    /// Voter registry contract address.
    #[arg(long, env = "CIVITAS_REGISTRY_CONTRACT")]
    registry_contract: Option<WalletAddress>,

    /// Registry finality getter, e.g. "isRegistered(address)".
    #[arg(long, env = "CIVITAS_FINALITY_FUNCTION")]
    finality_function: Option<String>,

    /// Minimum token balance in base units.
    #[arg(long, env = "CIVITAS_MIN_TOKEN_BALANCE")]
    min_token_balance: Option<u128>,

    /// Per-call timeout for the verifier and chain oracles, in milliseconds.
    #[arg(long, env = "CIVITAS_CALL_TIMEOUT_MS")]
    call_timeout_ms: Option<u64>,

    /// File containing the hex-encoded issuer private key. The key may
    /// instead be supplied through `CIVITAS_ISSUER_KEY`; it is never
    /// accepted as a command-line argument.
    #[arg(long, env = "CIVITAS_ISSUER_KEY_FILE")]
    issuer_key_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Serve the registrar API.
    Run,
    /// Print the address credentials are signed by.
    IssuerAddress,
}

impl Cli {
    /// File settings overlaid with CLI flags and env vars.
    fn resolve_config(&self) -> Result<DaemonConfig, ConfigError> {
        let base = match &self.config {
            Some(path) => DaemonConfig::from_toml_file(path)?,
            None => DaemonConfig::default(),
        };
        Ok(DaemonConfig {
            listen_port: self.listen_port.unwrap_or(base.listen_port),
            data_dir: self.data_dir.clone().unwrap_or(base.data_dir),
            log_format: self.log_format.unwrap_or(base.log_format),
            log_level: self.log_level.clone().unwrap_or(base.log_level),
            verifier_url: self.verifier_url.clone().unwrap_or(base.verifier_url),
            app_id: self.app_id.clone().unwrap_or(base.app_id),
            action: self.action.clone().unwrap_or(base.action),
            rpc_url: self.rpc_url.clone().unwrap_or(base.rpc_url),
            token_contract: self.token_contract.clone().or(base.token_contract),
            registry_contract: self.registry_contract.clone().or(base.registry_contract),
            finality_function: self
                .finality_function
                .clone()
                .unwrap_or(base.finality_function),
            min_token_balance: self.min_token_balance.unwrap_or(base.min_token_balance),
            call_timeout_ms: self.call_timeout_ms.unwrap_or(base.call_timeout_ms),
            lmdb_map_size: base.lmdb_map_size,
        })
    }

    fn issuer_key(&self) -> Result<IssuerKey, ConfigError> {
        let inline = std::env::var(ISSUER_KEY_ENV).ok().map(Zeroizing::new);
        load_issuer_key(inline.as_deref().map(String::as_str), self.issuer_key_file.as_deref())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.resolve_config()?;
    init_logging(config.log_format, &config.log_level)?;

    let issuer = cli.issuer_key()?;

    match cli.command {
        Command::IssuerAddress => {
            println!("{}", issuer.address());
        }
        Command::Run => run(config, issuer).await?,
    }

    Ok(())
}

async fn run(config: DaemonConfig, issuer: IssuerKey) -> anyhow::Result<()> {
    config.validate()?;
    let call_timeout = config.call_timeout();

    let env = LmdbEnvironment::open(&config.data_dir, config.lmdb_map_size)
        .with_context(|| format!("opening identity store at {}", config.data_dir.display()))?;

    let verifier = PersonhoodClient::new(PersonhoodConfig {
        base_url: config.verifier_url.clone(),
        app_id: config.app_id.clone(),
        action: config.action.clone(),
        timeout: call_timeout,
    })?;

    let rpc = Arc::new(EvmRpcClient::with_timeout(config.rpc_url.clone(), call_timeout)?);
    let token = config
        .token_contract
        .clone()
        .ok_or(ConfigError::Missing("token_contract"))?;
    let registry = config
        .registry_contract
        .clone()
        .ok_or(ConfigError::Missing("registry_contract"))?;
    let balances = TokenBalanceOracle::new(rpc.clone(), token);
    let finality = RegistryFinalityOracle::with_function(rpc, registry, &config.finality_function);

    let registrar = Arc::new(Registrar::new(
        Arc::new(env.identity_store()),
        Arc::new(verifier),
        Arc::new(balances),
        Arc::new(finality),
        issuer,
        RegistrarConfig {
            min_token_balance: config.min_token_balance,
            call_timeout,
        },
    ));

    info!(
        issuer = %registrar.issuer_address(),
        port = config.listen_port,
        data_dir = %config.data_dir.display(),
        min_token_balance = %config.min_token_balance,
        "starting Civitas registrar"
    );

    RpcServer::new(config.listen_port, registrar)
        .start(shutdown::shutdown_signal())
        .await?;

    info!("Civitas daemon exited cleanly");
    Ok(())
}
