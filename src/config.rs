use std::time::Duration;
use std::{fs, path::Path};

use anyhow::Context;
use dotenv::dotenv;
use envsubst::substitute;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::uniswap::constants::ContractAddresses;
use crate::uniswap::tx_builder::GasPolicy;
use crate::uniswap::{ProtocolVersion, UniswapSettings};

/// Prefixes of the environment variables substituted into the YAML file.
const ENV_PREFIXES: [&str; 4] = ["SERVER_", "RPC_", "WALLET_", "UNISWAP_"];

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub rpc: RpcConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
    #[serde(default)]
    pub uniswap: UniswapConfig,
}

impl Config {
    pub async fn from_yaml(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        dotenv().ok();

        let path = path.as_ref();
        let file_content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file from path: {}", path.display()))?;

        let env_vars: std::collections::HashMap<String, String> = std::env::vars()
            .filter(|(key, _)| ENV_PREFIXES.iter().any(|prefix| key.starts_with(prefix)))
            .collect();

        let interpolated = substitute(&file_content, &env_vars)
            .context("Failed to substitute environment variables in YAML")?;

        serde_yaml::from_str(&interpolated).context("Failed to parse YAML configuration")
    }

    pub fn server_uri(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcConfig {
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    pub private_key: String,
    /// Owner queried by balance tools that name no wallet.
    pub address: Option<String>,
}

impl WalletConfig {
    /// The configured key, `None` when empty or left as an unset `${...}` placeholder.
    pub fn private_key(&self) -> Option<&str> {
        let key = self.private_key.trim();
        if key.is_empty() || key.starts_with("${") {
            None
        } else {
            Some(key)
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UniswapConfig {
    pub version: ProtocolVersion,
    pub default_slippage: Decimal,
    pub use_estimate_gas: bool,
    pub fallback_gas_limit: u64,
    pub receipt_timeout_secs: u64,
    pub approval_settle_millis: u64,
    pub cache_capacity: u64,
    pub contracts: ContractAddresses,
}

impl Default for UniswapConfig {
    fn default() -> Self {
        Self {
            version: ProtocolVersion::V3,
            default_slippage: Decimal::new(1, 2),
            use_estimate_gas: true,
            fallback_gas_limit: 250_000,
            receipt_timeout_secs: 120,
            approval_settle_millis: 1000,
            cache_capacity: 1024,
            contracts: ContractAddresses::default(),
        }
    }
}

impl UniswapConfig {
    pub fn settings(&self) -> UniswapSettings {
        UniswapSettings {
            version: self.version,
            default_slippage: self.default_slippage,
            gas_policy: GasPolicy {
                use_estimate_gas: self.use_estimate_gas,
                fallback_gas_limit: self.fallback_gas_limit,
            },
            receipt_timeout: Duration::from_secs(self.receipt_timeout_secs),
            settle_delay: Duration::from_millis(self.approval_settle_millis),
            cache_capacity: self.cache_capacity,
            contracts: self.contracts,
        }
    }
}
