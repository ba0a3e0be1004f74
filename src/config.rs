//! Static process configuration.
//!
//! Everything here is fixed for the process lifetime: the two traded
//! tokens, the pool contract, the ledger RPC endpoint and the price
//! service. There is no runtime reloading.

use crate::core::types::TokenConfig;
use crate::error::Result;
use serde::Deserialize;
use std::fs;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub base_token: TokenConfig,
    pub quote_token: TokenConfig,
    pub pool: PoolConfig,
    pub ledger: LedgerConfig,
    pub price_service: PriceServiceConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PoolConfig {
    /// Address of the pool contract holding both reserves.
    pub contract_address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    pub rpc_url: String,
    /// Active wallet identity, if one is connected at startup.
    pub account: Option<String>,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PriceServiceConfig {
    /// WebSocket endpoint of the off-chain price service.
    pub url: String,
}

fn default_poll_interval_secs() -> u64 {
    3
}

pub fn load_base() -> Result<AppConfig> {
    load_from("config/base.toml")
}

pub fn load_from(path: &str) -> Result<AppConfig> {
    let s = fs::read_to_string(path)?;
    let cfg: AppConfig = toml::from_str(&s)?;
    Ok(cfg)
}
