use thiserror::Error;

/// Error taxonomy for the state-sync and quote layers.
///
/// None of these escalate to a process-level failure: a failed read cycle
/// keeps the previous snapshot, a missing rate or price disables the
/// dependent quote, and malformed input simply leaves a field unchanged.
#[derive(Debug, Error)]
pub enum PoolwatchError {
    #[error("invalid quantity format: {0:?}")]
    InvalidFormat(String),
    #[error("ledger read cycle failed: {0}")]
    ReadCycle(String),
    #[error("exchange rate unavailable")]
    MissingRate,
    #[error("no price observation for feed {0}")]
    MissingPrice(String),
    #[error("pool has no liquidity")]
    PoolEmpty,
    #[error("config error: {0}")]
    Config(String),
    #[error("price subscription error: {0}")]
    Subscription(String),
    #[error("rpc error: {0}")]
    Rpc(String),
}

pub type Result<T> = std::result::Result<T, PoolwatchError>;

impl From<reqwest::Error> for PoolwatchError {
    fn from(err: reqwest::Error) -> Self {
        PoolwatchError::Rpc(format!("HTTP request error: {}", err))
    }
}

impl From<serde_json::Error> for PoolwatchError {
    fn from(err: serde_json::Error) -> Self {
        PoolwatchError::Rpc(format!("JSON parsing error: {}", err))
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for PoolwatchError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        PoolwatchError::Subscription(format!("WebSocket error: {}", err))
    }
}

impl From<url::ParseError> for PoolwatchError {
    fn from(err: url::ParseError) -> Self {
        PoolwatchError::Config(format!("URL parsing error: {}", err))
    }
}

impl From<std::io::Error> for PoolwatchError {
    fn from(err: std::io::Error) -> Self {
        PoolwatchError::Config(format!("IO error: {}", err))
    }
}

impl From<toml::de::Error> for PoolwatchError {
    fn from(err: toml::de::Error) -> Self {
        PoolwatchError::Config(format!("TOML parsing error: {}", err))
    }
}
