//! Ledger read/write interfaces and their JSON-RPC implementation.
//!
//! The rest of the crate treats the ledger as the two traits below.
//! Method names and parameter encoding are confined to this module; the
//! poller and the quote layers never see transport details. The
//! implementation performs JSON-RPC 2.0 calls with
//! [`reqwest`](https://docs.rs/reqwest/) under the hood.

use crate::core::types::RawQuantity;
use crate::error::{PoolwatchError, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

/// Read-only ledger queries. All quantities come back in base units.
///
/// Errors from any of these propagate as read-cycle failures: the poller
/// discards the whole cycle and keeps its previous snapshot.
#[async_trait]
pub trait LedgerReader: Send + Sync {
    /// Token balance held by `account`.
    async fn balance_of(&self, token: &str, account: &str) -> Result<RawQuantity>;

    /// Quantity of `token` currently held by the pool contract.
    async fn pool_reserve_of(&self, token: &str) -> Result<RawQuantity>;

    /// Pool-share balance held by `account`.
    async fn share_balance_of(&self, account: &str) -> Result<RawQuantity>;

    /// Total pool-share supply.
    async fn share_total_supply(&self) -> Result<RawQuantity>;

    /// Allowance `owner` has granted `spender` for `token`.
    async fn allowance_of(&self, token: &str, owner: &str, spender: &str)
        -> Result<RawQuantity>;
}

/// State-changing ledger calls, signed by the active wallet identity.
///
/// Success or failure of the underlying transaction is not observed here:
/// the effect shows up, or does not, in a subsequent read cycle.
#[async_trait]
pub trait LedgerWriter: Send + Sync {
    /// Permit `spender` to move up to `amount` of `token`.
    async fn approve(&self, token: &str, spender: &str, amount: &RawQuantity) -> Result<()>;

    /// Deposit both amounts into the pool for newly minted shares.
    async fn add_liquidity(
        &self,
        base_amount: &RawQuantity,
        quote_amount: &RawQuantity,
    ) -> Result<()>;

    /// Redeem `share_qty` pool shares for proportional reserves.
    async fn remove_liquidity(&self, share_qty: &RawQuantity) -> Result<()>;
}

/// JSON-RPC client implementing both ledger interfaces.
#[derive(Clone)]
pub struct RpcLedgerClient {
    endpoint: String,
    pool_address: String,
    /// Wallet identity used as the sender of write calls.
    sender: Option<String>,
    http: reqwest::Client,
}

impl RpcLedgerClient {
    pub fn new(endpoint: impl Into<String>, pool_address: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            pool_address: pool_address.into(),
            sender: None,
            http: reqwest::Client::new(),
        }
    }

    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        let resp = self.http.post(&self.endpoint).json(&body).send().await?;
        let val: Value = resp.json().await?;
        if let Some(err) = val.get("error") {
            return Err(PoolwatchError::Rpc(format!("{}: {}", method, err)));
        }
        val.get("result")
            .cloned()
            .ok_or_else(|| PoolwatchError::Rpc(format!("{}: missing result", method)))
    }

    /// Call a method whose result is a base-10 quantity string.
    async fn call_quantity(&self, method: &str, params: Value) -> Result<RawQuantity> {
        let result = self.call(method, params).await?;
        let text = result
            .as_str()
            .ok_or_else(|| PoolwatchError::Rpc(format!("{}: non-string quantity", method)))?;
        RawQuantity::from_dec_str(text)
            .map_err(|_| PoolwatchError::Rpc(format!("{}: bad quantity {:?}", method, text)))
    }

    fn sender(&self) -> Result<&str> {
        self.sender
            .as_deref()
            .ok_or_else(|| PoolwatchError::Rpc("no wallet identity for write call".into()))
    }
}

#[async_trait]
impl LedgerReader for RpcLedgerClient {
    async fn balance_of(&self, token: &str, account: &str) -> Result<RawQuantity> {
        self.call_quantity("token_balanceOf", json!([token, account]))
            .await
    }

    async fn pool_reserve_of(&self, token: &str) -> Result<RawQuantity> {
        self.call_quantity("token_balanceOf", json!([token, self.pool_address]))
            .await
    }

    async fn share_balance_of(&self, account: &str) -> Result<RawQuantity> {
        self.call_quantity(
            "pool_shareBalanceOf",
            json!([self.pool_address, account]),
        )
        .await
    }

    async fn share_total_supply(&self) -> Result<RawQuantity> {
        self.call_quantity("pool_shareTotalSupply", json!([self.pool_address]))
            .await
    }

    async fn allowance_of(&self, token: &str, owner: &str, spender: &str) -> Result<RawQuantity> {
        self.call_quantity("token_allowance", json!([token, owner, spender]))
            .await
    }
}

#[async_trait]
impl LedgerWriter for RpcLedgerClient {
    async fn approve(&self, token: &str, spender: &str, amount: &RawQuantity) -> Result<()> {
        let sender = self.sender()?;
        self.call(
            "token_approve",
            json!([token, sender, spender, amount.to_string()]),
        )
        .await?;
        Ok(())
    }

    async fn add_liquidity(
        &self,
        base_amount: &RawQuantity,
        quote_amount: &RawQuantity,
    ) -> Result<()> {
        let sender = self.sender()?;
        self.call(
            "pool_addLiquidity",
            json!([
                self.pool_address,
                sender,
                base_amount.to_string(),
                quote_amount.to_string()
            ]),
        )
        .await?;
        Ok(())
    }

    async fn remove_liquidity(&self, share_qty: &RawQuantity) -> Result<()> {
        let sender = self.sender()?;
        self.call(
            "pool_removeLiquidity",
            json!([self.pool_address, sender, share_qty.to_string()]),
        )
        .await?;
        Ok(())
    }
}
