//! Liquidity quoting: add-mode pairing and remove-mode payouts.
//!
//! Two independent modes. Add mode keeps the two entry fields consistent
//! through the derived exchange rate; remove mode prices a proportional
//! withdrawal against the pool's current reserves. Both produce display
//! values only; the raw quantities submitted to the ledger are always
//! re-derived from the entered strings via `core::units`.

use crate::core::types::{ChainStateSnapshot, LiquidityIntent, RawQuantity, TokenConfig};
use crate::core::units::{decimal_to_raw, raw_to_decimal};
use crate::error::{PoolwatchError, Result};

/// Fractional digits shown for an auto-filled add-mode amount.
const ADD_PAIR_DECIMALS: usize = 3;
/// Fractional digits shown for a remove-mode payout estimate.
const REMOVE_PAYOUT_DECIMALS: usize = 6;

/// Which side of the pair an edit came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Base,
    Quote,
}

/// Compute the paired field for an add-liquidity edit.
///
/// Returns `None` when no auto-fill should happen and the paired field is
/// left untouched: the rate is unknown, the entry is exactly "0", or the
/// entry is not a valid decimal. Editing stays allowed in all three
/// cases; only the dependent submit action must be disabled while the
/// rate is missing.
pub fn pair_for_add(
    entered: &str,
    side: Side,
    rate: Option<f64>,
    entered_decimals: u32,
) -> Option<String> {
    let rate = rate.filter(|r| r.is_finite() && *r > 0.0)?;
    if entered == "0" {
        return None;
    }
    let qty = decimal_to_raw(entered, entered_decimals).ok()?;
    let value = raw_to_decimal(&qty, entered_decimals);
    let paired = match side {
        Side::Base => value * rate,
        Side::Quote => value / rate,
    };
    Some(format!("{:.1$}", paired, ADD_PAIR_DECIMALS))
}

/// Apply a keystroke-level edit to one side of the intent, auto-filling
/// the other side when the rate permits.
pub fn apply_add_edit(
    intent: &mut LiquidityIntent,
    side: Side,
    text: &str,
    rate: Option<f64>,
    base_token: &TokenConfig,
    quote_token: &TokenConfig,
) {
    match side {
        Side::Base => {
            intent.base = text.to_string();
            if let Some(quote) = pair_for_add(text, side, rate, base_token.decimals) {
                intent.quote = quote;
            }
        }
        Side::Quote => {
            intent.quote = text.to_string();
            if let Some(base) = pair_for_add(text, side, rate, quote_token.decimals) {
                intent.base = base;
            }
        }
    }
}

/// Quick-fill one side of the intent from a wallet balance.
///
/// Each side fills only its own field; the paired amount then follows
/// through `apply_add_edit` like any other edit.
pub fn quick_fill(
    intent: &mut LiquidityIntent,
    side: Side,
    balance: &RawQuantity,
    rate: Option<f64>,
    base_token: &TokenConfig,
    quote_token: &TokenConfig,
) {
    let decimals = match side {
        Side::Base => base_token.decimals,
        Side::Quote => quote_token.decimals,
    };
    let text = raw_to_decimal(balance, decimals).to_string();
    apply_add_edit(intent, side, &text, rate, base_token, quote_token);
}

/// Proportional payouts for redeeming pool shares, as display values.
#[derive(Debug, Clone, PartialEq)]
pub struct RemovalQuote {
    pub base_payout: f64,
    pub quote_payout: f64,
}

impl RemovalQuote {
    pub fn base_display(&self) -> String {
        format!("{:.1$}", self.base_payout, REMOVE_PAYOUT_DECIMALS)
    }

    pub fn quote_display(&self) -> String {
        format!("{:.1$}", self.quote_payout, REMOVE_PAYOUT_DECIMALS)
    }
}

/// Quote a proportional withdrawal of `share_qty` pool shares against the
/// current snapshot.
///
/// The same redemption ratio `share_qty / supply` applies uniformly to
/// both reserves. Reports `PoolEmpty` when the supply or either reserve
/// is zero rather than computing an unbounded payout.
pub fn quote_removal(
    snapshot: &ChainStateSnapshot,
    share_qty: f64,
    base_token: &TokenConfig,
    quote_token: &TokenConfig,
    share_decimals: u32,
) -> Result<RemovalQuote> {
    let supply = raw_to_decimal(&snapshot.share_supply, share_decimals);
    let reserve_base = raw_to_decimal(&snapshot.pool_base_reserve, base_token.decimals);
    let reserve_quote = raw_to_decimal(&snapshot.pool_quote_reserve, quote_token.decimals);
    if supply == 0.0 || reserve_base == 0.0 || reserve_quote == 0.0 {
        return Err(PoolwatchError::PoolEmpty);
    }
    Ok(RemovalQuote {
        base_payout: reserve_base * share_qty / supply,
        quote_payout: reserve_quote * share_qty / supply,
    })
}
