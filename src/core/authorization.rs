//! Allowance gating for pending liquidity-add intents.
//!
//! The gate is a pure, level-triggered re-evaluation over the latest
//! allowance pair and the entered amounts. There is no latch: an
//! externally lowered allowance drops the status back to `Unauthorized`
//! the next time it is evaluated, without any user action.

use crate::core::types::{ApprovalState, LiquidityIntent, RawQuantity, TokenConfig};
use crate::core::units::decimal_to_raw;
use crate::data::ledger::LedgerWriter;
use crate::error::Result;

/// Whether the pool contract may currently pull the entered amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationStatus {
    Unauthorized,
    Authorized,
}

impl AuthorizationStatus {
    pub fn is_authorized(self) -> bool {
        matches!(self, AuthorizationStatus::Authorized)
    }
}

/// Re-evaluate the gate from the latest allowances and intent.
///
/// `Authorized` iff both allowances cover the respective entered amount.
/// An empty, malformed, or zero intent can never be actionable and
/// evaluates to `Unauthorized`.
pub fn evaluate(
    approvals: &ApprovalState,
    intent: &LiquidityIntent,
    base_token: &TokenConfig,
    quote_token: &TokenConfig,
) -> AuthorizationStatus {
    let required_base = match decimal_to_raw(&intent.base, base_token.decimals) {
        Ok(qty) => qty,
        Err(_) => return AuthorizationStatus::Unauthorized,
    };
    let required_quote = match decimal_to_raw(&intent.quote, quote_token.decimals) {
        Ok(qty) => qty,
        Err(_) => return AuthorizationStatus::Unauthorized,
    };
    if required_base.is_zero() || required_quote.is_zero() {
        return AuthorizationStatus::Unauthorized;
    }
    if approvals.base >= required_base && approvals.quote >= required_quote {
        AuthorizationStatus::Authorized
    } else {
        AuthorizationStatus::Unauthorized
    }
}

/// Ask the ledger to raise both allowances for the pool contract.
///
/// The two approve transactions are submitted concurrently and awaited
/// together. This performs no status transition: the approval lands (or
/// not) on chain asynchronously, and the gate only flips once a later
/// allowance poll observes the raised allowance.
pub async fn request_approval(
    writer: &dyn LedgerWriter,
    pool_address: &str,
    base_token: &TokenConfig,
    quote_token: &TokenConfig,
    base_amount: &RawQuantity,
    quote_amount: &RawQuantity,
) -> Result<()> {
    tokio::try_join!(
        writer.approve(&base_token.address, pool_address, base_amount),
        writer.approve(&quote_token.address, pool_address, quote_amount),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn token(name: &str, decimals: u32) -> TokenConfig {
        TokenConfig {
            name: name.to_string(),
            address: format!("0x{}", name),
            price_feed_id: format!("0xfeed{}", name),
            decimals,
        }
    }

    fn intent(base: &str, quote: &str) -> LiquidityIntent {
        LiquidityIntent {
            base: base.to_string(),
            quote: quote.to_string(),
        }
    }

    #[test]
    fn authorized_iff_both_allowances_cover_intent() {
        let base = token("base", 3);
        let quote = token("quote", 3);
        let approvals = ApprovalState {
            base: RawQuantity::from(2_000u128),
            quote: RawQuantity::from(3_000u128),
        };

        let status = evaluate(&approvals, &intent("2", "3"), &base, &quote);
        assert!(status.is_authorized());

        // one side short by a single base unit
        let short = ApprovalState {
            base: RawQuantity::from(1_999u128),
            quote: RawQuantity::from(3_000u128),
        };
        let status = evaluate(&short, &intent("2", "3"), &base, &quote);
        assert!(!status.is_authorized());
    }

    #[test]
    fn lowering_an_allowance_revokes_authorization() {
        let base = token("base", 3);
        let quote = token("quote", 3);
        let entered = intent("1", "1");

        let full = ApprovalState {
            base: RawQuantity::from(1_000u128),
            quote: RawQuantity::from(1_000u128),
        };
        assert!(evaluate(&full, &entered, &base, &quote).is_authorized());

        // external revocation observed by a later poll
        let revoked = ApprovalState {
            base: RawQuantity::from(1_000u128),
            quote: RawQuantity::from(999u128),
        };
        assert!(!evaluate(&revoked, &entered, &base, &quote).is_authorized());
    }

    #[test]
    fn unparseable_or_zero_intent_is_never_actionable() {
        let base = token("base", 3);
        let quote = token("quote", 3);
        let generous = ApprovalState {
            base: RawQuantity::from(u128::MAX),
            quote: RawQuantity::from(u128::MAX),
        };

        for (b, q) in [("", "1"), ("1", "abc"), ("0", "1"), ("1", "0"), ("0.0", "0.0")] {
            let status = evaluate(&generous, &intent(b, q), &base, &quote);
            assert!(!status.is_authorized(), "intent ({:?}, {:?})", b, q);
        }
    }

    struct RecordingWriter {
        approvals: Mutex<Vec<(String, String, String)>>,
    }

    #[async_trait]
    impl LedgerWriter for RecordingWriter {
        async fn approve(
            &self,
            token: &str,
            spender: &str,
            amount: &RawQuantity,
        ) -> Result<()> {
            self.approvals.lock().unwrap().push((
                token.to_string(),
                spender.to_string(),
                amount.to_string(),
            ));
            Ok(())
        }

        async fn add_liquidity(&self, _: &RawQuantity, _: &RawQuantity) -> Result<()> {
            Ok(())
        }

        async fn remove_liquidity(&self, _: &RawQuantity) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn request_issues_one_approval_per_token() {
        let writer = RecordingWriter {
            approvals: Mutex::new(Vec::new()),
        };
        let base = token("base", 3);
        let quote = token("quote", 3);

        request_approval(
            &writer,
            "0xpool",
            &base,
            &quote,
            &RawQuantity::from(2_000u128),
            &RawQuantity::from(3_000u128),
        )
        .await
        .unwrap();

        let mut calls = writer.approvals.into_inner().unwrap();
        calls.sort();
        assert_eq!(
            calls,
            vec![
                ("0xbase".to_string(), "0xpool".to_string(), "2000".to_string()),
                ("0xquote".to_string(), "0xpool".to_string(), "3000".to_string()),
            ]
        );
    }
}
