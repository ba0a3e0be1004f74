//! Conversions between human-entered decimal strings and base-unit
//! quantities.
//!
//! `decimal_to_raw` is the exact direction: it is used for every value
//! that goes back to the ledger. `raw_to_decimal` is display-only and
//! intentionally lossy for quantities beyond double precision; the
//! round trip is not expected to be exact past that boundary.

use crate::core::types::RawQuantity;
use crate::error::{PoolwatchError, Result};
use num_bigint::BigUint;

/// Parse a decimal string into a base-unit quantity.
///
/// Accepts digits with at most one '.' separator; the string must contain
/// at least one digit. Fractional digits past `decimals` are truncated,
/// never rounded up.
pub fn decimal_to_raw(text: &str, decimals: u32) -> Result<RawQuantity> {
    let invalid = || PoolwatchError::InvalidFormat(text.to_string());

    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i, f),
        None => (text, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(invalid());
    }
    if !int_part.bytes().all(|b| b.is_ascii_digit())
        || !frac_part.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(invalid());
    }

    // Scale by 10^decimals: shift the fraction into the integer part,
    // truncating what does not fit.
    let kept = &frac_part[..frac_part.len().min(decimals as usize)];
    let mut digits = String::with_capacity(int_part.len() + decimals as usize);
    digits.push_str(int_part);
    digits.push_str(kept);
    for _ in kept.len()..decimals as usize {
        digits.push('0');
    }
    if digits.is_empty() {
        // e.g. ".5" with decimals = 0 truncates to nothing
        return Ok(RawQuantity::zero());
    }

    BigUint::parse_bytes(digits.as_bytes(), 10)
        .map(RawQuantity::from)
        .ok_or_else(invalid)
}

/// Convert a base-unit quantity to its display value.
///
/// Lossy: feeds human-readable fields only. Raw quantities are always the
/// form sent back to the ledger.
pub fn raw_to_decimal(qty: &RawQuantity, decimals: u32) -> f64 {
    qty.to_f64_lossy() / 10f64.powi(decimals as i32)
}
