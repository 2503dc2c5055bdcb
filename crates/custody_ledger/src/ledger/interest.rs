//! Simple (linear) interest, integer-only.
//!
//! `interest = principal * RATE_BPS * elapsed / (BPS_DENOMINATOR * SECONDS_PER_YEAR)`,
//! multiplied out before dividing so nothing is lost to early truncation.

use crate::asset::Amount;
use crate::error::LedgerError;

/// Annual rate in basis points (5%).
pub const RATE_BPS: u128 = 500;
pub const BPS_DENOMINATOR: u128 = 10_000;
/// 365 days.
pub const SECONDS_PER_YEAR: u64 = 365 * 24 * 60 * 60;

/// Seconds between two Unix timestamps; zero if the clock went backward.
pub fn elapsed_secs(since: i64, now: i64) -> u64 {
    u64::try_from(now.saturating_sub(since)).unwrap_or(0)
}

/// Interest accrued on `principal` over `elapsed` seconds.
pub fn accrued_interest(principal: Amount, elapsed: u64) -> Result<Amount, LedgerError> {
    let numerator = principal
        .checked_mul(RATE_BPS)
        .and_then(|v| v.checked_mul(u128::from(elapsed)))
        .ok_or(LedgerError::Overflow)?;
    Ok(numerator / (BPS_DENOMINATOR * u128::from(SECONDS_PER_YEAR)))
}
