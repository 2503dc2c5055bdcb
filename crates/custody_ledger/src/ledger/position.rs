//! Per (asset, account) principal and accrual clock.

use crate::asset::{amount_text, AccountId, Amount, AssetId};
use crate::error::LedgerError;
use crate::ledger::interest::{accrued_interest, elapsed_secs};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Realized balance as of `last_update_ts`.
    #[serde(with = "amount_text")]
    pub principal: Amount,
    /// Unix seconds of the last deposit or withdrawal. Meaningless while principal is zero.
    pub last_update_ts: i64,
}

impl Position {
    pub fn accrued_interest(&self, now_ts: i64) -> Result<Amount, LedgerError> {
        accrued_interest(self.principal, elapsed_secs(self.last_update_ts, now_ts))
    }

    /// Principal plus interest accrued up to `now_ts`. Does not mutate.
    pub fn effective_balance(&self, now_ts: i64) -> Result<Amount, LedgerError> {
        self.principal
            .checked_add(self.accrued_interest(now_ts)?)
            .ok_or(LedgerError::Overflow)
    }

    /// Fold accrued interest into principal and restart the clock at `now_ts`.
    /// Returns the realized position and the interest folded in.
    pub fn realize(&self, now_ts: i64) -> Result<(Position, Amount), LedgerError> {
        let interest = self.accrued_interest(now_ts)?;
        let principal = self
            .principal
            .checked_add(interest)
            .ok_or(LedgerError::Overflow)?;
        Ok((
            Position {
                principal,
                last_update_ts: now_ts,
            },
            interest,
        ))
    }
}

/// A position together with its key, as persisted and reported.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionRecord {
    pub asset: AssetId,
    pub account: AccountId,
    #[serde(flatten)]
    pub position: Position,
}
