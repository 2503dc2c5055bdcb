//! Custody statement: what the ledger owes per asset versus what custody holds.

use crate::asset::{amount_text, AccountId, Amount, AssetId};
use crate::custody::AssetTransfer;
use crate::error::LedgerError;
use crate::ledger::Ledger;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use time::format_description::well_known::Rfc3339;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatementRow {
    pub asset: AssetId,
    pub account: AccountId,
    #[serde(with = "amount_text")]
    pub principal: Amount,
    #[serde(with = "amount_text")]
    pub effective_balance: Amount,
    pub last_update_ts: i64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssetTotals {
    #[serde(with = "amount_text")]
    pub principal: Amount,
    /// Sum of effective balances.
    #[serde(with = "amount_text")]
    pub liabilities: Amount,
    #[serde(with = "amount_text")]
    pub held: Amount,
    /// `held - liabilities` when positive.
    #[serde(with = "amount_text")]
    pub surplus: Amount,
    /// `liabilities - held` when positive.
    #[serde(with = "amount_text")]
    pub shortfall: Amount,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CustodyStatement {
    pub version: u32,
    pub as_of_unix: i64,
    pub as_of_rfc3339: String,
    pub owner: AccountId,
    pub supported_tokens: Vec<AssetId>,
    pub rows: Vec<StatementRow>,
    pub totals: BTreeMap<AssetId, AssetTotals>,
    pub event_count: u64,
}

const STATEMENT_VERSION: u32 = 1;

impl CustodyStatement {
    /// Statement at the ledger clock's current instant.
    pub fn build<T: AssetTransfer>(ledger: &Ledger<T>) -> Result<Self, LedgerError> {
        let now = ledger.now();
        let now_ts = now.unix_timestamp();
        let mut rows = Vec::new();
        let mut totals: BTreeMap<AssetId, AssetTotals> = BTreeMap::new();
        totals.entry(AssetId::Native).or_default();
        for token in ledger.registry().supported_tokens() {
            totals.entry(token).or_default();
        }

        for record in ledger.position_records() {
            let effective = record.position.effective_balance(now_ts)?;
            let t = totals.entry(record.asset.clone()).or_default();
            t.principal = t
                .principal
                .checked_add(record.position.principal)
                .ok_or(LedgerError::Overflow)?;
            t.liabilities = t
                .liabilities
                .checked_add(effective)
                .ok_or(LedgerError::Overflow)?;
            rows.push(StatementRow {
                asset: record.asset,
                account: record.account,
                principal: record.position.principal,
                effective_balance: effective,
                last_update_ts: record.position.last_update_ts,
            });
        }

        for (asset, t) in totals.iter_mut() {
            t.held = ledger.custody_balance(asset);
            t.surplus = t.held.saturating_sub(t.liabilities);
            t.shortfall = t.liabilities.saturating_sub(t.held);
        }

        Ok(Self {
            version: STATEMENT_VERSION,
            as_of_unix: now_ts,
            as_of_rfc3339: now.format(&Rfc3339).unwrap_or_default(),
            owner: ledger.owner().clone(),
            supported_tokens: ledger.registry().supported_tokens(),
            rows,
            totals,
            event_count: ledger.events().len() as u64,
        })
    }

    /// True when custody covers every asset's liabilities.
    pub fn is_solvent(&self) -> bool {
        self.totals.values().all(|t| t.shortfall == 0)
    }
}
