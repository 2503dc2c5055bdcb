//! Record of committed ledger mutations.

use crate::asset::{amount_text, AccountId, Amount, AssetId};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    Deposited {
        asset: AssetId,
        account: AccountId,
        #[serde(with = "amount_text")]
        amount: Amount,
        #[serde(with = "amount_text")]
        interest_realized: Amount,
        #[serde(with = "amount_text")]
        principal_after: Amount,
    },
    Withdrawn {
        asset: AssetId,
        account: AccountId,
        #[serde(with = "amount_text")]
        amount: Amount,
        #[serde(with = "amount_text")]
        interest_realized: Amount,
        #[serde(with = "amount_text")]
        principal_after: Amount,
    },
    AssetSupported {
        asset: AssetId,
    },
    AssetUnsupported {
        asset: AssetId,
    },
    OwnershipTransferred {
        previous: AccountId,
        new_owner: AccountId,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerEvent {
    /// 1-based position in the ledger's history.
    pub seq: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    #[serde(flatten)]
    pub kind: EventKind,
}

/// Outcome of a committed deposit or withdrawal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub asset: AssetId,
    pub account: AccountId,
    #[serde(with = "amount_text")]
    pub amount: Amount,
    #[serde(with = "amount_text")]
    pub interest_realized: Amount,
    #[serde(with = "amount_text")]
    pub principal_after: Amount,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl Receipt {
    pub(crate) fn deposited(&self) -> EventKind {
        EventKind::Deposited {
            asset: self.asset.clone(),
            account: self.account.clone(),
            amount: self.amount,
            interest_realized: self.interest_realized,
            principal_after: self.principal_after,
        }
    }

    pub(crate) fn withdrawn(&self) -> EventKind {
        EventKind::Withdrawn {
            asset: self.asset.clone(),
            account: self.account.clone(),
            amount: self.amount,
            interest_realized: self.interest_realized,
            principal_after: self.principal_after,
        }
    }
}
