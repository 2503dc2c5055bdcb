//! In-memory custodian: external wallets, token allowances, and the custody vault.
//!
//! Accounts are normalized on the way in, so lookups are case-insensitive.

use crate::asset::{normalize_account, AccountId, Amount, AssetId};
use crate::custody::{AssetTransfer, TransferError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct InMemoryCustody {
    /// Balances outside custody, per asset then account.
    wallets: BTreeMap<AssetId, BTreeMap<AccountId, Amount>>,
    /// Token allowances granted to the custodian, per token then owner.
    allowances: BTreeMap<AssetId, BTreeMap<AccountId, Amount>>,
    /// Units held in custody per asset.
    vault: BTreeMap<AssetId, Amount>,
    /// Recipients whose incoming transfers fail.
    #[serde(default)]
    rejecting: BTreeSet<AccountId>,
}

impl InMemoryCustody {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit an external wallet (faucet / token mint).
    pub fn mint(&mut self, asset: &AssetId, account: &AccountId, amount: Amount) {
        let bal = self
            .wallets
            .entry(asset.clone())
            .or_default()
            .entry(normalize_account(account))
            .or_default();
        *bal = bal.saturating_add(amount);
    }

    /// Set the allowance `owner` grants the custodian on `asset`.
    pub fn approve(&mut self, asset: &AssetId, owner: &AccountId, amount: Amount) {
        self.allowances
            .entry(asset.clone())
            .or_default()
            .insert(normalize_account(owner), amount);
    }

    /// Add units straight to the vault, e.g. an interest reserve funded by the operator.
    pub fn fund_reserve(&mut self, asset: &AssetId, amount: Amount) {
        let held = self.vault.entry(asset.clone()).or_default();
        *held = held.saturating_add(amount);
    }

    pub fn wallet_balance(&self, asset: &AssetId, account: &AccountId) -> Amount {
        self.wallets
            .get(asset)
            .and_then(|w| w.get(&normalize_account(account)))
            .copied()
            .unwrap_or(0)
    }

    pub fn allowance(&self, asset: &AssetId, owner: &AccountId) -> Amount {
        self.allowances
            .get(asset)
            .and_then(|a| a.get(&normalize_account(owner)))
            .copied()
            .unwrap_or(0)
    }

    /// Make every transfer to `account` fail.
    pub fn reject_transfers_to(&mut self, account: &AccountId) {
        self.rejecting.insert(normalize_account(account));
    }

    pub fn accept_transfers_to(&mut self, account: &AccountId) {
        self.rejecting.remove(&normalize_account(account));
    }
}

impl AssetTransfer for InMemoryCustody {
    fn transfer_in(
        &mut self,
        asset: &AssetId,
        from: &AccountId,
        amount: Amount,
    ) -> Result<(), TransferError> {
        let from = &normalize_account(from);
        if !asset.is_native() {
            let allowance = self.allowance(asset, from);
            if allowance < amount {
                return Err(TransferError::InsufficientAllowance {
                    asset: asset.clone(),
                    owner: from.clone(),
                    allowance,
                    amount,
                });
            }
        }
        let balance = self.wallet_balance(asset, from);
        if balance < amount {
            return Err(TransferError::InsufficientFunds {
                asset: asset.clone(),
                account: from.clone(),
                balance,
                amount,
            });
        }

        if !asset.is_native() {
            self.approve(asset, from, self.allowance(asset, from) - amount);
        }
        self.wallets
            .entry(asset.clone())
            .or_default()
            .insert(from.clone(), balance - amount);
        self.fund_reserve(asset, amount);
        Ok(())
    }

    fn transfer_out(
        &mut self,
        asset: &AssetId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), TransferError> {
        let to = &normalize_account(to);
        if self.rejecting.contains(to) {
            return Err(TransferError::RecipientRejected(to.clone()));
        }
        let held = self.held(asset);
        if held < amount {
            return Err(TransferError::CustodyShortfall {
                asset: asset.clone(),
                held,
                amount,
            });
        }
        self.vault.insert(asset.clone(), held - amount);
        self.mint(asset, to, amount);
        Ok(())
    }

    fn held(&self, asset: &AssetId) -> Amount {
        self.vault.get(asset).copied().unwrap_or(0)
    }
}
