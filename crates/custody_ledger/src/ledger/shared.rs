//! Ledger behind a single async lock, for concurrent callers.
//!
//! Each mutation holds the lock across realize, transfer and commit, so two operations on
//! the same position can never interleave.

use crate::asset::{AccountId, Amount, AssetId};
use crate::custody::{AssetTransfer, InMemoryCustody};
use crate::error::LedgerError;
use crate::events::Receipt;
use crate::ledger::engine::{Ledger, LedgerSnapshot};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub struct SharedLedger<T: AssetTransfer = InMemoryCustody> {
    inner: Arc<Mutex<Ledger<T>>>,
}

impl<T: AssetTransfer> Clone for SharedLedger<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: AssetTransfer> SharedLedger<T> {
    pub fn new(ledger: Ledger<T>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ledger)),
        }
    }

    pub async fn deposit_native(
        &self,
        account: &AccountId,
        amount: Amount,
    ) -> Result<Receipt, LedgerError> {
        let mut ledger = self.inner.lock().await;
        let res = ledger.deposit_native(account, amount);
        log_outcome("deposit", &AssetId::Native, account, amount, &res);
        res
    }

    pub async fn deposit_token(
        &self,
        asset: &AssetId,
        account: &AccountId,
        amount: Amount,
    ) -> Result<Receipt, LedgerError> {
        let mut ledger = self.inner.lock().await;
        let res = ledger.deposit_token(asset, account, amount);
        log_outcome("deposit", asset, account, amount, &res);
        res
    }

    pub async fn withdraw(
        &self,
        account: &AccountId,
        amount: Amount,
    ) -> Result<Receipt, LedgerError> {
        let mut ledger = self.inner.lock().await;
        let res = ledger.withdraw(account, amount);
        log_outcome("withdraw", &AssetId::Native, account, amount, &res);
        res
    }

    pub async fn withdraw_token(
        &self,
        asset: &AssetId,
        account: &AccountId,
        amount: Amount,
    ) -> Result<Receipt, LedgerError> {
        let mut ledger = self.inner.lock().await;
        let res = ledger.withdraw_token(asset, account, amount);
        log_outcome("withdraw", asset, account, amount, &res);
        res
    }

    pub async fn add_supported_asset(
        &self,
        caller: &AccountId,
        asset: &AssetId,
    ) -> Result<(), LedgerError> {
        let res = self.inner.lock().await.add_supported_asset(caller, asset);
        log_admin("add_supported_asset", caller, &asset.to_string(), &res);
        res
    }

    pub async fn remove_supported_asset(
        &self,
        caller: &AccountId,
        asset: &AssetId,
    ) -> Result<(), LedgerError> {
        let res = self.inner.lock().await.remove_supported_asset(caller, asset);
        log_admin("remove_supported_asset", caller, &asset.to_string(), &res);
        res
    }

    pub async fn transfer_ownership(
        &self,
        caller: &AccountId,
        new_owner: AccountId,
    ) -> Result<(), LedgerError> {
        let target = new_owner.clone();
        let res = self.inner.lock().await.transfer_ownership(caller, new_owner);
        log_admin("transfer_ownership", caller, &target, &res);
        res
    }

    pub async fn owner(&self) -> AccountId {
        self.inner.lock().await.owner().clone()
    }

    /// Point-in-time balance; may be stale as soon as the lock is released.
    pub async fn get_balance(
        &self,
        asset: &AssetId,
        account: &AccountId,
    ) -> Result<Amount, LedgerError> {
        self.inner.lock().await.get_balance(asset, account)
    }

    pub async fn is_supported(&self, asset: &AssetId) -> bool {
        self.inner.lock().await.is_supported(asset)
    }

    pub async fn custody_balance(&self, asset: &AssetId) -> Amount {
        self.inner.lock().await.custody_balance(asset)
    }

    pub async fn snapshot(&self) -> LedgerSnapshot {
        self.inner.lock().await.snapshot()
    }

    /// Run `f` with exclusive access to the underlying ledger.
    pub async fn with_ledger<R>(&self, f: impl FnOnce(&mut Ledger<T>) -> R) -> R {
        let mut ledger = self.inner.lock().await;
        f(&mut ledger)
    }
}

fn log_outcome(
    op: &str,
    asset: &AssetId,
    account: &AccountId,
    amount: Amount,
    res: &Result<Receipt, LedgerError>,
) {
    match res {
        Ok(r) => debug!(
            op,
            %asset,
            %account,
            amount,
            interest = r.interest_realized,
            principal = r.principal_after,
            "committed"
        ),
        Err(e) => warn!(op, %asset, %account, amount, error = %e, "rejected"),
    }
}

fn log_admin(op: &str, caller: &AccountId, subject: &str, res: &Result<(), LedgerError>) {
    match res {
        Ok(()) => info!(op, %caller, subject, "registry updated"),
        Err(e) => warn!(op, %caller, subject, error = %e, "registry change rejected"),
    }
}
