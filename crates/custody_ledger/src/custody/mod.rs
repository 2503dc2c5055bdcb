//! Asset movement in and out of the ledger's custody.

mod memory;

pub use memory::InMemoryCustody;

use crate::asset::{AccountId, Amount, AssetId};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("allowance {allowance} below {amount} for {owner} on {asset}")]
    InsufficientAllowance {
        asset: AssetId,
        owner: AccountId,
        allowance: Amount,
        amount: Amount,
    },
    #[error("{account} holds {balance} of {asset}, needs {amount}")]
    InsufficientFunds {
        asset: AssetId,
        account: AccountId,
        balance: Amount,
        amount: Amount,
    },
    #[error("custody holds {held} of {asset}, cannot release {amount}")]
    CustodyShortfall {
        asset: AssetId,
        held: Amount,
        amount: Amount,
    },
    #[error("recipient {0} rejected the transfer")]
    RecipientRejected(AccountId),
}

/// External transfer interface consumed by the ledger.
///
/// `transfer_in` has `transferFrom(from, custody, amount)` semantics for tokens; for the
/// native currency it confirms that `from` has escrowed `amount` with the custodian.
/// `transfer_out` pushes value from custody to `to`. A returned error means nothing moved.
pub trait AssetTransfer: Send {
    fn transfer_in(
        &mut self,
        asset: &AssetId,
        from: &AccountId,
        amount: Amount,
    ) -> Result<(), TransferError>;

    fn transfer_out(
        &mut self,
        asset: &AssetId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), TransferError>;

    /// Total units of `asset` currently held in custody.
    fn held(&self, asset: &AssetId) -> Amount;
}
