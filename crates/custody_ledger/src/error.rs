//! Failures of registry and ledger operations. Every variant aborts the whole operation.

use crate::asset::{AccountId, Amount, AssetId};
use crate::custody::TransferError;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LedgerError {
    #[error("unauthorized caller {caller}")]
    Unauthorized { caller: AccountId },
    #[error("native currency cannot be registered as a token")]
    InvalidAsset,
    #[error("asset {asset} is not supported")]
    UnsupportedAsset { asset: AssetId },
    #[error("amount must be > 0")]
    InvalidAmount,
    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: Amount, available: Amount },
    #[error("transfer failed: {0}")]
    TransferFailed(#[from] TransferError),
    #[error("arithmetic overflow")]
    Overflow,
}
