//! Reconciliation statement and its reproducibility hash.

mod hash;
mod reconcile;

pub use hash::{
    normalize_for_hash, reproducibility_hash, verify_statement_hash, StatementError,
    StatementReport, VerificationResult,
};
pub use reconcile::{AssetTotals, CustodyStatement, StatementRow};
