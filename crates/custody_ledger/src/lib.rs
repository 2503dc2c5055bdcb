//! custody_ledger — multi-asset custodial ledger with simple interest.
//!
//! Accepts deposits of the native currency and of whitelisted tokens, tracks each
//! depositor's principal per asset, and accrues 5% linear annual interest from the last
//! deposit or withdrawal. Interest is computed on read; nothing runs in the background.

pub mod asset;
pub mod clock;
pub mod custody;
pub mod deploy;
pub mod error;
pub mod events;
pub mod ledger;
pub mod registry;
pub mod statement;
pub mod store;

pub use asset::{normalize_account, AccountId, Amount, AssetId, TokenAddress, NATIVE_ADDRESS};
pub use clock::{Clock, ManualClock, SystemClock};
pub use custody::{AssetTransfer, InMemoryCustody, TransferError};
pub use deploy::DeploymentRecord;
pub use error::LedgerError;
pub use events::{EventKind, LedgerEvent, Receipt};
pub use ledger::{Ledger, LedgerSnapshot, Position, SharedLedger};
pub use registry::AssetRegistry;
pub use statement::{reproducibility_hash, CustodyStatement, StatementReport};
pub use store::LedgerStore;
