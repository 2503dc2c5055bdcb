//! Positions and the interest engine.

mod engine;
pub mod interest;
mod position;
mod shared;

pub use engine::{Ledger, LedgerSnapshot};
pub use interest::{accrued_interest, BPS_DENOMINATOR, RATE_BPS, SECONDS_PER_YEAR};
pub use position::{Position, PositionRecord};
pub use shared::SharedLedger;
