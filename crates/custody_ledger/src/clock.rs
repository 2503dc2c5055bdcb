//! Time sources. The ledger reads the clock; it never advances it.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

/// Wall-clock UTC.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Settable clock with one-second resolution. Clones share the same instant.
#[derive(Clone, Debug)]
pub struct ManualClock {
    unix: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn at(unix_ts: i64) -> Self {
        Self {
            unix: Arc::new(AtomicI64::new(unix_ts)),
        }
    }

    pub fn set(&self, unix_ts: i64) {
        self.unix.store(unix_ts, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: i64) {
        self.unix.fetch_add(secs, Ordering::SeqCst);
    }

    pub fn unix_timestamp(&self) -> i64 {
        self.unix.load(Ordering::SeqCst)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(self.unix_timestamp())
            .unwrap_or(OffsetDateTime::UNIX_EPOCH)
    }
}

#[derive(Error, Debug)]
#[error("invalid time: {0}")]
pub struct TimeParseError(String);

/// Parse a point in time: decimal Unix seconds, or RFC3339.
pub fn parse_instant(s: &str) -> Result<i64, TimeParseError> {
    let s = s.trim();
    if let Ok(ts) = s.parse::<i64>() {
        return Ok(ts);
    }
    let dt = OffsetDateTime::parse(s, &Rfc3339).map_err(|e| TimeParseError(e.to_string()))?;
    Ok(dt.unix_timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::at(1_000);
        let other = clock.clone();
        clock.advance(60);
        assert_eq!(other.now().unix_timestamp(), 1_060);
        other.set(5);
        assert_eq!(clock.unix_timestamp(), 5);
    }

    #[test]
    fn parse_unix_and_rfc3339() {
        assert_eq!(parse_instant("1700000000").unwrap(), 1_700_000_000);
        assert_eq!(parse_instant("1970-01-01T00:01:00Z").unwrap(), 60);
        assert!(parse_instant("yesterday").is_err());
    }
}
