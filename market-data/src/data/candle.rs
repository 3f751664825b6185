//! OHLCV record data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Immutable, shareable result set handed to every caller of a fetch
pub type BarSet = Arc<Vec<OhlcvRecord>>;

/// One price bar as served to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcvRecord {
    /// Bar open instant
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl OhlcvRecord {
    /// Create a new record, rounding prices to two decimals
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: u64,
    ) -> Self {
        Self {
            timestamp,
            open: round_price(open),
            high: round_price(high),
            low: round_price(low),
            close: round_price(close),
            volume,
        }
    }

    /// High must cover the body from above and low from below
    pub fn is_consistent(&self) -> bool {
        ohlc_consistent(self.open, self.high, self.low, self.close)
    }
}

pub fn ohlc_consistent(open: f64, high: f64, low: f64, close: f64) -> bool {
    high >= open.max(close) && low <= open.min(close)
}

/// Round a price to two decimal places
pub fn round_price(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Clamp a raw volume reading to a non-negative whole number
pub fn clamp_volume(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.round() as u64
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_rounding() {
        let record = OhlcvRecord::new(Utc::now(), 100.126, 110.0, 94.994, 105.555, 10);
        assert_eq!(record.open, 100.13);
        assert_eq!(record.low, 94.99);
        assert_eq!(record.close, 105.56);
        assert!(record.is_consistent());
    }

    #[test]
    fn test_ohlc_invariant() {
        assert!(ohlc_consistent(100.0, 110.0, 95.0, 105.0));
        // high below close
        assert!(!ohlc_consistent(100.0, 104.0, 95.0, 105.0));
        // low above open
        assert!(!ohlc_consistent(100.0, 110.0, 101.0, 105.0));
        // flat bar is fine
        assert!(ohlc_consistent(100.0, 100.0, 100.0, 100.0));
    }

    #[test]
    fn test_clamp_volume() {
        assert_eq!(clamp_volume(1234.4), 1234);
        assert_eq!(clamp_volume(1234.6), 1235);
        assert_eq!(clamp_volume(-50.0), 0);
        assert_eq!(clamp_volume(f64::NAN), 0);
    }
}
