//! Time ranges

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Closed UTC time range `[start, end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn span(&self) -> Duration {
        self.end - self.start
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts <= self.end
    }

    /// True when `other` lies entirely inside this range
    pub fn covers(&self, other: &DateRange) -> bool {
        self.start <= other.start && self.end >= other.end
    }
}
