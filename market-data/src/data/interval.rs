//! Bar intervals supported by the producer

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported bar intervals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    #[default]
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "1d")]
    OneDay,
}

impl Interval {
    pub const ALL: [Interval; 5] = [
        Self::OneMinute,
        Self::FiveMinutes,
        Self::FifteenMinutes,
        Self::OneHour,
        Self::OneDay,
    ];

    /// Parse the wire form ("1m", "5m", "15m", "1h", "1d"), case-insensitive
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "1m" => Some(Self::OneMinute),
            "5m" => Some(Self::FiveMinutes),
            "15m" => Some(Self::FifteenMinutes),
            "1h" => Some(Self::OneHour),
            "1d" => Some(Self::OneDay),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneMinute => "1m",
            Self::FiveMinutes => "5m",
            Self::FifteenMinutes => "15m",
            Self::OneHour => "1h",
            Self::OneDay => "1d",
        }
    }

    /// Nominal distance between consecutive bar opens
    pub fn spacing(&self) -> Duration {
        match self {
            Self::OneMinute => Duration::minutes(1),
            Self::FiveMinutes => Duration::minutes(5),
            Self::FifteenMinutes => Duration::minutes(15),
            Self::OneHour => Duration::hours(1),
            Self::OneDay => Duration::days(1),
        }
    }

    /// Widest start..end window a single request may cover
    pub fn max_window(&self) -> Duration {
        match self {
            Self::OneDay => Duration::days(1825),
            _ => Duration::days(365),
        }
    }

    /// Extra minutes the producer loads around an explicit window so charts can scroll
    pub fn buffer_minutes(&self) -> u32 {
        match self {
            Self::OneMinute => 15,
            Self::FiveMinutes => 60,
            Self::FifteenMinutes => 180,
            Self::OneHour => 720,
            Self::OneDay => 1440,
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roundtrips_wire_names() {
        for interval in Interval::ALL {
            assert_eq!(Interval::parse(interval.as_str()), Some(interval));
        }
        assert_eq!(Interval::parse(" 1H "), Some(Interval::OneHour));
        assert_eq!(Interval::parse("4h"), None);
        assert_eq!(Interval::parse(""), None);
    }

    #[test]
    fn test_windows_and_buffers() {
        assert_eq!(Interval::OneMinute.max_window(), Duration::days(365));
        assert_eq!(Interval::OneHour.max_window(), Duration::days(365));
        assert_eq!(Interval::OneDay.max_window(), Duration::days(1825));
        assert_eq!(Interval::FifteenMinutes.buffer_minutes(), 180);
        assert_eq!(Interval::OneDay.buffer_minutes(), 1440);
    }
}
