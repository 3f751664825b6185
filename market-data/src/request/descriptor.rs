//! Request descriptors

use crate::data::{DateRange, Interval};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A historical query as it arrives from a caller, before validation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoricalRequest {
    /// Company / symbol code
    pub symbol: String,
    /// Comma-separated exchange list
    pub exchange: Option<String>,
    /// Interval wire name; `None` means the default interval
    pub interval: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    /// Ignore any range and fetch everything available
    pub fetch_all: bool,
    pub first_n_minutes: bool,
    pub indicators: Vec<String>,
}

impl HistoricalRequest {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            ..Default::default()
        }
    }

    pub fn interval(mut self, interval: impl Into<String>) -> Self {
        self.interval = Some(interval.into());
        self
    }

    pub fn exchange(mut self, exchange: impl Into<String>) -> Self {
        self.exchange = Some(exchange.into());
        self
    }

    pub fn range(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    pub fn first_n_minutes(mut self, enabled: bool) -> Self {
        self.first_n_minutes = enabled;
        self
    }

    pub fn indicators<I, S>(mut self, indicators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.indicators = indicators.into_iter().map(Into::into).collect();
        self
    }
}

/// Validated, canonical form of a [`HistoricalRequest`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestDescriptor {
    pub symbol: String,
    /// Upper-cased exchanges in caller order; `None` means the producer default
    pub exchanges: Option<Vec<String>>,
    pub interval: Interval,
    /// `None` means "fetch all available"
    pub range: Option<DateRange>,
    pub first_n_minutes: bool,
    /// Lower-cased, sorted, de-duplicated
    pub indicators: Vec<String>,
}

impl RequestDescriptor {
    /// Canonical cache / in-flight key.
    ///
    /// Identical requests always produce the same key; indicator order does not
    /// matter. `first_n_minutes` is the configured window length and is part of
    /// the key only when the window filter is requested.
    pub fn cache_key(&self, first_n_minutes: u32) -> String {
        let exchange = match &self.exchanges {
            Some(list) => list.join(","),
            None => "ALL".to_string(),
        };
        let range = match &self.range {
            Some(r) => format!(
                "{}-{}",
                r.start.timestamp_millis(),
                r.end.timestamp_millis()
            ),
            None => "all".to_string(),
        };
        let window = if self.first_n_minutes {
            format!("first{}", first_n_minutes)
        } else {
            "full".to_string()
        };

        format!(
            "{}_{}_{}_{}_{}_{}",
            self.symbol,
            self.interval,
            exchange,
            range,
            window,
            self.indicators.join(",")
        )
    }

    pub fn is_unbounded(&self) -> bool {
        self.range.is_none()
    }
}
