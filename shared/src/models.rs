use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Query string of `GET /api/companies/{company_code}/ohlcv`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OhlcvQuery {
    /// Comma-separated exchanges
    pub exchange: Option<String>,
    pub interval: Option<String>,
    /// ISO-8601; naive values are read in the market time zone
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// Comma-separated indicator names
    pub indicators: Option<String>,
    pub first_fifteen_minutes: Option<bool>,
    pub fetch_all_data: Option<bool>,
}

impl OhlcvQuery {
    pub fn indicator_list(&self) -> Vec<String> {
        self.indicators
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// One bar in the response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarRow {
    pub interval_start: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}
