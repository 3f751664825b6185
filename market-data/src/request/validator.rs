//! Request validation and normalization

use super::{HistoricalRequest, RequestDescriptor};
use crate::data::{DateRange, Interval};
use crate::error::FetchError;
use tracing::warn;

/// Validate a raw request and bring it into canonical form.
///
/// Rejects an empty symbol, an empty or unknown interval, `start >= end` and
/// ranges wider than the interval allows. Only one of start/end is treated
/// as an unbounded request.
pub fn validate(request: &HistoricalRequest) -> Result<RequestDescriptor, FetchError> {
    let symbol = request.symbol.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(FetchError::validation("symbol is required"));
    }

    let interval = match request.interval.as_deref() {
        None => Interval::default(),
        Some(raw) if raw.trim().is_empty() => {
            return Err(FetchError::validation("interval must not be empty"));
        }
        Some(raw) => Interval::parse(raw).ok_or_else(|| {
            FetchError::validation(format!(
                "unsupported interval '{}', expected one of 1m, 5m, 15m, 1h, 1d",
                raw.trim()
            ))
        })?,
    };

    let range = if request.fetch_all {
        None
    } else {
        match (request.start, request.end) {
            (Some(start), Some(end)) => {
                if start >= end {
                    return Err(FetchError::validation(format!(
                        "start {} must be before end {}",
                        start.to_rfc3339(),
                        end.to_rfc3339()
                    )));
                }
                let range = DateRange::new(start, end);
                if range.span() > interval.max_window() {
                    return Err(FetchError::validation(format!(
                        "range of {} days exceeds the {} day limit for {} bars",
                        range.span().num_days(),
                        interval.max_window().num_days(),
                        interval
                    )));
                }
                Some(range)
            }
            (None, None) => None,
            (start, end) => {
                warn!(
                    "Only one range bound given for {} (start={:?}, end={:?}), fetching all data",
                    symbol, start, end
                );
                None
            }
        }
    };

    Ok(RequestDescriptor {
        symbol,
        exchanges: normalize_exchanges(request.exchange.as_deref()),
        interval,
        range,
        first_n_minutes: request.first_n_minutes,
        indicators: normalize_indicators(&request.indicators),
    })
}

fn normalize_exchanges(raw: Option<&str>) -> Option<Vec<String>> {
    let list: Vec<String> = raw?
        .split(',')
        .map(|e| e.trim().to_uppercase())
        .filter(|e| !e.is_empty())
        .collect();
    if list.is_empty() {
        None
    } else {
        Some(list)
    }
}

fn normalize_indicators(raw: &[String]) -> Vec<String> {
    let mut list: Vec<String> = raw
        .iter()
        .map(|i| i.trim().to_lowercase())
        .filter(|i| !i.is_empty())
        .collect();
    list.sort();
    list.dedup();
    list
}
