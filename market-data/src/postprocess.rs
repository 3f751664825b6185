//! Result finalization: ordering, de-duplication, gaps and the opening window

use crate::data::{Interval, OhlcvRecord};
use crate::request::RequestDescriptor;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, warn};

/// Stretch between consecutive bars wider than the interval allows.
/// Reported only, never used to drop data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DataGap {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Final record set plus what was noticed on the way
#[derive(Debug, Clone, Default)]
pub struct Finalized {
    pub records: Vec<OhlcvRecord>,
    pub gaps: Vec<DataGap>,
    pub duplicates: usize,
}

/// Sort, drop duplicate timestamps (first wins) and either cut to the
/// first-N-minutes window or report gaps.
pub fn finalize(
    mut records: Vec<OhlcvRecord>,
    descriptor: &RequestDescriptor,
    first_n_minutes: u32,
) -> Finalized {
    // stable, so the first occurrence of a timestamp stays in front
    records.sort_by_key(|r| r.timestamp);
    let before = records.len();
    records.dedup_by_key(|r| r.timestamp);
    let duplicates = before - records.len();
    if duplicates > 0 {
        debug!("Dropped {} duplicate bars for {}", duplicates, descriptor.symbol);
    }

    if descriptor.first_n_minutes {
        let records = first_minutes(records, first_n_minutes);
        return Finalized {
            records,
            gaps: Vec::new(),
            duplicates,
        };
    }

    let gaps = detect_gaps(&records, descriptor.interval);
    if !gaps.is_empty() {
        warn!(
            "{} gap(s) in {} {} data, first at {}",
            gaps.len(),
            descriptor.symbol,
            descriptor.interval,
            gaps[0].start
        );
    }

    Finalized {
        records,
        gaps,
        duplicates,
    }
}

/// Keep records within `minutes` of the earliest one, both ends inclusive.
/// Expects sorted input.
pub fn first_minutes(records: Vec<OhlcvRecord>, minutes: u32) -> Vec<OhlcvRecord> {
    let Some(first) = records.first().map(|r| r.timestamp) else {
        return records;
    };
    let cutoff = first + Duration::minutes(i64::from(minutes));
    records
        .into_iter()
        .filter(|r| r.timestamp >= first && r.timestamp <= cutoff)
        .collect()
}

/// Consecutive pairs more than 1.5x the nominal spacing apart. Expects sorted input.
pub fn detect_gaps(records: &[OhlcvRecord], interval: Interval) -> Vec<DataGap> {
    let threshold = interval.spacing() * 3 / 2;
    records
        .windows(2)
        .filter(|pair| pair[1].timestamp - pair[0].timestamp > threshold)
        .map(|pair| DataGap {
            start: pair[0].timestamp,
            end: pair[1].timestamp,
        })
        .collect()
}
