//! Producer data stream parsing

use crate::data::{clamp_volume, ohlc_consistent, parse_timestamp, OhlcvRecord};
use crate::error::FetchError;
use crate::request::RequestDescriptor;
use chrono_tz::Tz;
use tracing::{debug, warn};

/// Prefix of every data line on the producer's stdout
pub const RECORD_MARKER: &str = "DATA:";
/// Prefix of a fatal line on the producer's stdout
pub const FATAL_MARKER: &str = "ERROR:";

const FIELD_COUNT: usize = 6;

/// Parser tolerances and the zone naive timestamps are read in
#[derive(Debug, Clone, Copy)]
pub struct ParseOptions {
    pub timezone: Tz,
    pub error_ceiling: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::Asia::Kolkata,
            error_ceiling: 10,
        }
    }
}

/// Outcome of a successful parse
#[derive(Debug, Clone, Default)]
pub struct ParsedBars {
    pub records: Vec<OhlcvRecord>,
    /// Malformed lines that were skipped
    pub rejected: usize,
    /// Valid lines dropped for falling outside the requested range
    pub out_of_range: usize,
}

/// Why a single data line was rejected
#[derive(Debug, Clone, PartialEq)]
pub enum LineError {
    FieldCount(usize),
    Price(String),
    Inconsistent,
    Timestamp(String),
    Volume(String),
}

impl std::fmt::Display for LineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FieldCount(n) => write!(f, "expected {} fields, got {}", FIELD_COUNT, n),
            Self::Price(raw) => write!(f, "invalid price '{}'", raw),
            Self::Inconsistent => write!(f, "high/low do not bracket open/close"),
            Self::Timestamp(raw) => write!(f, "invalid timestamp '{}'", raw),
            Self::Volume(raw) => write!(f, "invalid volume '{}'", raw),
        }
    }
}

/// Message of the first [`FATAL_MARKER`] line in `stdout`, if any
pub fn fatal_message(stdout: &str) -> Option<&str> {
    stdout
        .lines()
        .find_map(|line| line.trim().strip_prefix(FATAL_MARKER))
        .map(str::trim)
}

/// Parse the producer's stdout into validated records.
///
/// Malformed data lines are skipped until `error_ceiling` of them have been
/// seen, at which point the whole parse fails. A line starting with
/// [`FATAL_MARKER`] fails immediately. Records outside an explicit request
/// range are dropped without counting as errors.
pub fn parse_records(
    stdout: &str,
    descriptor: &RequestDescriptor,
    options: &ParseOptions,
) -> Result<ParsedBars, FetchError> {
    let mut parsed = ParsedBars::default();

    for (line_no, line) in stdout.lines().enumerate() {
        let line = line.trim();

        if let Some(message) = line.strip_prefix(FATAL_MARKER) {
            return Err(FetchError::ProducerReported(message.trim().to_string()));
        }

        let Some(payload) = line.strip_prefix(RECORD_MARKER) else {
            continue;
        };

        match parse_line(payload, options.timezone) {
            Ok(record) => {
                if let Some(range) = &descriptor.range {
                    if !range.contains(record.timestamp) {
                        parsed.out_of_range += 1;
                        continue;
                    }
                }
                parsed.records.push(record);
            }
            Err(e) => {
                parsed.rejected += 1;
                warn!("Skipping data line {}: {}", line_no + 1, e);
                if parsed.rejected >= options.error_ceiling {
                    return Err(FetchError::TooManyParseErrors {
                        count: parsed.rejected,
                        ceiling: options.error_ceiling,
                    });
                }
            }
        }
    }

    debug!(
        "Parsed {} records for {} ({} rejected, {} out of range)",
        parsed.records.len(),
        descriptor.symbol,
        parsed.rejected,
        parsed.out_of_range
    );
    Ok(parsed)
}

/// Parse the payload of one data line (everything after the marker)
pub fn parse_line(payload: &str, tz: Tz) -> Result<OhlcvRecord, LineError> {
    let fields: Vec<&str> = payload.split(',').map(field_value).collect();
    if fields.len() != FIELD_COUNT {
        return Err(LineError::FieldCount(fields.len()));
    }

    let open = parse_price(fields[1])?;
    let high = parse_price(fields[2])?;
    let low = parse_price(fields[3])?;
    let close = parse_price(fields[4])?;

    if !ohlc_consistent(open, high, low, close) {
        return Err(LineError::Inconsistent);
    }

    let timestamp =
        parse_timestamp(fields[0], tz).ok_or_else(|| LineError::Timestamp(fields[0].to_string()))?;

    let volume: f64 = fields[5]
        .parse()
        .map_err(|_| LineError::Volume(fields[5].to_string()))?;

    Ok(OhlcvRecord::new(
        timestamp,
        open,
        high,
        low,
        close,
        clamp_volume(volume),
    ))
}

/// Strip an optional `label=` prefix from a field
fn field_value(field: &str) -> &str {
    let field = field.trim();
    match field.split_once('=') {
        Some((_, value)) => value.trim(),
        None => field,
    }
}

fn parse_price(raw: &str) -> Result<f64, LineError> {
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| LineError::Price(raw.to_string()))
}
