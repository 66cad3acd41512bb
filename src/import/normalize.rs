//! Row normalization for the batch importer.
//!
//! Converts one raw CSV row into a canonical [`NormalizedReading`]. Pure
//! functions: given identical inputs and "now", the output is identical.
//! A row that fails any integer conversion produces no reading at all
//! (dropped and reported, never defaulted).

use chrono::{DateTime, Duration, Utc};
use tracing::warn;

use crate::error::RowParseError;
use crate::models::{NormalizedReading, RawCsvRow};

// ---

/// Map a light status token to an approximate LDR value.
///
/// The logger reports a day/night classification instead of the raw LDR
/// reading, in either English or Indonesian. Unknown tokens map to a
/// neutral mid-range value.
pub fn light_proxy(light_status: &str) -> i32 {
    // ---
    match light_status.trim().to_uppercase().as_str() {
        "NIGHT" | "GELAP" | "MALAM" => 200,
        "DAY" | "TERANG" | "SIANG" => 800,
        _ => 500,
    }
}

/// Compute the absolute timestamp anchoring a file's relative `Time(s)`
/// offsets.
///
/// `base = now − Time(s) of the last row`, so with an ascending log the
/// row with the largest offset maps to "now" and earlier rows fall
/// proportionally into the past. An unparsable last row falls back to
/// `now` rather than aborting the batch.
pub fn base_timestamp(rows: &[RawCsvRow], now: DateTime<Utc>) -> DateTime<Utc> {
    // ---
    match rows.last().map(|r| r.time_s.trim().parse::<i64>()) {
        Some(Ok(secs)) => {
            match Duration::try_seconds(secs).and_then(|d| now.checked_sub_signed(d)) {
                Some(base) => base,
                None => {
                    warn!(
                        "could not calculate base timestamp: offset {secs}s out of range; \
                         using current time"
                    );
                    now
                }
            }
        }
        Some(Err(e)) => {
            warn!("could not calculate base timestamp from last row: {e}; using current time");
            now
        }
        None => now,
    }
}

/// Normalize one raw row into a canonical reading.
///
/// With a base timestamp, `timestamp = base + Time(s)`; without one,
/// `Time(s)` is treated as seconds before now. Any non-numeric
/// `Time(s)`, `WaterLevel`, `LED`, or `Buzzer` drops the row with a
/// [`RowParseError`] carrying the offending field and the original row.
pub fn normalize(
    row: &RawCsvRow,
    device_id: &str,
    base: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<NormalizedReading, RowParseError> {
    // ---
    let time_sec: i64 = parse_int(row, "Time(s)", &row.time_s)?;
    let water_level: i32 = parse_int(row, "WaterLevel", &row.water_level)?;
    let light_status = row.light_status.trim().to_uppercase();
    let status = row.status.trim().to_uppercase();

    // LED is validated like the original export but not persisted; the
    // stored schema has no column for it.
    let _led: i32 = parse_int(row, "LED", &row.led)?;
    let buzzer: i16 = parse_int(row, "Buzzer", &row.buzzer)?;

    // A numeric offset can still overflow the timestamp arithmetic; such
    // a row is dropped like any other conversion failure.
    let offset =
        Duration::try_seconds(time_sec).ok_or_else(|| out_of_range(row, "Time(s)", &row.time_s))?;
    let timestamp = match base {
        Some(base) => base.checked_add_signed(offset),
        None => now.checked_sub_signed(offset),
    }
    .ok_or_else(|| out_of_range(row, "Time(s)", &row.time_s))?;

    Ok(NormalizedReading {
        device_id: device_id.to_string(),
        light_proxy: light_proxy(&light_status),
        water_detected: i16::from(water_level > 0),
        buzzer,
        timestamp,
        water_level,
        status,
    })
}

fn parse_int<T: std::str::FromStr<Err = std::num::ParseIntError>>(
    row: &RawCsvRow,
    field: &'static str,
    value: &str,
) -> Result<T, RowParseError> {
    // ---
    value.trim().parse().map_err(|cause| RowParseError {
        field,
        value: value.to_string(),
        row: row.to_string(),
        cause: Some(cause),
    })
}

fn out_of_range(row: &RawCsvRow, field: &'static str, value: &str) -> RowParseError {
    // ---
    RowParseError {
        field,
        value: value.to_string(),
        row: row.to_string(),
        cause: None,
    }
}

// ---
