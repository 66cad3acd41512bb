//! Data models for the water-sensor pipeline.

use chrono::{DateTime, Utc};
use serde::Serialize;

// ---

/// One raw line of a sensor CSV export, untyped.
///
/// Fields are kept as strings exactly as read from the file; all type
/// conversion happens in the normalizer so a bad value drops only the
/// row it belongs to. A cell missing from a ragged line is the empty
/// string, which fails integer parsing downstream.
#[derive(Debug, Clone, Default)]
pub struct RawCsvRow {
    // ---
    pub time_s: String,
    pub water_level: String,
    pub light_status: String,
    pub status: String,
    pub led: String,
    pub buzzer: String,
}

impl std::fmt::Display for RawCsvRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{};{};{};{};{};{}",
            self.time_s, self.water_level, self.light_status, self.status, self.led, self.buzzer
        )
    }
}

/// Canonical reading produced by the normalizer, ready for insertion.
///
/// `water_level` and `status` are carried for reference but are not part
/// of the stored schema.
#[derive(Debug, Clone)]
pub struct NormalizedReading {
    // ---
    pub device_id: String,
    pub light_proxy: i32,
    pub water_detected: i16,
    pub buzzer: i16,
    pub timestamp: DateTime<Utc>,
    pub water_level: i32,
    pub status: String,
}

/// Persisted row of the `sensor_readings` table.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StoredReading {
    // ---
    pub id: i32,
    pub device_id: String,
    pub ldr: i32,
    pub water: i16,
    pub buzzer: i16,
    pub ts: DateTime<Utc>,
}

/// Summary aggregates for one device, as returned by the store.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DeviceStats {
    // ---
    pub total: i64,
    pub earliest_ts: Option<DateTime<Utc>>,
    pub latest_ts: Option<DateTime<Utc>>,
    pub buzzer_on: i64,
}
