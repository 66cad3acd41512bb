//! `hydrolog` — backend service and CSV batch importer for the
//! water-sensor pipeline.
//!
//! The library is shared by two binaries:
//! - `hydrolog` (`src/main.rs`): axum HTTP service accepting one reading
//!   at a time from devices and serving latest-N queries
//! - `csv-import` (`src/bin/csv_import.rs`): bulk-loads historical CSV
//!   exports into the same `sensor_readings` table
//!
//! Modules follow the Explicit Module Boundary Pattern (EMBP): each
//! directory exposes a gateway `mod.rs`, and this file re-exports the
//! types binaries and tests need.

pub mod config;
pub mod error;
pub mod import;
pub mod models;
pub mod routes;
pub mod schema;
pub mod store;
pub mod telemetry;

// ---

pub use config::Config;
pub use error::{ImportError, RowParseError};
pub use models::{DeviceStats, NormalizedReading, RawCsvRow, StoredReading};
pub use store::{PgStore, ReadingStore, StoreError};
