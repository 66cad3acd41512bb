//! Batch loader: end-to-end orchestration of one CSV import.
//!
//! Read file → detect delimiter → optionally purge the target device →
//! anchor the relative timeline → normalize every row → insert in
//! fixed-size batches. Per-row and per-batch failures are isolated and
//! accumulated into the run report; only file-level and purge-level
//! errors abort the run.

use std::path::PathBuf;

use chrono::Utc;
use tracing::{error, info, warn};

use super::{normalize, source};
use crate::error::{ImportError, RowParseError};
use crate::store::{ReadingStore, StoreError};

// ---

/// Parameters of one import run.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    // ---
    /// Path to the CSV export.
    pub file: PathBuf,

    /// Device id assigned to every imported row.
    pub device_id: String,

    /// Rows per batch insert; the last batch may be smaller.
    pub batch_size: usize,

    /// Delete existing rows for the device before importing. Without
    /// this, re-running the same import duplicates rows.
    pub clear_existing: bool,
}

/// Outcome of one batch insert.
#[derive(Debug)]
pub enum BatchOutcome {
    // ---
    Committed { rows: u64 },
    Failed { first: usize, last: usize, error: StoreError },
}

/// Aggregate result of one import run. Callers assert on the counts;
/// the run as a whole succeeded only if at least one row was inserted.
#[derive(Debug)]
pub struct ImportReport {
    // ---
    pub device_id: String,

    /// Data rows read from the file.
    pub total_rows: usize,

    /// Rows that survived normalization.
    pub normalized: usize,

    /// Rows dropped at parse time, with their index and cause.
    pub parse_failures: Vec<(usize, RowParseError)>,

    /// Rows committed by the store.
    pub inserted: u64,

    /// Rows lost to failed batch inserts.
    pub insert_failed: usize,

    /// Per-batch outcomes, in submission order.
    pub batches: Vec<BatchOutcome>,
}

impl ImportReport {
    // ---
    pub fn parse_skipped(&self) -> usize {
        self.parse_failures.len()
    }

    pub fn succeeded(&self) -> bool {
        self.inserted > 0
    }

    /// Log the structured summary that accompanies both success and
    /// failure.
    pub fn log_summary(&self) {
        // ---
        info!("Import summary:");
        info!("  Total rows in CSV   : {}", self.total_rows);
        info!("  Parsed successfully : {}", self.normalized);
        info!("  Skipped at parse    : {}", self.parse_skipped());
        info!("  Inserted            : {}", self.inserted);
        info!("  Failed at insert    : {}", self.insert_failed);
        info!("  Device ID           : {}", self.device_id);
    }
}

// ---

/// Run one CSV import against the given store.
///
/// Fatal failures (`SourceNotFound`, `EmptySource`, `NoValidRecords`,
/// `PurgeFailed`) return an error; everything else is reported through
/// the [`ImportReport`]. A failed batch never aborts the remaining
/// batches.
pub async fn run<S: ReadingStore>(
    store: &S,
    opts: &ImportOptions,
) -> Result<ImportReport, ImportError> {
    // ---
    info!("Reading CSV file: {}", opts.file.display());
    let rows = source::read_rows(&opts.file)?;

    if rows.is_empty() {
        return Err(ImportError::EmptySource);
    }
    info!("Found {} records in CSV", rows.len());

    if opts.clear_existing {
        let deleted = store
            .delete_by_device(&opts.device_id)
            .await
            .map_err(ImportError::PurgeFailed)?;
        info!(
            "Deleted {deleted} existing records for device '{}'",
            opts.device_id
        );
    }

    let now = Utc::now();
    let base = normalize::base_timestamp(&rows, now);

    let mut readings = Vec::with_capacity(rows.len());
    let mut parse_failures = Vec::new();
    for (index, row) in rows.iter().enumerate() {
        match normalize::normalize(row, &opts.device_id, Some(base), now) {
            Ok(reading) => readings.push(reading),
            Err(e) => {
                warn!("Skipping row {index}: {e}");
                parse_failures.push((index, e));
            }
        }
    }

    info!("Parsed {} of {} records", readings.len(), rows.len());
    if readings.is_empty() {
        return Err(ImportError::NoValidRecords {
            total: rows.len(),
            skipped: parse_failures.len(),
        });
    }

    let batch_size = opts.batch_size.max(1);
    let mut inserted = 0u64;
    let mut insert_failed = 0usize;
    let mut batches = Vec::new();

    info!("Uploading to database (batch size: {batch_size})");
    for (batch_index, batch) in readings.chunks(batch_size).enumerate() {
        let first = batch_index * batch_size;
        let last = first + batch.len() - 1;

        match store.insert_many(batch).await {
            Ok(rows) => {
                inserted += rows;
                batches.push(BatchOutcome::Committed { rows });
                info!(
                    "  Progress: {}/{} records",
                    last + 1,
                    readings.len()
                );
            }
            Err(error) => {
                insert_failed += batch.len();
                error!(
                    "Error inserting batch {} (records {first} to {last}): {error}",
                    batch_index + 1
                );
                batches.push(BatchOutcome::Failed { first, last, error });
                // Continue with next batch instead of stopping
            }
        }
    }

    Ok(ImportReport {
        device_id: opts.device_id.clone(),
        total_rows: rows.len(),
        normalized: readings.len(),
        parse_failures,
        inserted,
        insert_failed,
        batches,
    })
}
