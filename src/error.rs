//! Error taxonomy for the CSV import pipeline.
//!
//! Only file-level and purge-level errors abort a whole run; a bad row is
//! dropped and counted, a failed batch is recorded and the loop moves on.
//! Those recoverable cases live in [`RowParseError`] and the per-batch
//! outcome type in `import::loader`, not here.

use std::path::PathBuf;

use thiserror::Error;

use crate::store::StoreError;

// ---

/// Fatal failures of one import run.
#[derive(Debug, Error)]
pub enum ImportError {
    // ---
    /// The input file does not exist.
    #[error("CSV file '{0}' not found")]
    SourceNotFound(PathBuf),

    /// The file parsed to zero data rows; nothing to do.
    #[error("no data rows in source file")]
    EmptySource,

    /// Every row failed normalization.
    #[error("no valid records after parsing ({skipped} of {total} rows skipped)")]
    NoValidRecords { total: usize, skipped: usize },

    /// The pre-import purge failed. Inserting on top of an inconsistent
    /// purge state would corrupt downstream statistics, so this aborts
    /// before any insert is attempted.
    #[error("failed to clear existing rows before import")]
    PurgeFailed(#[source] StoreError),

    #[error("failed to read source file")]
    Io(#[from] std::io::Error),

    #[error("failed to parse CSV")]
    Csv(#[from] csv::Error),
}

/// One row's fields failed type conversion. Recovered locally: the caller
/// counts the row and skips it.
///
/// `cause` is the integer parse failure when there was one; a value that
/// parses but overflows the timestamp arithmetic has no underlying error.
#[derive(Debug, Error)]
#[error("invalid {field} value '{value}' in row [{row}]")]
pub struct RowParseError {
    // ---
    pub field: &'static str,
    pub value: String,
    pub row: String,
    #[source]
    pub cause: Option<std::num::ParseIntError>,
}
