//! CSV batch import pipeline.
//!
//! Gateway module (EMBP): `source` reads and sniffs the file, `normalize`
//! types the rows and anchors the relative timeline, `loader` orchestrates
//! the batched write, `verify` re-reads the result for the operator.

pub mod loader;
pub mod normalize;
pub mod source;
pub mod verify;

// ---

pub use loader::{run, BatchOutcome, ImportOptions, ImportReport};
