//! # Formats
//!
//! On-disk representation of committed deltas. Pure byte transformations
//! live next to the append-only log that stores them.

pub mod delta_log;

pub use delta_log::{DeltaHeader, DeltaLog, delta_from_bytes, delta_to_bytes};
