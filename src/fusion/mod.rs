//! Fusion algorithms.
//!
//! - [`ScanIndex`]: Bearing-bucketed lookup over the latest scan
//! - [`Correlator`]: Attaches scan range to camera detections
//! - [`Tracker`]: Identity-stable, smoothed object table with eviction
//!
//! All three are synchronous and single-owner; the fusion thread serializes
//! rebuild, correlation and tracking within a cycle.

mod correlator;
mod scan_index;
mod tracker;

pub use correlator::{CorrelationOutcome, Correlator};
pub use scan_index::{RangeMatch, ScanIndex};
pub use tracker::{TrackUpdate, Tracker};
