//! Core data types for fusion.
//!
//! - [`ScanPoint`], [`Scan`]: Rangefinder returns in bearing/distance form
//! - [`DetectionObservation`], [`DetectionFrame`]: Camera detections
//! - [`CorrelatedObservation`]: A detection with its matched range (if any)
//! - [`TrackedObject`], [`TrackId`]: Durable entries of the object table

mod detection;
mod scan;
mod track;

pub use detection::{CorrelatedObservation, DetectionFrame, DetectionObservation};
pub use scan::{Scan, ScanPoint};
pub use track::{TrackId, TrackState, TrackedObject};
