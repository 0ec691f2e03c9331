//! Core foundation layer.
//!
//! Bottom layer of the fusion stack with no internal dependencies.
//!
//! # Contents
//!
//! - [`types`]: Scan points, detections, correlated observations, tracked objects
//! - [`math`]: Bearing bucketing, hemisphere checks, exponential smoothing

pub mod math;
pub mod types;
