//! Rangefinder scan types

use std::time::Instant;

/// A single rangefinder return.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanPoint {
    /// Bearing in degrees (negative = left, positive = right)
    pub bearing_deg: f64,
    /// Distance in millimeters
    pub distance_mm: f64,
}

impl ScanPoint {
    /// Create a new scan point
    pub fn new(bearing_deg: f64, distance_mm: f64) -> Self {
        Self {
            bearing_deg,
            distance_mm,
        }
    }
}

/// One decoded scan message.
#[derive(Debug, Clone)]
pub struct Scan {
    /// Returns in the order they appeared on the wire
    pub points: Vec<ScanPoint>,
    /// When the message was received
    pub received_at: Instant,
}

impl Scan {
    /// Create a scan stamped with the current instant
    pub fn new(points: Vec<ScanPoint>) -> Self {
        Self {
            points,
            received_at: Instant::now(),
        }
    }

    /// Number of returns
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the scan has no returns
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
