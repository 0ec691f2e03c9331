//! Camera detection types

use std::time::Instant;

/// A single camera detection, ready for correlation.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionObservation {
    /// Class label (e.g. "person", "bicycle")
    pub label: String,
    /// Detector confidence in [0, 1]
    pub confidence: f64,
    /// Bearing of the bounding-box center in degrees
    pub bearing_deg: f64,
    /// Bounding-box area in pixels²
    pub area_px2: f64,
    /// When the carrying message was received
    pub received_at: Instant,
    /// Producer's frame counter, for logging only
    pub frame: Option<u64>,
    /// Producer's own tracker id, for logging only
    pub track_id: Option<i64>,
}

impl DetectionObservation {
    /// Create an observation stamped with the current instant
    pub fn new(label: impl Into<String>, confidence: f64, bearing_deg: f64, area_px2: f64) -> Self {
        Self {
            label: label.into(),
            confidence,
            bearing_deg,
            area_px2,
            received_at: Instant::now(),
            frame: None,
            track_id: None,
        }
    }

    /// True if every numeric field is finite
    pub fn is_finite(&self) -> bool {
        self.confidence.is_finite() && self.bearing_deg.is_finite() && self.area_px2.is_finite()
    }
}

/// One decoded detections message.
#[derive(Debug, Clone)]
pub struct DetectionFrame {
    /// Producer timestamp (float seconds), if present
    pub timestamp: Option<f64>,
    /// Producer frame counter, if present
    pub frame: Option<u64>,
    /// Detections in message order
    pub observations: Vec<DetectionObservation>,
}

/// A detection after scan correlation.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelatedObservation {
    pub label: String,
    pub confidence: f64,
    pub bearing_deg: f64,
    pub area_px2: f64,
    /// Range of the matched scan bucket; `None` when nothing was within tolerance
    pub distance_mm: Option<f64>,
    /// Bearing error to the matched bucket center
    pub bearing_error_deg: Option<f64>,
}

impl CorrelatedObservation {
    /// Observation with no range information
    pub fn bearing_only(label: impl Into<String>, confidence: f64, bearing_deg: f64, area_px2: f64) -> Self {
        Self {
            label: label.into(),
            confidence,
            bearing_deg,
            area_px2,
            distance_mm: None,
            bearing_error_deg: None,
        }
    }

    /// Attach a matched range
    pub fn with_range(mut self, distance_mm: f64, bearing_error_deg: f64) -> Self {
        self.distance_mm = Some(distance_mm);
        self.bearing_error_deg = Some(bearing_error_deg);
        self
    }

    /// True if every numeric field that is present is finite
    pub fn is_finite(&self) -> bool {
        self.confidence.is_finite()
            && self.bearing_deg.is_finite()
            && self.area_px2.is_finite()
            && self.distance_mm.is_none_or(f64::is_finite)
    }
}
