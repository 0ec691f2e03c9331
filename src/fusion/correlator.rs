//! Detection-to-scan correlation.
//!
//! Pairs a camera detection with the nearest scan bucket. A detection with
//! no return in tolerance is still forwarded (bearing-only) so the tracker
//! can keep its presence; only malformed or out-of-coverage detections are
//! dropped here.

use crate::config::CorrelationConfig;
use crate::core::math::in_front_hemisphere;
use crate::core::types::{CorrelatedObservation, DetectionObservation};
use crate::fusion::ScanIndex;

/// What happened to one detection.
#[derive(Debug, Clone, PartialEq)]
pub enum CorrelationOutcome {
    /// Matched a scan return within tolerance
    Ranged(CorrelatedObservation),
    /// No return within tolerance; forwarded with unknown range
    BearingOnly(CorrelatedObservation),
    /// Bearing outside the rangefinder's coverage; dropped
    OutsideHemisphere,
    /// Non-finite or negative field; dropped
    Malformed,
}

impl CorrelationOutcome {
    /// The observation to hand to the tracker, if any.
    pub fn into_observation(self) -> Option<CorrelatedObservation> {
        match self {
            Self::Ranged(obs) | Self::BearingOnly(obs) => Some(obs),
            Self::OutsideHemisphere | Self::Malformed => None,
        }
    }

    /// True if the detection was dropped
    pub fn is_dropped(&self) -> bool {
        matches!(self, Self::OutsideHemisphere | Self::Malformed)
    }
}

/// Stateless correlator; the scan index is supplied per call.
#[derive(Debug, Clone)]
pub struct Correlator {
    max_angle_diff_deg: f64,
}

impl Correlator {
    /// Create a correlator
    pub fn new(config: &CorrelationConfig) -> Self {
        Self {
            max_angle_diff_deg: config.max_angle_diff_deg,
        }
    }

    /// Correlate one detection against the current scan index.
    pub fn correlate(&self, detection: &DetectionObservation, index: &ScanIndex) -> CorrelationOutcome {
        if !detection.is_finite() || detection.area_px2 < 0.0 {
            log::warn!(
                "Dropping malformed detection '{}' (bearing {}, area {}, confidence {})",
                detection.label,
                detection.bearing_deg,
                detection.area_px2,
                detection.confidence
            );
            return CorrelationOutcome::Malformed;
        }

        if !in_front_hemisphere(detection.bearing_deg) {
            log::warn!(
                "Dropping '{}' at {:+.1}°: outside rangefinder coverage",
                detection.label,
                detection.bearing_deg
            );
            return CorrelationOutcome::OutsideHemisphere;
        }

        let observation = CorrelatedObservation::bearing_only(
            detection.label.clone(),
            detection.confidence.clamp(0.0, 1.0),
            detection.bearing_deg,
            detection.area_px2,
        );

        match index.query(detection.bearing_deg) {
            Some(m) if m.bearing_error_deg <= self.max_angle_diff_deg => {
                log::trace!(
                    "'{}' at {:+.1}° matched {:.0}mm (error {:.1}°)",
                    detection.label,
                    detection.bearing_deg,
                    m.distance_mm,
                    m.bearing_error_deg
                );
                CorrelationOutcome::Ranged(observation.with_range(m.distance_mm, m.bearing_error_deg))
            }
            _ => CorrelationOutcome::BearingOnly(observation),
        }
    }
}

impl Default for Correlator {
    fn default() -> Self {
        Self::new(&CorrelationConfig::default())
    }
}
