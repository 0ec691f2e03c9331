//! Bearing-bucketed index over the latest rangefinder scan.
//!
//! Each bucket keeps the nearest return that fell into it, so an occluding
//! object masks anything farther away at the same bearing. A query looks at
//! the target bucket and its two neighbors only, which bounds both the cost
//! and the worst-case bearing error (1.5 bucket widths).

use std::collections::HashMap;

use crate::config::CorrelationConfig;
use crate::core::math::{bucket_center, bucket_index, in_front_hemisphere};
use crate::core::types::ScanPoint;

/// Result of a successful [`ScanIndex::query`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeMatch {
    /// Nearest return in the matched bucket (mm)
    pub distance_mm: f64,
    /// Absolute difference between the query bearing and the bucket center
    pub bearing_error_deg: f64,
}

/// Nearest-bearing lookup over one scan.
#[derive(Debug, Clone)]
pub struct ScanIndex {
    bucket_size_deg: f64,
    min_valid_distance_mm: f64,
    max_range_mm: f64,
    /// Bucket index -> minimum distance seen in that bucket
    buckets: HashMap<i32, f64>,
}

impl ScanIndex {
    /// Create an empty index.
    pub fn new(config: &CorrelationConfig) -> Self {
        Self {
            bucket_size_deg: config.bucket_size_deg,
            min_valid_distance_mm: config.min_valid_distance_mm,
            max_range_mm: config.max_range_mm,
            buckets: HashMap::new(),
        }
    }

    /// Check if a return is usable.
    ///
    /// Rejects non-finite values, bearings outside the front hemisphere,
    /// non-positive distances, self-reflections closer than the minimum
    /// and returns beyond the maximum range.
    #[inline]
    pub fn is_valid(&self, point: &ScanPoint) -> bool {
        point.distance_mm.is_finite()
            && in_front_hemisphere(point.bearing_deg)
            && point.distance_mm > 0.0
            && point.distance_mm >= self.min_valid_distance_mm
            && point.distance_mm <= self.max_range_mm
    }

    /// Replace the index contents with a new scan.
    ///
    /// Nothing from the previous scan survives. Returns the number of points
    /// that passed validation.
    pub fn rebuild(&mut self, points: &[ScanPoint]) -> usize {
        self.clear();

        let mut kept = 0;
        for point in points {
            if !self.is_valid(point) {
                continue;
            }
            kept += 1;

            let bucket = bucket_index(point.bearing_deg, self.bucket_size_deg);
            self.buckets
                .entry(bucket)
                .and_modify(|d| *d = d.min(point.distance_mm))
                .or_insert(point.distance_mm);
        }

        kept
    }

    /// Find the nearest populated bucket to `target_bearing_deg`.
    ///
    /// Examines the target bucket, then the one below, then the one above.
    /// The smallest bearing error wins; on a tie the first examined wins.
    /// Returns `None` when none of the three buckets is populated.
    pub fn query(&self, target_bearing_deg: f64) -> Option<RangeMatch> {
        if self.buckets.is_empty() || !target_bearing_deg.is_finite() {
            return None;
        }

        let bucket = bucket_index(target_bearing_deg, self.bucket_size_deg);
        let mut best: Option<RangeMatch> = None;

        for candidate in [bucket, bucket - 1, bucket + 1] {
            let Some(&distance_mm) = self.buckets.get(&candidate) else {
                continue;
            };
            let error = (target_bearing_deg - bucket_center(candidate, self.bucket_size_deg)).abs();
            if best.is_none_or(|b| error < b.bearing_error_deg) {
                best = Some(RangeMatch {
                    distance_mm,
                    bearing_error_deg: error,
                });
            }
        }

        best
    }

    /// Minimum distance stored for the bucket whose key is `bucket_key_deg`.
    pub fn bucket_distance(&self, bucket_key_deg: f64) -> Option<f64> {
        self.buckets
            .get(&bucket_index(bucket_key_deg, self.bucket_size_deg))
            .copied()
    }

    /// Number of populated buckets
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Check if no bucket is populated
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Drop all buckets
    pub fn clear(&mut self) {
        self.buckets.clear();
    }
}

impl Default for ScanIndex {
    fn default() -> Self {
        Self::new(&CorrelationConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn points(raw: &[(f64, f64)]) -> Vec<ScanPoint> {
        raw.iter().map(|&(b, d)| ScanPoint::new(b, d)).collect()
    }

    #[test]
    fn test_same_bucket_keeps_minimum() {
        let mut index = ScanIndex::default();
        index.rebuild(&points(&[(10.0, 2500.0), (12.4, 1800.0)]));

        assert_eq!(index.len(), 1);
        assert_relative_eq!(index.bucket_distance(10.0).unwrap(), 1800.0);
    }

    #[test]
    fn test_half_bearing_joins_even_bucket() {
        let mut index = ScanIndex::default();
        index.rebuild(&points(&[(12.5, 1000.0), (14.0, 3000.0), (-2.5, 1500.0)]));

        // 12.5 lands in bucket 10, leaving 14.0 alone in bucket 15
        assert_eq!(index.len(), 3);
        assert_relative_eq!(index.bucket_distance(10.0).unwrap(), 1000.0);
        assert_relative_eq!(index.bucket_distance(0.0).unwrap(), 1500.0);
        let m = index.query(15.0).unwrap();
        assert_relative_eq!(m.distance_mm, 3000.0);
        assert_relative_eq!(m.bearing_error_deg, 0.0);
    }

    #[test]
    fn test_closest_obstacle_masks_farther() {
        let mut index = ScanIndex::default();
        index.rebuild(&points(&[(-20.0, 900.0), (-21.0, 4000.0), (-19.0, 3000.0)]));

        assert_eq!(index.len(), 1);
        assert_relative_eq!(index.bucket_distance(-20.0).unwrap(), 900.0);
    }

    #[test]
    fn test_query_prefers_smallest_error() {
        let mut index = ScanIndex::default();
        index.rebuild(&points(&[(10.0, 2000.0), (15.0, 2200.0)]));

        let m = index.query(12.0).unwrap();
        assert_relative_eq!(m.distance_mm, 2000.0);
        assert_relative_eq!(m.bearing_error_deg, 2.0);
    }

    #[test]
    fn test_query_uses_neighbor_bucket() {
        let mut index = ScanIndex::default();
        index.rebuild(&points(&[(15.0, 2200.0)]));

        // 11 falls in bucket 10, which is empty; neighbor 15 is used
        let m = index.query(11.0).unwrap();
        assert_relative_eq!(m.distance_mm, 2200.0);
        assert_relative_eq!(m.bearing_error_deg, 4.0);
    }

    #[test]
    fn test_query_window_is_three_buckets() {
        let mut index = ScanIndex::default();
        index.rebuild(&points(&[(30.0, 1500.0)]));

        // Bucket 20 with neighbors 15 and 25: bucket 30 is out of reach
        assert!(index.query(20.0).is_none());
        assert!(index.query(25.0).is_some());
    }

    #[test]
    fn test_query_tie_prefers_lower_neighbor() {
        let mut index = ScanIndex::default();
        index.rebuild(&points(&[(5.0, 1000.0), (15.0, 3000.0)]));

        // Target bucket 10 is empty; both neighbors are 5° away
        let m = index.query(10.0).unwrap();
        assert_relative_eq!(m.distance_mm, 1000.0);
        assert_relative_eq!(m.bearing_error_deg, 5.0);
    }

    #[test]
    fn test_query_empty_index() {
        let index = ScanIndex::default();
        assert!(index.is_empty());
        assert!(index.query(0.0).is_none());
    }

    #[test]
    fn test_query_nan_target() {
        let mut index = ScanIndex::default();
        index.rebuild(&points(&[(0.0, 1000.0)]));
        assert!(index.query(f64::NAN).is_none());
    }

    #[test]
    fn test_rebuild_discards_invalid() {
        let mut index = ScanIndex::default();
        let kept = index.rebuild(&points(&[
            (0.0, 0.0),          // zero
            (5.0, -100.0),       // negative
            (10.0, 50.0),        // self-reflection
            (15.0, 5000.1),      // beyond max range
            (20.0, f64::NAN),    // NaN distance
            (f64::NAN, 1000.0),  // NaN bearing
            (120.0, 1000.0),     // behind the rider
            (25.0, 100.0),       // exactly minimum
            (30.0, 5000.0),      // exactly maximum
        ]));

        assert_eq!(kept, 2);
        assert_eq!(index.len(), 2);
        assert!(index.bucket_distance(25.0).is_some());
        assert!(index.bucket_distance(30.0).is_some());
    }

    #[test]
    fn test_rebuild_replaces_previous_scan() {
        let mut index = ScanIndex::default();
        index.rebuild(&points(&[(10.0, 1000.0), (40.0, 1200.0)]));
        index.rebuild(&points(&[(10.0, 3000.0)]));

        assert_eq!(index.len(), 1);
        assert_relative_eq!(index.bucket_distance(10.0).unwrap(), 3000.0);
        assert!(index.bucket_distance(40.0).is_none());
    }

    #[test]
    fn test_custom_bucket_size() {
        let config = CorrelationConfig {
            bucket_size_deg: 2.0,
            ..Default::default()
        };
        let mut index = ScanIndex::new(&config);
        index.rebuild(&points(&[(10.0, 1000.0), (12.0, 2000.0)]));

        assert_eq!(index.len(), 2);
        let m = index.query(10.6).unwrap();
        assert_relative_eq!(m.distance_mm, 1000.0);
        assert_relative_eq!(m.bearing_error_deg, 0.6, epsilon = 1e-9);
    }
}
