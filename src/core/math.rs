//! Numeric primitives shared by the scan index, correlator and tracker.

use crate::config::FRONT_HEMISPHERE_DEG;
use std::time::{SystemTime, UNIX_EPOCH};

/// Index of the bearing bucket containing `bearing_deg`.
///
/// Buckets are centered on multiples of `bucket_size_deg`; a bearing maps to
/// the nearest center. Halves go to the even index, so the rig's HUD and
/// this daemon agree on every boundary bearing.
///
/// # Example
/// ```
/// use drishti::core::math::bucket_index;
///
/// assert_eq!(bucket_index(10.0, 5.0), 2);
/// assert_eq!(bucket_index(12.4, 5.0), 2);
/// assert_eq!(bucket_index(12.5, 5.0), 2);
/// assert_eq!(bucket_index(12.6, 5.0), 3);
/// assert_eq!(bucket_index(-7.6, 5.0), -2);
/// ```
#[inline]
pub fn bucket_index(bearing_deg: f64, bucket_size_deg: f64) -> i32 {
    (bearing_deg / bucket_size_deg).round_ties_even() as i32
}

/// Center bearing of the bucket with the given index.
#[inline]
pub fn bucket_center(index: i32, bucket_size_deg: f64) -> f64 {
    index as f64 * bucket_size_deg
}

/// Bucket key for a bearing: `round(bearing / size) * size`.
#[inline]
pub fn bucket_key(bearing_deg: f64, bucket_size_deg: f64) -> f64 {
    bucket_center(bucket_index(bearing_deg, bucket_size_deg), bucket_size_deg)
}

/// True if the bearing lies in the rangefinder's front hemisphere.
///
/// NaN is never in the hemisphere.
#[inline]
pub fn in_front_hemisphere(bearing_deg: f64) -> bool {
    (-FRONT_HEMISPHERE_DEG..=FRONT_HEMISPHERE_DEG).contains(&bearing_deg)
}

/// One exponential moving average step.
///
/// `alpha` weights the new observation: `alpha * observed + (1 - alpha) * previous`.
#[inline]
pub fn ema(previous: f64, observed: f64, alpha: f64) -> f64 {
    alpha * observed + (1.0 - alpha) * previous
}

/// Wall-clock time as float seconds since the Unix epoch.
pub fn unix_time_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
