//! Persistent object table.
//!
//! Association is deliberately naive: the first same-label entry (in
//! creation order) whose smoothed bearing lies within the merge threshold
//! absorbs the observation. There is no motion model and no global
//! assignment across candidates.
//!
//! Each matched field is smoothed with an exponential moving average;
//! confidence and last-seen time are overwritten. Objects not matched for
//! longer than the persistence window are evicted once per cycle.

use std::time::Instant;

use crate::config::TrackerConfig;
use crate::core::math::ema;
use crate::core::types::{CorrelatedObservation, TrackId, TrackState, TrackedObject};

/// Effect of one observation on the table.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackUpdate {
    /// A new object was created
    Created(TrackId),
    /// An existing object absorbed the observation
    Updated(TrackId),
    /// The observation was malformed and ignored
    Rejected,
}

/// Identity-stable, smoothed object table.
#[derive(Debug, Clone)]
pub struct Tracker {
    config: TrackerConfig,
    /// Live objects in creation order
    objects: Vec<TrackedObject>,
    next_serial: u32,
}

impl Tracker {
    /// Create an empty tracker
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            objects: Vec::new(),
            next_serial: 0,
        }
    }

    /// Merge one correlated observation into the table.
    pub fn observe(&mut self, obs: &CorrelatedObservation, now: Instant) -> TrackUpdate {
        if !obs.is_finite() || obs.distance_mm.is_some_and(|d| d <= 0.0) {
            log::warn!(
                "Tracker ignoring malformed observation '{}' (bearing {}, distance {:?})",
                obs.label,
                obs.bearing_deg,
                obs.distance_mm
            );
            return TrackUpdate::Rejected;
        }

        let alpha = self.config.smoothing_alpha;
        let threshold = self.config.merge_bearing_threshold_deg;

        if let Some(object) = self.objects.iter_mut().find(|o| {
            o.is_active()
                && o.label == obs.label
                && (o.smoothed_bearing_deg - obs.bearing_deg).abs() <= threshold
        }) {
            object.smoothed_bearing_deg = ema(object.smoothed_bearing_deg, obs.bearing_deg, alpha);
            object.smoothed_area_px2 = ema(object.smoothed_area_px2, obs.area_px2, alpha);
            if let Some(observed) = obs.distance_mm {
                object.smoothed_distance_mm = Some(match object.smoothed_distance_mm {
                    Some(previous) => ema(previous, observed, alpha),
                    None => observed,
                });
            }
            object.confidence = obs.confidence;
            object.last_seen = now;

            log::trace!(
                "Updated {} -> {:+.1}° {:?}mm",
                object.id,
                object.smoothed_bearing_deg,
                object.smoothed_distance_mm
            );
            return TrackUpdate::Updated(object.id.clone());
        }

        let id = TrackId::new(&obs.label, obs.bearing_deg, self.next_serial);
        self.next_serial = self.next_serial.wrapping_add(1);

        log::debug!(
            "Tracking new object {} at {:+.1}° ({})",
            id,
            obs.bearing_deg,
            match obs.distance_mm {
                Some(d) => format!("{:.0}mm", d),
                None => "range unknown".to_string(),
            }
        );

        self.objects.push(TrackedObject {
            id: id.clone(),
            label: obs.label.clone(),
            smoothed_bearing_deg: obs.bearing_deg,
            smoothed_distance_mm: obs.distance_mm,
            smoothed_area_px2: obs.area_px2,
            confidence: obs.confidence,
            last_seen: now,
            state: TrackState::Active,
        });

        TrackUpdate::Created(id)
    }

    /// Remove every object unmatched for longer than the persistence window.
    ///
    /// Returns the removed objects, marked [`TrackState::Evicted`].
    pub fn evict(&mut self, now: Instant) -> Vec<TrackedObject> {
        let window = self.config.persistence_window_sec;
        let mut evicted = Vec::new();

        let mut i = 0;
        while i < self.objects.len() {
            if self.objects[i].age_secs(now) > window {
                let mut object = self.objects.remove(i);
                object.state = TrackState::Evicted;
                log::debug!(
                    "Evicted {} (unseen for {:.2}s)",
                    object.id,
                    object.age_secs(now)
                );
                evicted.push(object);
            } else {
                i += 1;
            }
        }

        evicted
    }

    /// Live objects in creation order
    pub fn snapshot(&self) -> &[TrackedObject] {
        &self.objects
    }

    /// Look up a live object by identity
    pub fn get(&self, id: &TrackId) -> Option<&TrackedObject> {
        self.objects.iter().find(|o| &o.id == id)
    }

    /// Number of live objects
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl Default for Tracker {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::time::Duration;

    fn ranged(label: &str, bearing: f64, distance: f64) -> CorrelatedObservation {
        CorrelatedObservation::bearing_only(label, 0.8, bearing, 10000.0).with_range(distance, 0.0)
    }

    #[test]
    fn test_create_initializes_directly() {
        let mut tracker = Tracker::default();
        let t0 = Instant::now();

        let update = tracker.observe(&ranged("car", -30.0, 4000.0), t0);
        assert!(matches!(update, TrackUpdate::Created(_)));

        let obj = &tracker.snapshot()[0];
        assert_relative_eq!(obj.smoothed_bearing_deg, -30.0);
        assert_relative_eq!(obj.smoothed_distance_mm.unwrap(), 4000.0);
        assert_relative_eq!(obj.smoothed_area_px2, 10000.0);
        assert_eq!(obj.last_seen, t0);
        assert_eq!(obj.state, TrackState::Active);
    }

    #[test]
    fn test_merge_identity_stability() {
        let mut tracker = Tracker::default();
        let t0 = Instant::now();

        let first = tracker.observe(&ranged("person", 20.0, 3000.0), t0);
        let second = tracker.observe(&ranged("person", 22.0, 2900.0), t0 + Duration::from_millis(100));
        let TrackUpdate::Created(id) = first else {
            panic!("expected creation");
        };
        assert_eq!(second, TrackUpdate::Updated(id.clone()));
        assert_eq!(tracker.len(), 1);

        let third = tracker.observe(&ranged("person", 60.0, 1500.0), t0 + Duration::from_millis(200));
        assert!(matches!(third, TrackUpdate::Created(ref other) if *other != id));
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn test_different_label_never_merges() {
        let mut tracker = Tracker::default();
        let t0 = Instant::now();

        tracker.observe(&ranged("person", 20.0, 3000.0), t0);
        tracker.observe(&ranged("bicycle", 20.0, 3000.0), t0);
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn test_ema_update_fields() {
        let mut tracker = Tracker::default();
        let t0 = Instant::now();
        let t1 = t0 + Duration::from_millis(50);

        tracker.observe(&ranged("car", 10.0, 2000.0), t0);
        let mut obs = ranged("car", 14.0, 3000.0);
        obs.area_px2 = 20000.0;
        obs.confidence = 0.55;
        tracker.observe(&obs, t1);

        let obj = &tracker.snapshot()[0];
        assert_relative_eq!(obj.smoothed_bearing_deg, 0.3 * 14.0 + 0.7 * 10.0);
        assert_relative_eq!(obj.smoothed_distance_mm.unwrap(), 0.3 * 3000.0 + 0.7 * 2000.0);
        assert_relative_eq!(obj.smoothed_area_px2, 0.3 * 20000.0 + 0.7 * 10000.0);
        assert_relative_eq!(obj.confidence, 0.55);
        assert_eq!(obj.last_seen, t1);
    }

    #[test]
    fn test_bearing_only_keeps_previous_distance() {
        let mut tracker = Tracker::default();
        let t0 = Instant::now();

        tracker.observe(&ranged("car", 10.0, 2000.0), t0);
        tracker.observe(&CorrelatedObservation::bearing_only("car", 0.9, 11.0, 10000.0), t0);

        let obj = &tracker.snapshot()[0];
        assert_relative_eq!(obj.smoothed_distance_mm.unwrap(), 2000.0);
        assert_relative_eq!(obj.smoothed_bearing_deg, 0.3 * 11.0 + 0.7 * 10.0);
    }

    #[test]
    fn test_first_range_initializes_bearing_only_object() {
        let mut tracker = Tracker::default();
        let t0 = Instant::now();

        tracker.observe(&CorrelatedObservation::bearing_only("dog", 0.6, -5.0, 800.0), t0);
        assert_eq!(tracker.snapshot()[0].smoothed_distance_mm, None);

        tracker.observe(&ranged("dog", -4.0, 1200.0), t0);
        assert_relative_eq!(tracker.snapshot()[0].smoothed_distance_mm.unwrap(), 1200.0);
    }

    #[test]
    fn test_converges_to_constant_observation() {
        let mut tracker = Tracker::default();
        let t0 = Instant::now();

        tracker.observe(&ranged("truck", 0.0, 1000.0), t0);
        for _ in 0..10 {
            tracker.observe(&ranged("truck", 4.0, 2000.0), t0);
        }

        let obj = &tracker.snapshot()[0];
        let residual = 0.7f64.powi(10);
        assert_relative_eq!(obj.smoothed_bearing_deg, 4.0 - 4.0 * residual, epsilon = 1e-9);
        assert_relative_eq!(obj.smoothed_distance_mm.unwrap(), 2000.0 - 1000.0 * residual, epsilon = 1e-6);
        assert!((obj.smoothed_bearing_deg - 4.0).abs() < 0.03 * 4.0);
    }

    #[test]
    fn test_first_match_wins() {
        let mut tracker = Tracker::default();
        let t0 = Instant::now();

        tracker.observe(&ranged("person", 10.0, 1000.0), t0);
        tracker.observe(&ranged("person", 18.0, 1000.0), t0);
        assert_eq!(tracker.len(), 2);

        // 14 is within 5° of both; the older entry takes it
        let update = tracker.observe(&ranged("person", 14.0, 1000.0), t0);
        assert_eq!(update, TrackUpdate::Updated(tracker.snapshot()[0].id.clone()));
        assert_relative_eq!(tracker.snapshot()[1].smoothed_bearing_deg, 18.0);
    }

    #[test]
    fn test_eviction() {
        let mut tracker = Tracker::default();
        let t0 = Instant::now();

        tracker.observe(&ranged("person", 0.0, 1000.0), t0);
        tracker.observe(&ranged("car", 40.0, 3000.0), t0 + Duration::from_secs_f64(2.5));

        // person last seen 3.0s ago, car 0.5s ago
        let evicted = tracker.evict(t0 + Duration::from_secs_f64(3.0));
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].label, "person");
        assert_eq!(evicted[0].state, TrackState::Evicted);
        assert_eq!(tracker.len(), 1);
        assert_eq!(tracker.snapshot()[0].label, "car");
    }

    #[test]
    fn test_eviction_window_is_exclusive() {
        let mut tracker = Tracker::default();
        let t0 = Instant::now();

        tracker.observe(&ranged("person", 0.0, 1000.0), t0);
        assert!(tracker.evict(t0 + Duration::from_secs(2)).is_empty());
        assert_eq!(tracker.evict(t0 + Duration::from_millis(2001)).len(), 1);
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_malformed_observation_rejected() {
        let mut tracker = Tracker::default();
        let t0 = Instant::now();
        tracker.observe(&ranged("person", 0.0, 1000.0), t0);

        let nan = CorrelatedObservation::bearing_only("person", 0.8, f64::NAN, 100.0);
        assert_eq!(tracker.observe(&nan, t0), TrackUpdate::Rejected);
        let bad_range = ranged("person", 0.0, f64::INFINITY);
        assert_eq!(tracker.observe(&bad_range, t0), TrackUpdate::Rejected);

        assert_eq!(tracker.len(), 1);
        assert_relative_eq!(tracker.snapshot()[0].smoothed_distance_mm.unwrap(), 1000.0);
    }

    #[test]
    fn test_identities_unique() {
        let mut tracker = Tracker::default();
        let t0 = Instant::now();

        // Same label and starting bearing; the first drifts away before the second appears
        tracker.observe(&ranged("person", 20.3, 1000.0), t0);
        for _ in 0..30 {
            let b = tracker.snapshot()[0].smoothed_bearing_deg + 4.0;
            tracker.observe(&ranged("person", b, 1000.0), t0);
        }
        assert_eq!(tracker.len(), 1);
        tracker.observe(&ranged("person", 20.7, 1000.0), t0);

        let ids: Vec<_> = tracker.snapshot().iter().map(|o| o.id.clone()).collect();
        assert_eq!(ids.len(), 2);
        // Same label and whole-degree bearing; only the serial tells them apart
        assert!(ids[0].to_string().starts_with("person_20#"));
        assert!(ids[1].to_string().starts_with("person_20#"));
        assert_ne!(ids[0], ids[1]);
        assert!(tracker.get(&ids[1]).is_some());
    }
}
