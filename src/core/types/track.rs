//! Tracked object types

use std::fmt;
use std::time::Instant;

/// Opaque identity of a tracked object.
///
/// Derived from the label and the whole-degree bearing at creation, plus a
/// creation serial that keeps identities unique within one tracker. Used for
/// external reference and logs only; matching never looks at it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackId {
    label: String,
    bearing_bin: i32,
    serial: u32,
}

impl TrackId {
    /// Build an identity from the creating observation
    pub fn new(label: &str, initial_bearing_deg: f64, serial: u32) -> Self {
        Self {
            label: label.to_string(),
            bearing_bin: initial_bearing_deg.trunc() as i32,
            serial,
        }
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}#{}", self.label, self.bearing_bin, self.serial)
    }
}

/// Lifecycle state of a tracked object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackState {
    /// In the live table and eligible for matching
    #[default]
    Active,
    /// Removed from the table; terminal
    Evicted,
}

/// An object held in the tracker's live table.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedObject {
    pub id: TrackId,
    pub label: String,
    pub smoothed_bearing_deg: f64,
    /// `None` until an observation with a range has been merged
    pub smoothed_distance_mm: Option<f64>,
    pub smoothed_area_px2: f64,
    /// Last observed confidence (not smoothed)
    pub confidence: f64,
    pub last_seen: Instant,
    pub state: TrackState,
}

impl TrackedObject {
    /// Time since the object was last matched
    pub fn age_secs(&self, now: Instant) -> f64 {
        now.saturating_duration_since(self.last_seen).as_secs_f64()
    }

    /// True while the object is in the live table
    pub fn is_active(&self) -> bool {
        self.state == TrackState::Active
    }
}
