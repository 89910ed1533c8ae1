//! Notification dedup memory with geographic eviction

use geo_math::distance_meters;
use hazard_store::HazardKey;
use std::collections::HashSet;
use tracing::debug;

/// What fired for a hazard: a distance threshold or the pass event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marker {
    /// A distance threshold in metres (2000/1000/500)
    Threshold(u32),
    Passed,
}

/// Per-hazard per-marker dedup set.
///
/// Entries are added when an alert fires and removed only by the geographic
/// eviction sweep, which runs when the tracked hazard is unset. That bounds
/// growth to hazards encountered and left behind while guaranteeing an
/// already-alerted hazard is not re-alerted while still nearby.
#[derive(Debug, Default)]
pub struct NotificationMemory {
    fired: HashSet<(HazardKey, Marker)>,
}

impl NotificationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_fired(&self, key: HazardKey, marker: Marker) -> bool {
        self.fired.contains(&(key, marker))
    }

    pub fn mark_fired(&mut self, key: HazardKey, marker: Marker) {
        self.fired.insert((key, marker));
    }

    /// Remove every entry whose hazard coordinates lie farther than
    /// `radius_m` from the given point. Returns the number of entries
    /// removed.
    pub fn evict(&mut self, lat: f64, lng: f64, radius_m: f64) -> usize {
        let before = self.fired.len();
        self.fired
            .retain(|(key, _)| distance_meters(lat, lng, key.lat(), key.lng()) <= radius_m);
        let removed = before - self.fired.len();
        if removed > 0 {
            debug!(removed, "Evicted stale notification markers");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.fired.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fired.is_empty()
    }
}
