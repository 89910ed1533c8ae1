//! Tracking session state

use hazard_store::{HazardKey, HazardRecord};

/// Process-wide tracking state: at most one hazard is tracked at any
/// instant. Lives for the lifetime of the alert engine and is mutated only
/// by the owning task.
#[derive(Debug)]
pub struct TrackingSession {
    /// The hazard currently being tracked, if any
    pub tracked: Option<HazardRecord>,
    /// Closest distance seen so far on the current approach (metres)
    pub last_distance_m: f64,
    /// Whether the observer has been approaching the tracked hazard at any
    /// point this cycle. Monotonic until the session loses its target.
    pub was_approaching: bool,
    /// Mirror of the alert sequencer's alarm state, refreshed per fix
    pub alarm_active: bool,
    /// Current travel bearing in compass degrees
    pub bearing_deg: f64,
    /// Previous fix position, for bearing updates
    pub(crate) last_position: Option<(f64, f64)>,
    /// Whether the one-cycle fallback for a lost selector result was used
    pub(crate) fallback_spent: bool,
    /// Key of the hazard last logged as the watch target
    pub(crate) watched_key: Option<HazardKey>,
}

impl Default for TrackingSession {
    fn default() -> Self {
        Self {
            tracked: None,
            last_distance_m: f64::INFINITY,
            was_approaching: false,
            alarm_active: false,
            bearing_deg: 0.0,
            last_position: None,
            fallback_spent: false,
            watched_key: None,
        }
    }
}

impl TrackingSession {
    /// Drop the tracked hazard and reset the approach flags. Bearing and
    /// position history survive; they describe the observer, not the target.
    pub fn reset_target(&mut self) {
        self.tracked = None;
        self.last_distance_m = f64::INFINITY;
        self.was_approaching = false;
        self.alarm_active = false;
        self.fallback_spent = false;
        self.watched_key = None;
    }
}
