//! Approach/alarm/pass state machine

use crate::memory::{Marker, NotificationMemory};
use crate::selector::SelectorConfig;
use crate::session::TrackingSession;
use chrono::Local;
use geo_math::{bearing_degrees, distance_meters};
use hazard_store::{HazardCategory, HazardRecord, RoadClass};
use location_capture::PositionFix;
use serde::Serialize;
use tracing::{debug, info};

/// Tracker configuration. Defaults carry the production values.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Notification thresholds in metres, descending
    pub thresholds_m: Vec<u32>,
    /// Distance beyond which a hazard counts as passed (metres)
    pub clear_distance_m: f64,
    /// Eviction radius as a multiple of the clear distance
    pub eviction_multiple: f64,
    /// Minimum speed for bearing updates (km/h); slower fixes are too noisy
    pub bearing_min_speed_kmh: f64,
    pub selector: SelectorConfig,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            thresholds_m: vec![2000, 1000, 500],
            clear_distance_m: 50.0,
            eviction_multiple: 2.0,
            bearing_min_speed_kmh: 10.0,
            selector: SelectorConfig::default(),
        }
    }
}

/// Alert command emitted by the state machine, consumed by the sequencer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertCommand {
    /// A distance threshold fired: play the category cue chained to the
    /// distance cue. `lowest` marks the closest threshold, whose chain
    /// escalates into the continuous alarm.
    Notify {
        threshold_m: u32,
        category: HazardCategory,
        road_class: RoadClass,
        lowest: bool,
    },
    /// The tracked hazard was passed: stop alarm and haptics immediately,
    /// then play the passed cue.
    HazardPassed,
}

/// Per-fix status event for the external display collaborator.
#[derive(Debug, Clone, Serialize)]
pub struct StatusEvent {
    pub lat: f64,
    pub lng: f64,
    pub speed_kmh: f64,
    pub accuracy_m: f64,
    pub bearing_deg: f64,
    /// Local wall-clock time, HH:MM:SS
    pub time: String,
    /// Distance to the tracked hazard, or -1 when none
    pub distance_to_hazard_m: f64,
}

/// Everything one fix produced.
#[derive(Debug)]
pub struct FixOutcome {
    pub commands: Vec<AlertCommand>,
    pub status: StatusEvent,
}

/// The per-fix decision core. Owned and driven by the engine task; all
/// methods are synchronous and mutate through `&mut self` only.
#[derive(Debug, Default)]
pub struct ProximityTracker {
    config: TrackerConfig,
    session: TrackingSession,
    memory: NotificationMemory,
}

impl ProximityTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            session: TrackingSession::default(),
            memory: NotificationMemory::new(),
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn session(&self) -> &TrackingSession {
        &self.session
    }

    pub fn memory(&self) -> &NotificationMemory {
        &self.memory
    }

    /// Update the travel bearing from the previous fix position and return
    /// the value to use for candidate selection. Low-speed fixes retain the
    /// previous bearing.
    pub fn update_bearing(&mut self, fix: &PositionFix) -> f64 {
        if fix.speed_kmh >= self.config.bearing_min_speed_kmh {
            if let Some((lat, lng)) = self.session.last_position {
                self.session.bearing_deg = bearing_degrees(lat, lng, fix.lat, fix.lng);
            }
        }
        self.session.last_position = Some((fix.lat, fix.lng));
        self.session.bearing_deg
    }

    /// Run the state machine for one fix, given the selected candidate (or
    /// none) and the sequencer's current alarm state.
    pub fn process_fix(
        &mut self,
        fix: &PositionFix,
        candidate: Option<HazardRecord>,
        alarm_active: bool,
    ) -> FixOutcome {
        self.session.alarm_active = alarm_active;
        let mut commands = Vec::new();
        let mut distance_m = -1.0;

        let live = candidate.is_some();
        let target = candidate.or_else(|| {
            if self.session.fallback_spent {
                None
            } else {
                // A single dropped selector result must not trigger
                // pass-detection: keep the previous target one more cycle
                self.session.tracked.clone()
            }
        });

        match target {
            Some(hazard) if live => {
                let key = hazard.key();
                self.session.fallback_spent = false;
                distance_m = distance_meters(fix.lat, fix.lng, hazard.lat, hazard.lng);

                let is_approaching =
                    distance_m < self.session.last_distance_m && distance_m > 0.0;
                if is_approaching {
                    self.session.last_distance_m = distance_m;
                    self.session.was_approaching = true;
                }

                self.session.tracked = Some(hazard.clone());
                if self.session.watched_key != Some(key) {
                    info!(lat = hazard.lat, lng = hazard.lng, "Watch target changed");
                    self.session.watched_key = Some(key);
                }

                if self.detect_pass(&hazard, is_approaching, distance_m) {
                    self.memory.mark_fired(key, Marker::Passed);
                    info!(distance_m, "Hazard passed");
                    self.session.reset_target();
                    commands.push(AlertCommand::HazardPassed);
                    return FixOutcome {
                        commands,
                        status: self.status(fix, distance_m),
                    };
                }

                if let Some(cmd) = self.check_thresholds(&hazard, distance_m) {
                    commands.push(cmd);
                }
            }
            Some(hazard) => {
                // Fallback-only cycle: distance stays unknown, approach and
                // threshold checks are skipped
                debug!("Selector empty, retaining tracked hazard for one cycle");
                self.session.fallback_spent = true;
                self.session.tracked = Some(hazard);
            }
            None => {
                if self.session.watched_key.is_some() {
                    info!("Left hazard range");
                }
                self.session.reset_target();
                self.memory.evict(
                    fix.lat,
                    fix.lng,
                    self.config.clear_distance_m * self.config.eviction_multiple,
                );
            }
        }

        FixOutcome {
            commands,
            status: self.status(fix, distance_m),
        }
    }

    /// Once approached, now receding, and beyond the clear distance: passed.
    /// Transient hazards never emit a passed alert.
    fn detect_pass(&self, hazard: &HazardRecord, is_approaching: bool, distance_m: f64) -> bool {
        hazard.category == HazardCategory::FixedDirectional
            && self.session.alarm_active
            && self.session.was_approaching
            && !is_approaching
            && distance_m > self.config.clear_distance_m
            && !self.memory.has_fired(hazard.key(), Marker::Passed)
    }

    /// Fire the first unfired threshold the fix is inside, descending order.
    fn check_thresholds(&mut self, hazard: &HazardRecord, distance_m: f64) -> Option<AlertCommand> {
        let key = hazard.key();
        let lowest = self.config.thresholds_m.iter().copied().min()?;

        for &threshold in &self.config.thresholds_m {
            if distance_m >= f64::from(threshold)
                || self.memory.has_fired(key, Marker::Threshold(threshold))
            {
                continue;
            }
            // Transient hazards get no closest-threshold alert
            if hazard.category == HazardCategory::Transient && threshold == lowest {
                continue;
            }
            self.memory.mark_fired(key, Marker::Threshold(threshold));
            info!(threshold, distance_m, "Threshold notification");
            return Some(AlertCommand::Notify {
                threshold_m: threshold,
                category: hazard.category,
                road_class: hazard.road_class,
                lowest: threshold == lowest,
            });
        }
        None
    }

    fn status(&self, fix: &PositionFix, distance_m: f64) -> StatusEvent {
        StatusEvent {
            lat: fix.lat,
            lng: fix.lng,
            speed_kmh: fix.speed_kmh,
            accuracy_m: fix.accuracy_m,
            bearing_deg: self.session.bearing_deg,
            time: Local::now().format("%H:%M:%S").to_string(),
            distance_to_hazard_m: distance_m,
        }
    }
}
