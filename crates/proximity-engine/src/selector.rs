//! Hazard candidate selection with directional filtering

use geo_math::{angle_difference, bearing_degrees, distance_meters};
use hazard_store::{HazardCategory, HazardRecord};
use location_capture::PositionFix;

/// Selection gates. Defaults carry the production values.
#[derive(Debug, Clone)]
pub struct SelectorConfig {
    /// Coarse scan radius (metres)
    pub coarse_radius_m: f64,
    /// Transient hazards are only relevant inside this radius (metres)
    pub transient_radius_m: f64,
    /// Minimum observer speed for directional hazards (km/h)
    pub min_speed_kmh: f64,
    /// Fix accuracy must be strictly better than this (metres)
    pub max_accuracy_m: f64,
    /// Band of bearing-vs-orientation difference in which the hazard faces
    /// oncoming traffic. The circular difference folds [150, 210] onto
    /// [150, 180].
    pub facing_min_deg: f64,
    pub facing_max_deg: f64,
    /// The hazard must lie within this cone around the travel direction
    pub ahead_cone_deg: f64,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            coarse_radius_m: 5000.0,
            transient_radius_m: 2000.0,
            min_speed_kmh: 30.0,
            max_accuracy_m: 25.0,
            facing_min_deg: 150.0,
            facing_max_deg: 210.0,
            ahead_cone_deg: 30.0,
        }
    }
}

/// Pick at most one hazard to track for this fix.
///
/// Fixed directional hazards must face oncoming traffic and lie ahead of the
/// observer, and are only considered at vehicle speed with a good fix.
/// Transient hazards pass on proximity alone. A qualifying fixed candidate
/// always wins over a transient one, regardless of relative distance.
pub fn select_candidate(
    fix: &PositionFix,
    bearing_deg: f64,
    hazards: &[HazardRecord],
    config: &SelectorConfig,
) -> Option<HazardRecord> {
    let mut best_fixed: Option<(&HazardRecord, f64)> = None;
    let mut best_transient: Option<(&HazardRecord, f64)> = None;

    for hazard in hazards {
        let dist = distance_meters(fix.lat, fix.lng, hazard.lat, hazard.lng);
        if dist >= config.coarse_radius_m {
            continue;
        }

        match hazard.category {
            HazardCategory::Transient => {
                if dist < config.transient_radius_m
                    && best_transient.map_or(true, |(_, best)| dist < best)
                {
                    best_transient = Some((hazard, dist));
                }
            }
            HazardCategory::FixedDirectional => {
                if fix.speed_kmh < config.min_speed_kmh || fix.accuracy_m >= config.max_accuracy_m
                {
                    continue;
                }
                let Some(direction) = hazard.direction_deg else {
                    continue;
                };

                // The camera's stated orientation must be roughly opposite
                // the travel direction (it faces oncoming traffic)
                let facing = angle_difference(bearing_deg, direction);
                if facing < config.facing_min_deg || facing > config.facing_max_deg {
                    continue;
                }

                // And the camera must lie ahead, not behind or to the side
                let to_hazard = bearing_degrees(fix.lat, fix.lng, hazard.lat, hazard.lng);
                if angle_difference(bearing_deg, to_hazard) > config.ahead_cone_deg {
                    continue;
                }

                if best_fixed.map_or(true, |(_, best)| dist < best) {
                    best_fixed = Some((hazard, dist));
                }
            }
        }
    }

    best_fixed.or(best_transient).map(|(h, _)| h.clone())
}
