//! Position fix sample type

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One GPS position sample. Immutable once received.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionFix {
    /// Latitude in decimal degrees
    pub lat: f64,
    /// Longitude in decimal degrees
    pub lng: f64,
    /// Ground speed in km/h (never negative)
    pub speed_kmh: f64,
    /// Horizontal accuracy estimate in metres (never negative)
    pub accuracy_m: f64,
    /// Capture time
    pub timestamp: DateTime<Utc>,
}

impl PositionFix {
    /// Build a fix stamped with the current time.
    pub fn new(lat: f64, lng: f64, speed_kmh: f64, accuracy_m: f64) -> Self {
        Self {
            lat,
            lng,
            speed_kmh,
            accuracy_m,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fix_construction() {
        let fix = PositionFix::new(35.0, 135.0, 42.5, 8.0);
        assert_eq!(fix.lat, 35.0);
        assert_eq!(fix.speed_kmh, 42.5);
    }
}
