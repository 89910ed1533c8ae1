//! Hazard record model and per-record validation

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Hazard category, decoded from the database's integer system-type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HazardCategory {
    /// Stationary camera with a meaningful orientation; only relevant to
    /// traffic approaching from a specific direction.
    FixedDirectional,
    /// Temporary/mobile camera with no reliable orientation; proximity alone
    /// triggers alerts.
    Transient,
}

/// Road class the hazard sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoadClass {
    General,
    Expressway,
}

/// Identity of a hazard: its coordinate pair. The database carries no stable
/// numeric id, so the coordinates are the key. Bit-exact equality is what we
/// want here: the coordinates come verbatim from the database, never from
/// arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HazardKey {
    lat_bits: u64,
    lng_bits: u64,
}

impl HazardKey {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat_bits: lat.to_bits(),
            lng_bits: lng.to_bits(),
        }
    }

    pub fn lat(&self) -> f64 {
        f64::from_bits(self.lat_bits)
    }

    pub fn lng(&self) -> f64 {
        f64::from_bits(self.lng_bits)
    }
}

/// One validated hazard record. Read-only during a tracking session.
#[derive(Debug, Clone, PartialEq)]
pub struct HazardRecord {
    pub lat: f64,
    pub lng: f64,
    pub category: HazardCategory,
    /// Orientation in degrees `[0, 360)`. Present for `FixedDirectional`,
    /// `None` for `Transient`.
    pub direction_deg: Option<f64>,
    pub road_class: RoadClass,
}

impl HazardRecord {
    pub fn key(&self) -> HazardKey {
        HazardKey::new(self.lat, self.lng)
    }
}

/// Raw database record as it appears in the JSON feed. All fields optional so
/// a malformed record fails validation rather than the whole parse.
#[derive(Debug, Deserialize)]
pub struct RawHazard {
    #[serde(rename = "decLatitude")]
    pub dec_latitude: Option<f64>,
    #[serde(rename = "decLongitude")]
    pub dec_longitude: Option<f64>,
    #[serde(rename = "intSystemType")]
    pub int_system_type: Option<i64>,
    #[serde(rename = "intDirection")]
    pub int_direction: Option<f64>,
    #[serde(rename = "intRoadType")]
    pub int_road_type: Option<i64>,
}

impl RawHazard {
    /// Validate one raw record. Returns `None` (with a warning) for records
    /// missing required fields or carrying unknown codes.
    pub fn validate(self, index: usize) -> Option<HazardRecord> {
        let (Some(lat), Some(lng)) = (self.dec_latitude, self.dec_longitude) else {
            warn!(index, "Skipping hazard record without coordinates");
            return None;
        };

        let category = match self.int_system_type {
            Some(1..=4) | Some(8..=10) => HazardCategory::FixedDirectional,
            Some(5..=7) => HazardCategory::Transient,
            other => {
                warn!(index, code = ?other, "Skipping hazard record with unknown system type");
                return None;
            }
        };

        let direction_deg = match category {
            HazardCategory::FixedDirectional => match self.int_direction {
                Some(d) => Some(d.rem_euclid(360.0)),
                None => {
                    warn!(index, "Skipping directional hazard without direction");
                    return None;
                }
            },
            HazardCategory::Transient => None,
        };

        let road_class = match self.int_road_type {
            Some(2) => RoadClass::Expressway,
            // 1 = general road; the feed occasionally omits the field
            Some(1) | None => RoadClass::General,
            other => {
                warn!(index, code = ?other, "Skipping hazard record with unknown road type");
                return None;
            }
        };

        Some(HazardRecord {
            lat,
            lng,
            category,
            direction_deg,
            road_class,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(system_type: i64, direction: Option<f64>) -> RawHazard {
        RawHazard {
            dec_latitude: Some(35.0),
            dec_longitude: Some(135.0),
            int_system_type: Some(system_type),
            int_direction: direction,
            int_road_type: Some(1),
        }
    }

    #[test]
    fn test_system_type_mapping() {
        for code in [1, 2, 3, 4, 8, 9, 10] {
            let record = raw(code, Some(180.0)).validate(0).unwrap();
            assert_eq!(record.category, HazardCategory::FixedDirectional);
            assert_eq!(record.direction_deg, Some(180.0));
        }
        for code in [5, 6, 7] {
            let record = raw(code, None).validate(0).unwrap();
            assert_eq!(record.category, HazardCategory::Transient);
            assert_eq!(record.direction_deg, None);
        }
    }

    #[test]
    fn test_unknown_system_type_skipped() {
        assert!(raw(0, Some(180.0)).validate(0).is_none());
        assert!(raw(11, Some(180.0)).validate(0).is_none());
    }

    #[test]
    fn test_directional_requires_direction() {
        assert!(raw(1, None).validate(0).is_none());
    }

    #[test]
    fn test_missing_coordinates_skipped() {
        let record = RawHazard {
            dec_latitude: None,
            dec_longitude: Some(135.0),
            int_system_type: Some(1),
            int_direction: Some(90.0),
            int_road_type: Some(1),
        };
        assert!(record.validate(0).is_none());
    }

    #[test]
    fn test_direction_normalised() {
        let record = raw(1, Some(370.0)).validate(0).unwrap();
        assert_eq!(record.direction_deg, Some(10.0));
    }

    #[test]
    fn test_key_identity() {
        let a = raw(1, Some(0.0)).validate(0).unwrap();
        let b = raw(2, Some(90.0)).validate(0).unwrap();
        assert_eq!(a.key(), b.key());
        assert_eq!(a.key().lat(), 35.0);
    }
}
