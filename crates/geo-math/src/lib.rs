//! Geodesic Math Primitives
//!
//! Pure bearing/distance/angle helpers shared by the candidate selector and
//! the proximity tracker. Spherical-earth approximation throughout, which is
//! within a few metres of the geodesic result for the sub-10 km distances the
//! alert engine works at.

/// Mean earth radius in metres (spherical model).
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Initial great-circle bearing from point 1 to point 2, in compass degrees
/// normalised to `[0, 360)`.
pub fn bearing_degrees(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_lambda = (lng2 - lng1).to_radians();

    let y = delta_lambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();

    (y.atan2(x).to_degrees() + 360.0) % 360.0
}

/// Great-circle distance between two coordinates in metres (haversine).
pub fn distance_meters(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_phi = (lat2 - lat1).to_radians();
    let delta_lambda = (lng2 - lng1).to_radians();

    let a = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Minimum angular separation between two compass headings, in `[0, 180]`.
/// Handles circular wraparound (e.g. 350° vs 10° is 20°, not 340°).
pub fn angle_difference(a: f64, b: f64) -> f64 {
    let diff = (a - b).abs() % 360.0;
    diff.min(360.0 - diff)
}
