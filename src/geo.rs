//! Great-circle geometry for drift computation.

use crate::models::TrackPoint;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance in meters between two coordinate pairs, on a sphere
/// of radius 6,371 km. Inputs are degrees.
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}

/// Total drift along a track in meters: haversine distances summed over
/// consecutive point pairs in the order given. Pairs with a non-finite
/// endpoint are skipped; fewer than two points is zero drift.
pub fn total_track_distance(points: &[TrackPoint]) -> f64 {
    let mut total = 0.0;
    for pair in points.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        if a.lat.is_finite() && a.lon.is_finite() && b.lat.is_finite() && b.lon.is_finite() {
            total += haversine_distance(a.lat, a.lon, b.lat, b.lon);
        }
    }
    total
}
