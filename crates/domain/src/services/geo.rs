//! Geographic primitives: great-circle distance and polygon containment.
//!
//! Both functions are pure and perform no range validation; callers are
//! responsible for rejecting out-of-range coordinates at the API boundary.

use crate::models::geofence::GeoPoint;

/// Mean Earth radius in meters (spherical approximation).
const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Great-circle distance between two points in meters, via the haversine
/// formula on a spherical Earth. Inputs are decimal degrees.
pub fn haversine_distance_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (lat1, lon1, lat2, lon2) = (
        lat1.to_radians(),
        lon1.to_radians(),
        lat2.to_radians(),
        lon2.to_radians(),
    );

    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    c * EARTH_RADIUS_METERS
}

/// Even-odd ray-casting containment test over an implicitly closed ring
/// (the edge from the last vertex back to the first is included).
///
/// Rings with fewer than 3 vertices return `false`; such geofences are
/// rejected at creation time, so this is a backstop, not an error path.
/// Points exactly on an edge or vertex land on whichever side the ray
/// count puts them; that is accepted nondeterminism.
pub fn point_in_polygon(lat: f64, lon: f64, ring: &[GeoPoint]) -> bool {
    if ring.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = ring.len() - 1;

    for i in 0..ring.len() {
        let (xi, yi) = (ring[i].longitude, ring[i].latitude);
        let (xj, yj) = (ring[j].longitude, ring[j].latitude);

        if ((yi > lat) != (yj > lat)) && (lon < (xj - xi) * (lat - yi) / (yj - yi) + xi) {
            inside = !inside;
        }
        j = i;
    }

    inside
}
