//! Great-circle distance and its display formatting.

use super::Coordinates;

/// Mean Earth radius used for all distance math.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance in kilometres using the haversine formula.
///
/// Inputs are trusted; callers validate coordinates first.
pub fn distance_km(a: Coordinates, b: Coordinates) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let delta_lat = (b.latitude - a.latitude).to_radians();
    let delta_lon = (b.longitude - a.longitude).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// Format a distance for display.
///
/// - under 1 km: whole metres, truncated (`"850 m"`)
/// - 1 to 10 km: one decimal (`"3.5 km"`)
/// - 10 km and beyond: whole kilometres, rounded (`"13 km"`)
pub fn format_distance(km: f64) -> String {
    if km < 1.0 {
        let meters = (km * 1000.0).floor() as i64;
        format!("{} m", meters)
    } else if km < 10.0 {
        format!("{:.1} km", km)
    } else {
        format!("{:.0} km", km)
    }
}
