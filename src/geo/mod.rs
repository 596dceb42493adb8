use crate::models::driver::GeoPoint;

const EARTH_RADIUS_KM: f64 = 6_371.0;

/// Great-circle distance between two points, in kilometres.
pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let (lat_a, lat_b) = (a.lat.to_radians(), b.lat.to_radians());
    let half_dlat = ((b.lat - a.lat).to_radians() / 2.0).sin();
    let half_dlng = ((b.lng - a.lng).to_radians() / 2.0).sin();

    let h = half_dlat * half_dlat + lat_a.cos() * lat_b.cos() * half_dlng * half_dlng;
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}
