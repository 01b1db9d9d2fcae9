//! Radius-to-coordinate-range derivation for affected areas.
//!
//! Linear small-angle approximation: one degree of latitude is ~111 km,
//! and the longitude scale is taken as `111 * |lat| / 90` km per degree.
//! This is not a spherical projection (a cos(latitude) factor would be) and
//! it distorts near the equator and poles, but it is acceptable for the
//! coarse city-scale areas this pipeline reports. `|lat|` is clamped to
//! `MIN_ABS_LATITUDE` so the longitude division is defined at the equator.

pub const KM_PER_DEGREE_LAT: f64 = 111.0;

/// Floor on `|latitude|` in the longitude-offset divisor.
pub const MIN_ABS_LATITUDE: f64 = 1.0;

/// Round to 6 decimal places, the precision used on the wire.
pub fn round6(v: f64) -> f64 {
    (v * 1e6).round() / 1e6
}

/// Derive `[min, max]` latitude and longitude ranges bracketing `center`
/// for an impact radius in kilometers.
pub fn ranges_for(center_lat: f64, center_lon: f64, radius_km: f64) -> ([f64; 2], [f64; 2]) {
    let lat_offset = radius_km / KM_PER_DEGREE_LAT;
    let clamped_lat = center_lat.abs().max(MIN_ABS_LATITUDE);
    let lon_offset = radius_km / (KM_PER_DEGREE_LAT * clamped_lat / 90.0);

    let lat_range = [round6(center_lat - lat_offset), round6(center_lat + lat_offset)];
    let lon_range = [round6(center_lon - lon_offset), round6(center_lon + lon_offset)];
    (lat_range, lon_range)
}
