use super::Ecef;

/// WGS84 semi-major axis (meters).
pub const WGS84_A: f64 = 6_378_137.0;
/// WGS84 flattening.
pub const WGS84_F: f64 = 1.0 / 298.257_223_563;
/// WGS84 first eccentricity squared.
pub const WGS84_E2: f64 = WGS84_F * (2.0 - WGS84_F);

/// A map location in radians, altitude in meters above the ellipsoid.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Geodetic {
    pub lat_rad: f64,
    pub lon_rad: f64,
    pub alt_m: f64,
}

impl Geodetic {
    /// Longitude first, as map coordinates are written.
    pub fn from_degrees(lon_deg: f64, lat_deg: f64, alt_m: f64) -> Self {
        Self {
            lat_rad: lat_deg.to_radians(),
            lon_rad: lon_deg.to_radians(),
            alt_m,
        }
    }
}

/// Places a map location in the ECEF frame used for model anchors.
pub fn geodetic_to_ecef(geo: Geodetic) -> Ecef {
    let (sin_lat, cos_lat) = geo.lat_rad.sin_cos();
    let (sin_lon, cos_lon) = geo.lon_rad.sin_cos();

    // prime vertical radius of curvature
    let n = WGS84_A / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();
    let r = (n + geo.alt_m) * cos_lat;

    Ecef::new(
        r * cos_lon,
        r * sin_lon,
        (n * (1.0 - WGS84_E2) + geo.alt_m) * sin_lat,
    )
}
