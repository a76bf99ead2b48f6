//! Web-Mercator projection in normalized world units.
//!
//! The world spans `[0, 1]` on both axes with `(0, 0)` at the north-west
//! corner, the convention slippy-map renderers use for custom 3D layers.

use std::f64::consts::PI;

/// Mean Earth radius of the Web-Mercator sphere (meters).
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;
/// Equatorial circumference of the Web-Mercator sphere (meters).
pub const EARTH_CIRCUMFERENCE_M: f64 = 2.0 * PI * EARTH_RADIUS_M;
/// Latitude where the square Web-Mercator world is cut off.
pub const MAX_MERCATOR_LAT_DEG: f64 = 85.051_128_779_806_59;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MercatorCoord {
    pub x: f64,
    pub y: f64,
    /// Altitude in world units at this latitude.
    pub z: f64,
}

impl MercatorCoord {
    pub fn from_lng_lat(lng_deg: f64, lat_deg: f64, alt_m: f64) -> Self {
        let lat = lat_deg.clamp(-MAX_MERCATOR_LAT_DEG, MAX_MERCATOR_LAT_DEG);
        let x = (180.0 + lng_deg) / 360.0;
        let y = (180.0 - (180.0 / PI) * (PI / 4.0 + lat.to_radians() / 2.0).tan().ln()) / 360.0;
        Self {
            x,
            y,
            z: alt_m * mercator_units_per_meter(lat),
        }
    }
}

pub fn circumference_at_latitude(lat_deg: f64) -> f64 {
    EARTH_CIRCUMFERENCE_M * lat_deg.to_radians().cos()
}

/// Size of one meter in normalized world units at `lat_deg`.
pub fn mercator_units_per_meter(lat_deg: f64) -> f64 {
    let lat = lat_deg.clamp(-MAX_MERCATOR_LAT_DEG, MAX_MERCATOR_LAT_DEG);
    1.0 / circumference_at_latitude(lat)
}

#[cfg(test)]
mod tests {
    use super::{EARTH_CIRCUMFERENCE_M, MercatorCoord, mercator_units_per_meter};

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn null_island_is_world_center() {
        let c = MercatorCoord::from_lng_lat(0.0, 0.0, 0.0);
        assert_close(c.x, 0.5, 1e-12);
        assert_close(c.y, 0.5, 1e-12);
        assert_close(c.z, 0.0, 0.0);
    }

    #[test]
    fn east_and_north_grow_x_and_shrink_y() {
        let home = MercatorCoord::from_lng_lat(26.1025, 44.4268, 0.0);
        let east = MercatorCoord::from_lng_lat(26.1035, 44.4268, 0.0);
        let north = MercatorCoord::from_lng_lat(26.1025, 44.4278, 0.0);
        assert!(east.x > home.x);
        assert_close(east.y, home.y, 1e-15);
        assert!(north.y < home.y);
    }

    #[test]
    fn meters_grow_toward_the_poles() {
        assert_close(mercator_units_per_meter(0.0), 1.0 / EARTH_CIRCUMFERENCE_M, 1e-18);
        assert!(mercator_units_per_meter(60.0) > 1.9 * mercator_units_per_meter(0.0));
    }

    #[test]
    fn altitude_uses_local_scale() {
        let c = MercatorCoord::from_lng_lat(26.1025, 44.4268, 100.0);
        assert_close(c.z, 100.0 * mercator_units_per_meter(44.4268), 1e-18);
    }
}
