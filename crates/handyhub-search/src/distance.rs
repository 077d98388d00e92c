//! Great-circle distance.

use handyhub_core::Coordinate;

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance between two coordinates in kilometres.
///
/// Symmetric, zero for identical points, never negative.
#[must_use]
pub fn distance_km(a: Coordinate, b: Coordinate) -> f64 {
    let lat_a = a.lat().to_radians();
    let lat_b = b.lat().to_radians();
    let half_dlat = (b.lat() - a.lat()).to_radians() / 2.0;
    let half_dlng = (b.lng() - a.lng()).to_radians() / 2.0;

    let h = half_dlat.sin().powi(2) + lat_a.cos() * lat_b.cos() * half_dlng.sin().powi(2);
    // Rounding can push h a hair past 1 for antipodal points.
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(lat: f64, lng: f64) -> Coordinate {
        Coordinate::new(lat, lng).expect("valid coordinate")
    }

    #[test]
    fn identical_points_are_zero() {
        let p = c(-29.8587, 31.0218);
        assert!(distance_km(p, p) < 1e-6);
    }

    #[test]
    fn distance_is_symmetric() {
        let pairs = [
            (c(-29.8587, 31.0218), c(-29.97, 30.88)),
            (c(51.5074, -0.1278), c(40.7128, -74.006)),
            (c(0.0, 179.9), c(0.0, -179.9)),
            (c(89.9, 0.0), c(-89.9, 180.0)),
        ];
        for (a, b) in pairs {
            let ab = distance_km(a, b);
            let ba = distance_km(b, a);
            assert!((ab - ba).abs() <= 1e-9 * ab.max(1.0), "{ab} != {ba}");
        }
    }

    #[test]
    fn durban_to_pinetown_area() {
        let d = distance_km(c(-29.8587, 31.0218), c(-29.9700, 30.8800));
        assert!((d - 18.44).abs() < 0.5, "got {d}");
    }

    #[test]
    fn one_degree_of_latitude() {
        let d = distance_km(c(0.0, 0.0), c(1.0, 0.0));
        assert!((d - 111.195).abs() < 0.01, "got {d}");
    }

    #[test]
    fn antimeridian_is_short() {
        let d = distance_km(c(0.0, 179.9), c(0.0, -179.9));
        assert!(d < 25.0, "got {d}");
    }

    #[test]
    fn antipodal_is_half_circumference() {
        let d = distance_km(c(0.0, 0.0), c(0.0, 180.0));
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1e-3, "got {d}");
    }
}
