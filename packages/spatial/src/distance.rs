//! Great-circle distance and destination-point helpers on a spherical Earth.

use tourist_safety_trajectory_models::Coordinate;

/// Mean Earth radius in meters used by every geodesic computation.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance between two coordinates in meters.
///
/// Symmetric, exactly zero for identical inputs, and stable for both
/// near-zero and antipodal separations (the `atan2` form avoids the
/// `asin` domain problem when rounding pushes the haversine term past 1).
#[must_use]
pub fn great_circle_distance(a: &Coordinate, b: &Coordinate) -> f64 {
    let lat_a = a.latitude().to_radians();
    let lat_b = b.latitude().to_radians();
    let d_lat = lat_b - lat_a;
    let d_lon = (b.longitude() - a.longitude()).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    let h = h.clamp(0.0, 1.0);

    2.0 * EARTH_RADIUS_M * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Plain Euclidean distance in degree space.
///
/// Only meaningful for ranking nearby points (e.g. nearest risk anchor);
/// never use it as a physical distance.
#[must_use]
pub fn degree_distance(a: &Coordinate, b: &Coordinate) -> f64 {
    (a.latitude() - b.latitude()).hypot(a.longitude() - b.longitude())
}

/// Point reached by travelling `distance_m` meters from `origin` along the
/// initial bearing `bearing_rad` (radians clockwise from north).
///
/// The result is normalized (latitude clamped, longitude wrapped) so it is
/// always a valid coordinate.
#[must_use]
pub fn destination_point(origin: &Coordinate, bearing_rad: f64, distance_m: f64) -> Coordinate {
    let angular = distance_m / EARTH_RADIUS_M;
    let lat = origin.latitude().to_radians();
    let lon = origin.longitude().to_radians();

    let dest_lat = (lat.sin() * angular.cos() + lat.cos() * angular.sin() * bearing_rad.cos())
        .clamp(-1.0, 1.0)
        .asin();
    let dest_lon = lon
        + (bearing_rad.sin() * angular.sin() * lat.cos())
            .atan2(angular.cos() - lat.sin() * dest_lat.sin());

    Coordinate::wrapped(dest_lat.to_degrees(), dest_lon.to_degrees())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn c(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).unwrap()
    }

    #[test]
    fn zero_for_identical_points() {
        let p = c(12.3051, 76.6551);
        assert!(great_circle_distance(&p, &p).abs() < f64::EPSILON);
    }

    #[test]
    fn symmetric() {
        let a = c(12.3051, 76.6551);
        let b = c(12.2724, 76.6731);
        let ab = great_circle_distance(&a, &b);
        let ba = great_circle_distance(&b, &a);
        assert!((ab - ba).abs() < 1e-9, "{ab} != {ba}");
    }

    #[test]
    fn one_degree_of_latitude() {
        let d = great_circle_distance(&c(0.0, 0.0), &c(1.0, 0.0));
        let expected = EARTH_RADIUS_M * PI / 180.0;
        assert!((d - expected).abs() < 1e-6, "got {d}, expected {expected}");
    }

    #[test]
    fn antipodal_is_half_circumference() {
        let d = great_circle_distance(&c(0.0, 0.0), &c(0.0, 180.0));
        assert!((d - EARTH_RADIUS_M * PI).abs() < 1e-3, "got {d}");

        let d = great_circle_distance(&c(90.0, 0.0), &c(-90.0, 0.0));
        assert!((d - EARTH_RADIUS_M * PI).abs() < 1e-3, "got {d}");
    }

    #[test]
    fn tiny_separation_is_positive_and_accurate() {
        // 1e-7 degrees of latitude ~ 1.1 cm
        let d = great_circle_distance(&c(45.0, 10.0), &c(45.000_000_1, 10.0));
        let expected = EARTH_RADIUS_M * (1e-7_f64).to_radians();
        assert!(d > 0.0);
        assert!((d - expected).abs() < 1e-6, "got {d}, expected {expected}");
    }

    #[test]
    fn triangle_inequality() {
        let points = [
            c(12.3051, 76.6551),
            c(12.2724, 76.6731),
            c(12.4244, 76.5743),
            c(-33.8688, 151.2093),
            c(51.5074, -0.1278),
        ];
        for a in &points {
            for b in &points {
                for m in &points {
                    let direct = great_circle_distance(a, b);
                    let via = great_circle_distance(a, m) + great_circle_distance(m, b);
                    assert!(direct <= via + 1e-6, "{a:?} -> {b:?} via {m:?}");
                }
            }
        }
    }

    #[test]
    fn destination_point_round_trips_distance() {
        let origin = c(12.3051, 76.6551);
        for bearing in [0.0, FRAC_PI_2, PI, 1.234, 5.0] {
            let dest = destination_point(&origin, bearing, 1_500.0);
            let d = great_circle_distance(&origin, &dest);
            assert!((d - 1_500.0).abs() < 1e-4, "bearing {bearing}: {d}");
        }
    }

    #[test]
    fn destination_point_north_increases_latitude() {
        let origin = c(10.0, 20.0);
        let dest = destination_point(&origin, 0.0, 10_000.0);
        assert!(dest.latitude() > origin.latitude());
        assert!((dest.longitude() - origin.longitude()).abs() < 1e-9);
    }

    #[test]
    fn destination_point_wraps_antimeridian() {
        let origin = c(0.0, 179.999);
        let dest = destination_point(&origin, FRAC_PI_2, 1_000.0);
        assert!(dest.longitude() < 0.0, "expected wrap, got {dest:?}");
    }

    #[test]
    fn degree_distance_is_euclidean() {
        let d = degree_distance(&c(0.0, 0.0), &c(3.0, 4.0));
        assert!((d - 5.0).abs() < f64::EPSILON);
    }
}
