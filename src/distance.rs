// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::Point;

/// Mean radius of Earth, in kilometers.
const EARTH_RADIUS: f64 = 6371.0;

/// Mean diameter of Earth, in kilometers.
const EARTH_DIAMETER: f64 = EARTH_RADIUS + EARTH_RADIUS;

/// Calculates the great-circle distance between two lat-lon positions
/// on Earth using the [haversine formula](https://en.wikipedia.org/wiki/Haversine_formula).
/// Returns the result in kilometers.
pub fn earth_distance(a: Point, b: Point) -> f64 {
    let lat1 = a.lat.to_radians();
    let lon1 = a.lon.to_radians();
    let lat2 = b.lat.to_radians();
    let lon2 = b.lon.to_radians();

    let sin_dlat_half = ((lat2 - lat1) * 0.5).sin();
    let sin_dlon_half = ((lon2 - lon1) * 0.5).sin();

    let h = sin_dlat_half * sin_dlat_half + lat1.cos() * lat2.cos() * sin_dlon_half * sin_dlon_half;

    EARTH_DIAMETER * h.sqrt().min(1.0).asin()
}

/// Returns the direction of travel from `a` to `b`, in degrees within `[0, 360)`.
///
/// The bearing is computed on the flat lat-lon plane: 0° points north (increasing latitude)
/// and 90° points east (increasing longitude). This is accurate enough for detecting
/// turns between consecutive waypoints, which are never more than a few kilometers apart.
pub fn bearing(a: Point, b: Point) -> f64 {
    let angle = longitude_delta(a.lon, b.lon).atan2(b.lat - a.lat).to_degrees();
    if angle < 0.0 {
        angle + 360.0
    } else if angle >= 360.0 {
        angle - 360.0
    } else {
        angle
    }
}

/// Returns the smallest angle between two bearings, in degrees within `[0, 180]`.
pub fn bearing_difference(a: f64, b: f64) -> f64 {
    let diff = (a - b).abs() % 360.0;
    diff.min(360.0 - diff)
}

/// Sums the great-circle distances between consecutive points, in kilometers.
pub fn route_length(points: &[Point]) -> f64 {
    points
        .windows(2)
        .map(|pair| earth_distance(pair[0], pair[1]))
        .sum()
}

/// Returns the signed change of longitude when going from `from` to `to` the short way,
/// in degrees within `[-180, 180]`.
pub(crate) fn longitude_delta(from: f64, to: f64) -> f64 {
    wrap_longitude(to - from)
}

/// Brings a longitude back into `[-180, 180]`.
pub(crate) fn wrap_longitude(lon: f64) -> f64 {
    if (-180.0..=180.0).contains(&lon) {
        lon
    } else {
        (lon + 180.0).rem_euclid(360.0) - 180.0
    }
}

/// Linearly interpolates between two positions on the lat-lon plane.
/// Longitude is interpolated the short way, across the antimeridian if needed.
pub fn lerp(a: Point, b: Point, t: f64) -> Point {
    Point {
        lat: a.lat + (b.lat - a.lat) * t,
        lon: wrap_longitude(a.lon + longitude_delta(a.lon, b.lon) * t),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! assert_almost_eq {
        ($a:expr, $b:expr, $eps:expr) => {
            assert!(
                (($a - $b).abs() < $eps),
                "assertion failed: {} ≈ {}",
                $a,
                $b
            )
        };
    }

    #[test]
    fn distance_to_self_is_zero() {
        let p = Point::new(-15.7942, -47.8822);
        assert_eq!(earth_distance(p, p), 0.0);
    }

    #[test]
    fn distance_known_value() {
        // One degree of latitude along a meridian
        let d = earth_distance(Point::new(0.0, 0.0), Point::new(1.0, 0.0));
        assert_almost_eq!(d, 111.195, 0.01);
    }

    #[test]
    fn distance_is_symmetric() {
        let a = Point::new(-15.90, -48.07);
        let b = Point::new(-15.80, -47.90);
        assert_almost_eq!(earth_distance(a, b), earth_distance(b, a), 1e-9);
    }

    #[test]
    fn bearing_cardinal_directions() {
        let o = Point::new(0.0, 0.0);
        assert_almost_eq!(bearing(o, Point::new(1.0, 0.0)), 0.0, 1e-9);
        assert_almost_eq!(bearing(o, Point::new(0.0, 1.0)), 90.0, 1e-9);
        assert_almost_eq!(bearing(o, Point::new(-1.0, 0.0)), 180.0, 1e-9);
        assert_almost_eq!(bearing(o, Point::new(0.0, -1.0)), 270.0, 1e-9);
    }

    #[test]
    fn bearing_across_antimeridian() {
        assert_almost_eq!(bearing(Point::new(0.0, 179.0), Point::new(0.0, -179.0)), 90.0, 1e-9);
        assert_almost_eq!(bearing(Point::new(0.0, -179.0), Point::new(0.0, 179.0)), 270.0, 1e-9);
    }

    #[test]
    fn lerp_takes_the_short_way() {
        let a = Point::new(10.0, 170.0);
        let b = Point::new(-10.0, -170.0);

        let mid = lerp(a, b, 0.5);
        assert_almost_eq!(mid.lat, 0.0, 1e-9);
        assert_almost_eq!(mid.lon.abs(), 180.0, 1e-9);

        let quarter = lerp(a, b, 0.75);
        assert_almost_eq!(quarter.lon, -175.0, 1e-9);
        assert!(quarter.is_valid());

        assert_eq!(lerp(a, b, 1.0), b);
        let plain = lerp(Point::new(0.0, -48.0), Point::new(0.0, -47.0), 0.5);
        assert_almost_eq!(plain.lon, -47.5, 1e-9);
    }

    #[test]
    fn longitude_wrapping() {
        assert_almost_eq!(longitude_delta(170.0, -170.0), 20.0, 1e-9);
        assert_almost_eq!(longitude_delta(-170.0, 170.0), -20.0, 1e-9);
        assert_almost_eq!(longitude_delta(-48.0, -47.0), 1.0, 1e-9);
        assert_almost_eq!(wrap_longitude(190.0), -170.0, 1e-9);
        assert_almost_eq!(wrap_longitude(-185.0), 175.0, 1e-9);
        assert_eq!(wrap_longitude(180.0), 180.0);
    }

    #[test]
    fn bearing_difference_wraps_around() {
        assert_almost_eq!(bearing_difference(350.0, 10.0), 20.0, 1e-9);
        assert_almost_eq!(bearing_difference(90.0, 270.0), 180.0, 1e-9);
        assert_almost_eq!(bearing_difference(45.0, 45.0), 0.0, 1e-9);
    }

    #[test]
    fn route_length_of_short_routes() {
        assert_eq!(route_length(&[]), 0.0);
        assert_eq!(route_length(&[Point::new(1.0, 1.0)]), 0.0);

        let a = Point::new(0.0, 0.0);
        let b = Point::new(0.5, 0.0);
        let c = Point::new(1.0, 0.0);
        assert_almost_eq!(route_length(&[a, b, c]), earth_distance(a, c), 1e-6);
    }
}
