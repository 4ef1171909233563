// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Post-processing of found routes, making them look less like a chain of straight lines.

use serde::{Deserialize, Serialize};

use crate::distance::{longitude_delta, wrap_longitude};
use crate::{earth_distance, lerp, Point};

/// Controls which steps [smooth_full] applies, and their parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothOptions {
    pub simplify: bool,
    pub smooth_curves: bool,
    pub spline: bool,

    /// Points closer than this (km) to the previously retained point are dropped by [simplify].
    pub min_distance: f64,

    /// Turns sharper than this (degrees) get an additional point from [smooth_curves].
    pub max_angle: f64,

    /// Number of points [catmull_rom_spline] inserts between every pair of consecutive points.
    pub points_per_segment: usize,
}

impl Default for SmoothOptions {
    fn default() -> Self {
        Self {
            simplify: true,
            smooth_curves: true,
            spline: true,
            min_distance: 0.05,
            max_angle: 30.0,
            points_per_segment: 2,
        }
    }
}

/// Drops points closer than `min_distance` kilometers to the last retained point.
/// The first and last points are always retained.
pub fn simplify(points: &[Point], min_distance: f64) -> Vec<Point> {
    if points.len() <= 2 {
        return points.to_vec();
    }

    let mut simplified = vec![points[0]];
    for &p in &points[1..points.len() - 1] {
        if let Some(&last) = simplified.last() {
            if earth_distance(last, p) >= min_distance {
                simplified.push(p);
            }
        }
    }
    simplified.push(points[points.len() - 1]);

    return simplified;
}

/// Signed turn angle at `b` when traveling `a` → `b` → `c`, in degrees within `[-180, 180]`.
fn turn_angle(a: Point, b: Point, c: Point) -> f64 {
    let incoming = longitude_delta(a.lon, b.lon).atan2(b.lat - a.lat).to_degrees();
    let outgoing = longitude_delta(b.lon, c.lon).atan2(c.lat - b.lat).to_degrees();

    let mut angle = outgoing - incoming;
    if angle > 180.0 {
        angle -= 360.0;
    } else if angle < -180.0 {
        angle += 360.0;
    }
    angle
}

/// Softens every turn sharper than `max_angle` degrees by inserting
/// the midpoint of the outgoing leg right after the corner.
pub fn smooth_curves(points: &[Point], max_angle: f64) -> Vec<Point> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let mut smoothed = Vec::with_capacity(points.len() * 2);
    smoothed.push(points[0]);

    for window in points.windows(3) {
        let (a, b, c) = (window[0], window[1], window[2]);
        smoothed.push(b);
        if turn_angle(a, b, c).abs() > max_angle {
            smoothed.push(lerp(b, c, 0.5));
        }
    }

    smoothed.push(points[points.len() - 1]);
    return smoothed;
}

/// Evaluates the uniform Catmull-Rom curve through `p1` and `p2` at `t ∈ [0, 1]`.
fn catmull_rom(p0: Point, p1: Point, p2: Point, p3: Point, t: f64) -> Point {
    let t2 = t * t;
    let t3 = t2 * t;

    let axis = |v0: f64, v1: f64, v2: f64, v3: f64| {
        0.5 * ((2.0 * v1)
            + (-v0 + v2) * t
            + (2.0 * v0 - 5.0 * v1 + 4.0 * v2 - v3) * t2
            + (-v0 + 3.0 * v1 - 3.0 * v2 + v3) * t3)
    };

    // Unwrap longitudes around p1 for curves crossing the antimeridian
    let lon1 = p1.lon;
    let lon0 = lon1 + longitude_delta(lon1, p0.lon);
    let lon2 = lon1 + longitude_delta(lon1, p2.lon);
    let lon3 = lon2 + longitude_delta(p2.lon, p3.lon);

    Point {
        lat: axis(p0.lat, p1.lat, p2.lat, p3.lat),
        lon: wrap_longitude(axis(lon0, lon1, lon2, lon3)),
    }
}

/// Interpolates a [Catmull-Rom spline](https://en.wikipedia.org/wiki/Centripetal_Catmull%E2%80%93Rom_spline)
/// through all points, inserting `points_per_segment` points between every consecutive pair.
///
/// The control points before the first and after the last point are clamped
/// to the endpoints themselves. All input points are retained.
pub fn catmull_rom_spline(points: &[Point], points_per_segment: usize) -> Vec<Point> {
    if points.len() < 2 || points_per_segment == 0 {
        return points.to_vec();
    }

    let last = points.len() - 1;
    let mut result = Vec::with_capacity(points.len() + last * points_per_segment);

    for i in 0..last {
        let p0 = points[i.saturating_sub(1)];
        let p1 = points[i];
        let p2 = points[i + 1];
        let p3 = points[(i + 2).min(last)];

        result.push(p1);
        for j in 1..=points_per_segment {
            let t = j as f64 / (points_per_segment + 1) as f64;
            result.push(catmull_rom(p0, p1, p2, p3, t));
        }
    }
    result.push(points[last]);

    return result;
}

/// Applies [simplify], [smooth_curves] and [catmull_rom_spline] in order,
/// skipping the steps disabled in `options`. Routes with fewer than 2 points
/// are returned unchanged.
pub fn smooth_full(points: &[Point], options: &SmoothOptions) -> Vec<Point> {
    if points.len() < 2 {
        return points.to_vec();
    }

    let mut route = points.to_vec();
    if options.simplify {
        route = simplify(&route, options.min_distance);
    }
    if options.smooth_curves {
        route = smooth_curves(&route, options.max_angle);
    }
    if options.spline {
        route = catmull_rom_spline(&route, options.points_per_segment);
    }
    route
}
