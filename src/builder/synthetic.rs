// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::BuiltGraph;
use crate::heuristic::HeuristicModel;
use crate::distance::{longitude_delta, wrap_longitude};
use crate::{earth_distance, lerp, Graph, Point};

/// Controls the shape of [synthetic grids](synthetic_grid).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    /// Number of waypoints for routes shorter than 10 km.
    pub base_waypoints: usize,

    /// Additional waypoints for every full 10 km of distance.
    pub waypoints_per_10km: usize,

    /// Upper limit on the number of waypoints.
    pub max_waypoints: usize,

    /// Maximum lateral offset of a waypoint from the straight line, in degrees.
    pub lateral_spread: f64,

    /// Number of following waypoints every waypoint is connected to.
    pub successors: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            base_waypoints: 8,
            waypoints_per_10km: 2,
            max_waypoints: 20,
            lateral_spread: 0.003,
            successors: 4,
        }
    }
}

/// Returns how many waypoints a grid spanning `distance` kilometers should have.
pub fn waypoint_count(config: &GridConfig, distance: f64) -> usize {
    let tens = (distance.max(0.0) / 10.0).floor() as usize;
    (config.base_waypoints + tens * config.waypoints_per_10km).min(config.max_waypoints)
}

/// Generates a synthetic graph between two positions.
///
/// Waypoints are placed evenly along the straight line from `origin` to `destination`
/// and shifted perpendicularly by a random offset (up to half of
/// [GridConfig::lateral_spread] either way), so that the result isn't a perfectly straight line.
/// Node `0` is the origin and node `n` the destination, with the waypoints `1..n` in between.
///
/// Every node is connected with its [GridConfig::successors] following nodes,
/// with costs given by [HeuristicModel::edge_cost].
pub fn synthetic_grid<R: Rng + ?Sized>(
    origin: Point,
    destination: Point,
    config: &GridConfig,
    heuristics: &HeuristicModel,
    rng: &mut R,
) -> BuiltGraph {
    let n = waypoint_count(config, earth_distance(origin, destination)).max(1);

    let direction = longitude_delta(origin.lon, destination.lon).atan2(destination.lat - origin.lat);
    let perpendicular = direction + std::f64::consts::FRAC_PI_2;
    let (perp_lon, perp_lat) = perpendicular.sin_cos();

    let mut points = Vec::with_capacity(n + 1);
    points.push(origin);
    for i in 1..n {
        let on_line = lerp(origin, destination, i as f64 / n as f64);
        let offset = config.lateral_spread * (rng.gen::<f64>() - 0.5);
        points.push(Point::new(
            on_line.lat + perp_lat * offset,
            wrap_longitude(on_line.lon + perp_lon * offset),
        ));
    }
    points.push(destination);

    let mut g = Graph::new();
    for (i, &p) in points.iter().enumerate() {
        g.set_node(i as i64, p);
    }

    for i in 0..points.len() {
        let prev = if i > 0 { Some(points[i - 1]) } else { None };
        let last = (i + config.successors).min(points.len() - 1);
        for j in (i + 1)..=last {
            let cost = heuristics.edge_cost(prev, points[i], points[j]);
            g.connect(i as i64, j as i64, cost);
        }
    }

    BuiltGraph {
        graph: g,
        origin: 0,
        destination: (points.len() - 1) as i64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heuristic::{HeuristicConfig, SharedAdjustments};
    use rand::{rngs::StdRng, SeedableRng};

    fn heuristics() -> HeuristicModel {
        HeuristicModel::new(HeuristicConfig::default(), SharedAdjustments::default())
    }

    #[test]
    fn waypoint_count_scales_with_distance() {
        let c = GridConfig::default();
        assert_eq!(waypoint_count(&c, 0.0), 8);
        assert_eq!(waypoint_count(&c, 9.9), 8);
        assert_eq!(waypoint_count(&c, 10.0), 10);
        assert_eq!(waypoint_count(&c, 25.0), 12);
        assert_eq!(waypoint_count(&c, 500.0), 20);
    }

    #[test]
    fn grid_has_endpoints_and_waypoints() {
        let origin = Point::new(-15.90, -48.07);
        let destination = Point::new(-15.80, -47.90);
        let mut rng = StdRng::seed_from_u64(7);

        let built = synthetic_grid(origin, destination, &GridConfig::default(), &heuristics(), &mut rng);

        // ~20 km: 12 waypoint intervals, 13 nodes
        assert_eq!(built.graph.len(), 13);
        assert_eq!(built.origin, 0);
        assert_eq!(built.destination, 12);
        assert_eq!(built.graph.position(0), Some(origin));
        assert_eq!(built.graph.position(12), Some(destination));
    }

    #[test]
    fn grid_waypoints_stay_near_the_line() {
        let origin = Point::new(-15.90, -48.07);
        let destination = Point::new(-15.80, -47.90);
        let config = GridConfig::default();
        let mut rng = StdRng::seed_from_u64(3);

        let built = synthetic_grid(origin, destination, &config, &heuristics(), &mut rng);
        let n = built.graph.len() - 1;

        for (id, p) in built.graph.iter() {
            let on_line = lerp(origin, destination, id as f64 / n as f64);
            let offset = ((p.lat - on_line.lat).powi(2) + (p.lon - on_line.lon).powi(2)).sqrt();
            assert!(offset <= config.lateral_spread / 2.0 + 1e-12);
        }
    }

    #[test]
    fn grid_crosses_the_antimeridian() {
        let origin = Point::new(10.0, 179.9);
        let destination = Point::new(10.0, -179.9);
        let mut rng = StdRng::seed_from_u64(5);

        let built = synthetic_grid(origin, destination, &GridConfig::default(), &heuristics(), &mut rng);
        for (_, p) in built.graph.iter() {
            assert!(p.is_valid());
            assert!(p.lon.abs() >= 179.89, "waypoint {:?} left the antimeridian", p);
        }
    }

    #[test]
    fn grid_connects_successors_both_ways() {
        let mut rng = StdRng::seed_from_u64(11);
        let built = synthetic_grid(
            Point::new(0.0, 0.0),
            Point::new(0.0, 0.05),
            &GridConfig::default(),
            &heuristics(),
            &mut rng,
        );
        let g = &built.graph;

        // 8 intervals, 9 nodes; node 0 connects with 1..=4
        assert_eq!(g.len(), 9);
        assert_eq!(g.get_edges(0).len(), 4);
        assert!(g.get_edge(0, 4).is_finite());
        assert!(g.get_edge(0, 5).is_infinite());
        assert_eq!(g.get_edge(2, 5), g.get_edge(5, 2));

        for (id, _) in g.iter() {
            for e in g.get_edges(id) {
                assert!(e.cost >= 0.0 && e.cost.is_finite());
            }
        }
    }

    #[test]
    fn grid_is_deterministic_for_a_seed() {
        let build = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            synthetic_grid(
                Point::new(-15.9, -48.0),
                Point::new(-15.8, -47.9),
                &GridConfig::default(),
                &heuristics(),
                &mut rng,
            )
        };
        assert_eq!(build(5), build(5));
    }
}
