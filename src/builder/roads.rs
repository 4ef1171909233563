// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::BuiltGraph;
use crate::{earth_distance, Error, Graph, KDTree, NodeId, Point, Result};

/// A stretch of road, as returned by a [RoadSource](crate::source::RoadSource).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadSegment {
    pub points: Vec<Point>,

    /// Classification of the road, customary the value of the OSM
    /// [highway tag](https://wiki.openstreetmap.org/wiki/Key:highway), e.g. "primary".
    pub road_class: String,
}

impl RoadSegment {
    pub fn new(road_class: &str, points: Vec<Point>) -> Self {
        Self {
            points,
            road_class: road_class.to_string(),
        }
    }
}

/// Cost multiplier for roads of a specific class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoadClass<'a> {
    /// Name of the road class, e.g. "motorway" or "residential".
    pub name: &'a str,

    /// Multiplier of the length, to express preference for a specific class.
    /// Lower is preferred.
    pub multiplier: f64,
}

/// Known road classes, from fastest to slowest.
pub const ROAD_CLASSES: &[RoadClass<'static>] = &[
    RoadClass {
        name: "motorway",
        multiplier: 0.5,
    },
    RoadClass {
        name: "trunk",
        multiplier: 0.6,
    },
    RoadClass {
        name: "primary",
        multiplier: 0.7,
    },
    RoadClass {
        name: "secondary",
        multiplier: 0.8,
    },
    RoadClass {
        name: "tertiary",
        multiplier: 0.9,
    },
    RoadClass {
        name: "residential",
        multiplier: 1.0,
    },
    RoadClass {
        name: "unclassified",
        multiplier: 1.1,
    },
    RoadClass {
        name: "service",
        multiplier: 1.5,
    },
];

/// Returns the cost multiplier for a road class. `_link` roads share the multiplier
/// of their base class. Unknown classes get 1.0.
pub fn road_class_multiplier(class: &str) -> f64 {
    let base = class.strip_suffix("_link").unwrap_or(class);
    ROAD_CLASSES
        .iter()
        .find(|c| c.name == base)
        .map(|c| c.multiplier)
        .unwrap_or(1.0)
}

/// Number of decimal places used to recognize the same vertex shared by multiple segments.
const VERTEX_PRECISION: f64 = 1e6;

/// Helper object storing state related to converting [RoadSegments](RoadSegment)
/// into an undirected [Graph].
///
/// Vertices of different segments are merged if their positions agree up to
/// 6 decimal places, which is how intersections are recognized.
#[derive(Debug, Default)]
pub struct RoadGraphBuilder {
    g: Graph,
    vertex_ids: HashMap<(i64, i64), NodeId>,
    skipped_segments: usize,
}

impl RoadGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds all segments to the graph.
    pub fn add_segments<'a, I: IntoIterator<Item = &'a RoadSegment>>(&mut self, segments: I) {
        segments.into_iter().for_each(|s| self.add_segment(s));
    }

    /// Adds vertices of a segment and edges between its consecutive vertices.
    pub fn add_segment(&mut self, segment: &RoadSegment) {
        let points: Vec<Point> = segment.points.iter().copied().filter(Point::is_valid).collect();
        if points.len() < 2 {
            self.skipped_segments += 1;
            return;
        }

        let multiplier = road_class_multiplier(&segment.road_class);
        let ids: Vec<NodeId> = points.iter().map(|&p| self.vertex_id(p)).collect();

        ids.windows(2).zip(points.windows(2)).for_each(|(id_pair, point_pair)| {
            if id_pair[0] != id_pair[1] {
                // Overlapping segments keep the cheapest class, regardless of their order
                let cost = (earth_distance(point_pair[0], point_pair[1]) * multiplier)
                    .min(self.g.get_edge(id_pair[0], id_pair[1]));
                self.g.connect(id_pair[0], id_pair[1], cost);
            }
        });
    }

    fn vertex_id(&mut self, p: Point) -> NodeId {
        let key = (
            (p.lat * VERTEX_PRECISION).round() as i64,
            (p.lon * VERTEX_PRECISION).round() as i64,
        );
        let next_id = self.vertex_ids.len() as NodeId + 1;
        let id = *self.vertex_ids.entry(key).or_insert(next_id);
        if id == next_id {
            self.g.set_node(id, p);
        }
        id
    }

    /// Returns the graph built so far.
    pub fn graph(&self) -> &Graph {
        &self.g
    }

    /// Snaps `origin` and `destination` to the closest vertices not further
    /// than `snap_radius` kilometers away and returns the finished graph.
    ///
    /// Fails with [Error::ExternalDataUnavailable] if the graph is empty
    /// or any endpoint has no vertex in range.
    pub fn finish(self, origin: Point, destination: Point, snap_radius: f64) -> Result<BuiltGraph> {
        if self.skipped_segments > 0 {
            log::debug!("skipped {} road segments with less than 2 valid points", self.skipped_segments);
        }

        let tree = KDTree::from_graph(&self.g)
            .ok_or_else(|| Error::ExternalDataUnavailable("no road vertices".to_string()))?;

        let snap = |p: Point, what: &str| {
            tree.find_nearest_node_within(p, snap_radius).ok_or_else(|| {
                Error::ExternalDataUnavailable(format!(
                    "no road vertex within {} km of the {}",
                    snap_radius, what
                ))
            })
        };

        let origin = snap(origin, "origin")?;
        let destination = snap(destination, "destination")?;

        Ok(BuiltGraph {
            graph: self.g,
            origin,
            destination,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! assert_almost_eq {
        ($a:expr, $b:expr) => {
            assert!(
                (($a - $b).abs() < 1e-9),
                "assertion failed: {} ≈ {}",
                $a,
                $b
            )
        };
    }

    #[test]
    fn class_multipliers() {
        assert_eq!(road_class_multiplier("motorway"), 0.5);
        assert_eq!(road_class_multiplier("motorway_link"), 0.5);
        assert_eq!(road_class_multiplier("service"), 1.5);
        assert_eq!(road_class_multiplier("residential"), 1.0);
        assert_eq!(road_class_multiplier("bridleway"), 1.0);
    }

    #[test]
    fn builds_bidirectional_edges_with_class_costs() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(0.0, 0.01);
        let c = Point::new(0.01, 0.01);

        let mut builder = RoadGraphBuilder::new();
        builder.add_segments(&[
            RoadSegment::new("motorway", vec![a, b]),
            RoadSegment::new("service", vec![b, c]),
        ]);
        let g = builder.graph();

        // b is shared between both segments
        assert_eq!(g.len(), 3);
        let (ia, ib, ic) = (1, 2, 3);
        assert_almost_eq!(g.get_edge(ia, ib), earth_distance(a, b) * 0.5);
        assert_almost_eq!(g.get_edge(ib, ic), earth_distance(b, c) * 1.5);
        assert_eq!(g.get_edge(ib, ia), g.get_edge(ia, ib));
        assert_eq!(g.get_edge(ic, ib), g.get_edge(ib, ic));
    }

    #[test]
    fn overlapping_segments_keep_cheapest_cost() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(0.01, 0.0);
        let expected = earth_distance(a, b) * 0.5;

        for classes in [["motorway", "service"], ["service", "motorway"]] {
            let mut builder = RoadGraphBuilder::new();
            builder.add_segment(&RoadSegment::new(classes[0], vec![a, b]));
            builder.add_segment(&RoadSegment::new(classes[1], vec![b, a]));

            let g = builder.graph();
            assert_eq!(g.len(), 2);
            assert_almost_eq!(g.get_edge(1, 2), expected);
            assert_almost_eq!(g.get_edge(2, 1), expected);
        }
    }

    #[test]
    fn skips_degenerate_segments() {
        let mut builder = RoadGraphBuilder::new();
        builder.add_segment(&RoadSegment::new("primary", vec![Point::new(0.0, 0.0)]));
        builder.add_segment(&RoadSegment::new(
            "primary",
            vec![Point::new(f64::NAN, 0.0), Point::new(0.0, 0.0)],
        ));
        assert!(builder.graph().is_empty());
    }

    #[test]
    fn finish_snaps_endpoints() {
        let mut builder = RoadGraphBuilder::new();
        builder.add_segment(&RoadSegment::new(
            "primary",
            vec![Point::new(0.0, 0.0), Point::new(0.0, 0.01), Point::new(0.0, 0.02)],
        ));

        let built = builder
            .finish(Point::new(0.001, 0.0), Point::new(0.001, 0.02), 0.5)
            .unwrap();
        assert_eq!(built.origin, 1);
        assert_eq!(built.destination, 3);
    }

    #[test]
    fn finish_fails_when_endpoints_are_far() {
        let mut builder = RoadGraphBuilder::new();
        builder.add_segment(&RoadSegment::new(
            "primary",
            vec![Point::new(0.0, 0.0), Point::new(0.0, 0.01)],
        ));
        assert!(matches!(
            builder.finish(Point::new(0.0, 0.0), Point::new(1.0, 1.0), 0.5),
            Err(Error::ExternalDataUnavailable(_))
        ));
        assert!(RoadGraphBuilder::new()
            .finish(Point::new(0.0, 0.0), Point::new(0.0, 0.0), 0.5)
            .is_err());
    }
}
