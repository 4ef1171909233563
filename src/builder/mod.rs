// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Conversion of route endpoints into a weighted [Graph] of candidate waypoints.
//!
//! Two construction paths exist:
//! - [synthetic_grid] - waypoints along the straight line between the endpoints,
//!   slightly perturbed, with edge costs shaped by the [HeuristicModel](crate::heuristic::HeuristicModel);
//! - [RoadGraphBuilder] - vertices and edges of road segments supplied by an external
//!   [RoadSource](crate::source::RoadSource), with costs scaled by the [road class](ROAD_CLASSES).

mod roads;
mod synthetic;

pub use roads::{road_class_multiplier, RoadClass, RoadGraphBuilder, RoadSegment, ROAD_CLASSES};
pub use synthetic::{synthetic_grid, waypoint_count, GridConfig};

use crate::{Graph, NodeId};

/// A [Graph] together with the nodes representing the route endpoints.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltGraph {
    pub graph: Graph,
    pub origin: NodeId,
    pub destination: NodeId,
}
