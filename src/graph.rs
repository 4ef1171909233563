// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::{earth_distance, Point};
use std::collections::btree_map::{BTreeMap, Entry};

/// Identifier of a node in a [Graph]. Synthetic grids use waypoint indices,
/// graphs built from road data use the external vertex identifiers.
pub type NodeId = i64;

/// Represents an outgoing connection from a node.
///
/// `cost` is a non-negative, finite number. It starts as a distance in kilometers,
/// but usually carries additional penalty terms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub to: NodeId,
    pub cost: f64,
}

/// Weighted graph of positioned nodes.
///
/// Graphs produced by the [builders](crate::builder) are undirected: every connection
/// is added in both directions with [Graph::connect].
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Graph(BTreeMap<NodeId, (Point, Vec<Edge>)>);

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of nodes in the graph.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns an iterator over all node ids and their positions, ordered by id.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, Point)> + '_ {
        self.0.iter().map(|(&id, &(position, _))| (id, position))
    }

    /// Returns an iterator over all node ids, in ascending order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.0.keys().copied()
    }

    /// Retrieves the position of a node with the provided id.
    pub fn position(&self, id: NodeId) -> Option<Point> {
        self.0.get(&id).map(|&(position, _)| position)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.0.contains_key(&id)
    }

    /// Creates a node, or moves an existing one. All edges are preserved.
    pub fn set_node(&mut self, id: NodeId, position: Point) {
        match self.0.entry(id) {
            Entry::Vacant(e) => {
                e.insert((position, Vec::default()));
            }
            Entry::Occupied(mut e) => {
                e.get_mut().0 = position;
            }
        }
    }

    /// Gets all outgoing [Edges](Edge) from a node with a given id.
    pub fn get_edges(&self, from: NodeId) -> &[Edge] {
        self.0
            .get(&from)
            .map(|(_, e)| e.as_slice())
            .unwrap_or_default()
    }

    /// Gets the cost of an [Edge] from one node to another.
    /// If such an edge doesn't exist, returns [f64::INFINITY].
    pub fn get_edge(&self, from: NodeId, to: NodeId) -> f64 {
        self.get_edges(from)
            .iter()
            .find_map(|edge| if edge.to == to { Some(edge.cost) } else { None })
            .unwrap_or(f64::INFINITY)
    }

    /// Creates or updates a one-way [Edge] from a node with a given id.
    /// Edges from unknown nodes are ignored.
    pub fn set_edge(&mut self, from: NodeId, edge: Edge) {
        debug_assert!(edge.cost >= 0.0 && edge.cost.is_finite());

        if let Some((_, edges)) = self.0.get_mut(&from) {
            if let Some(candidate) = edges.iter_mut().find(|e| e.to == edge.to) {
                *candidate = edge;
            } else {
                edges.push(edge);
            }
        }
    }

    /// Creates or updates a two-way connection between two nodes.
    pub fn connect(&mut self, a: NodeId, b: NodeId, cost: f64) {
        self.set_edge(a, Edge { to: b, cost });
        self.set_edge(b, Edge { to: a, cost });
    }

    /// Finds the node closest to the given position, considering
    /// only nodes not further than `max_distance` kilometers away.
    ///
    /// This function requires computing the distance to every node in the graph;
    /// use a [KDTree](crate::KDTree) for repeated lookups in large graphs.
    pub fn find_nearest_node(&self, position: Point, max_distance: f64) -> Option<NodeId> {
        self.0
            .iter()
            .map(|(&id, &(p, _))| (earth_distance(position, p), id))
            .filter(|&(dist, _)| dist <= max_distance)
            .min_by(|(a, _), (b, _)| a.total_cmp(b))
            .map(|(_, id)| id)
    }

    /// Sums edge costs along a path. Returns [f64::INFINITY]
    /// if any consecutive pair of nodes is not connected.
    pub fn path_cost(&self, path: &[NodeId]) -> f64 {
        path.windows(2)
            .map(|pair| self.get_edge(pair[0], pair[1]))
            .sum()
    }

    /// Returns the largest factor `k` such that every edge costs at least `k` times
    /// the great-circle distance between its endpoints. Returns 0 if the graph contains
    /// a zero-cost edge, and 1 for graphs without edges.
    ///
    /// Multiplying the remaining distance to the goal by this factor gives
    /// an admissible A* estimate regardless of how edge costs were shaped.
    pub fn cost_ratio_lower_bound(&self) -> f64 {
        self.0
            .values()
            .flat_map(|(from, edges)| {
                edges.iter().filter_map(move |edge| {
                    let to = self.position(edge.to)?;
                    let dist = earth_distance(*from, to);
                    if dist > 0.0 {
                        Some(edge.cost / dist)
                    } else {
                        None
                    }
                })
            })
            .fold(1.0, f64::min)
            .max(0.0)
    }

    /// Maps node ids of a path to their positions, skipping unknown nodes.
    pub fn positions(&self, path: &[NodeId]) -> Vec<Point> {
        path.iter().filter_map(|&id| self.position(id)).collect()
    }
}
