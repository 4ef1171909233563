// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::{earth_distance, Graph, NodeId, Point};

/// KDTree implements the [k-d tree data structure](https://en.wikipedia.org/wiki/K-d_tree),
/// used to snap route endpoints onto the closest vertex of a road [Graph].
/// Road graphs fetched for long routes easily reach thousands of vertices, and
/// [Graph::find_nearest_node] walks all of them.
///
/// This implementation assumes euclidean geometry, even though the distance function
/// used is [earth_distance]. This results in undefined behavior when points
/// are close to the ante meridian (180°/-180° longitude) or poles (90°/-90° latitude).
#[derive(Debug, Clone)]
pub struct KDTree {
    pivot: (NodeId, Point),
    left: Option<Box<KDTree>>,
    right: Option<Box<KDTree>>,
}

impl KDTree {
    /// Finds the closest node to the given position,
    /// returning its id and the distance to it in kilometers.
    pub fn find_nearest_node(&self, position: Point) -> (NodeId, f64) {
        self.find_nearest_node_impl(position, false)
    }

    /// Finds the closest node to the given position, provided it's not further
    /// than `max_distance` kilometers away.
    pub fn find_nearest_node_within(&self, position: Point, max_distance: f64) -> Option<NodeId> {
        let (id, dist) = self.find_nearest_node(position);
        if dist <= max_distance {
            Some(id)
        } else {
            None
        }
    }

    fn find_nearest_node_impl(&self, position: Point, lon_divides: bool) -> (NodeId, f64) {
        // Start by assuming that pivot is the closest
        let mut best = self.pivot.0;
        let mut best_dist = earth_distance(position, self.pivot.1);

        let first_left = if lon_divides {
            position.lon < self.pivot.1.lon
        } else {
            position.lat < self.pivot.1.lat
        };
        let (first, second) = if first_left {
            (&self.left, &self.right)
        } else {
            (&self.right, &self.left)
        };

        if let Some(ref branch) = first {
            let (alt, alt_dist) = branch.find_nearest_node_impl(position, !lon_divides);
            if alt_dist < best_dist {
                best = alt;
                best_dist = alt_dist;
            }
        }

        if let Some(ref branch) = second {
            // A closer node is possible in the second branch if and only if
            // the splitting axis is closer than the current best candidate.
            let axis = if lon_divides {
                Point::new(position.lat, self.pivot.1.lon)
            } else {
                Point::new(self.pivot.1.lat, position.lon)
            };

            if earth_distance(position, axis) < best_dist {
                let (alt, alt_dist) = branch.find_nearest_node_impl(position, !lon_divides);
                if alt_dist < best_dist {
                    best = alt;
                    best_dist = alt_dist;
                }
            }
        }

        return (best, best_dist);
    }

    /// Builds a k-d tree over all nodes of a [Graph].
    /// Returns `None` for empty graphs.
    pub fn from_graph(g: &Graph) -> Option<Self> {
        let mut nodes = g.iter().collect::<Vec<_>>();
        Self::build(nodes.as_mut_slice())
    }

    /// Builds a k-d tree from a mutable slice of positioned nodes. Nodes will be reordered
    /// in the slice to facilitate building the tree.
    pub fn build(nodes: &mut [(NodeId, Point)]) -> Option<Self> {
        Self::build_impl(nodes, false)
    }

    fn build_impl(nodes: &mut [(NodeId, Point)], lon_divides: bool) -> Option<Self> {
        match nodes.len() {
            0 => None,
            1 => Some(Self {
                pivot: nodes[0],
                left: None,
                right: None,
            }),
            _ => {
                if lon_divides {
                    nodes.sort_by(|a, b| a.1.lon.total_cmp(&b.1.lon));
                } else {
                    nodes.sort_by(|a, b| a.1.lat.total_cmp(&b.1.lat));
                }
                let median = nodes.len() / 2;
                let pivot = nodes[median];
                let (left, right_and_pivot) = nodes.split_at_mut(median);
                let right = &mut right_and_pivot[1..];
                Some(Self {
                    pivot,
                    left: Self::build_impl(left, !lon_divides).map(Box::new),
                    right: Self::build_impl(right, !lon_divides).map(Box::new),
                })
            }
        }
    }
}
