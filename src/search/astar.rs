// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::{BinaryHeap, HashMap};

use super::{check_references, reconstruct_path, QueueItem, SearchError};
use crate::graph::Edge;
use crate::heuristic::HeuristicModel;
use crate::{earth_distance, Graph, NodeId, Point};

/// Estimate of the remaining cost to the goal, guiding [find_path_astar].
#[derive(Debug, Clone, Copy, Default)]
pub enum Heuristic<'a> {
    /// No estimate - A* degrades to Dijkstra's algorithm.
    Zero,

    /// Great-circle distance to the goal, scaled by
    /// [Graph::cost_ratio_lower_bound] so that it never overestimates.
    #[default]
    Haversine,

    /// Distance to the goal shaped by the density weight and area penalty
    /// of the current node. Converges faster on synthetic graphs,
    /// but may overestimate and thus miss the cheapest path.
    Weighted(&'a HeuristicModel),
}

impl Heuristic<'_> {
    fn estimate(&self, scale: f64, from: Point, goal: Point) -> f64 {
        match self {
            Self::Zero => 0.0,
            Self::Haversine => scale * earth_distance(from, goal),
            Self::Weighted(model) => model.estimate(from, goal),
        }
    }
}

/// Uses the [A* algorithm](https://en.wikipedia.org/wiki/A*_search_algorithm)
/// to find the cheapest path between two nodes in the provided graph.
///
/// Returns [SearchError::NoPathFound] if `to` isn't reachable from `from`.
pub fn find_path_astar(
    g: &Graph,
    from: NodeId,
    to: NodeId,
    heuristic: Heuristic<'_>,
) -> Result<Vec<NodeId>, SearchError> {
    check_references(g, from, to)?;

    let scale = match heuristic {
        Heuristic::Haversine => g.cost_ratio_lower_bound(),
        _ => 1.0,
    };
    let goal = g.position(to).ok_or(SearchError::InvalidReference(to))?;
    let h = |id: NodeId| {
        g.position(id)
            .map(|p| heuristic.estimate(scale, p, goal))
            .unwrap_or(0.0)
    };

    let mut queue: BinaryHeap<QueueItem> = BinaryHeap::default();
    let mut came_from: HashMap<NodeId, NodeId> = HashMap::default();
    let mut known_costs: HashMap<NodeId, f64> = HashMap::default();

    queue.push(QueueItem {
        at: from,
        cost: 0.0,
        score: h(from),
    });
    known_costs.insert(from, 0.0);

    while let Some(item) = queue.pop() {
        if item.at == to {
            return Ok(reconstruct_path(&came_from, to));
        }

        // Contrary to the wikipedia definition, we might keep multiple items in the queue for the same node.
        if item.cost > known_costs.get(&item.at).copied().unwrap_or(f64::INFINITY) {
            continue;
        }

        for &Edge {
            to: neighbor,
            cost: edge_cost,
        } in g.get_edges(item.at)
        {
            if !g.contains(neighbor) {
                continue;
            }

            // Check if this is the cheapest way to the neighbor
            let neighbor_cost = item.cost + edge_cost;
            if neighbor_cost >= known_costs.get(&neighbor).copied().unwrap_or(f64::INFINITY) {
                continue;
            }

            came_from.insert(neighbor, item.at);
            known_costs.insert(neighbor, neighbor_cost);
            queue.push(QueueItem {
                at: neighbor,
                cost: neighbor_cost,
                score: neighbor_cost + h(neighbor),
            });
        }
    }

    Err(SearchError::NoPathFound)
}
