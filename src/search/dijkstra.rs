// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::{BinaryHeap, HashMap};

use super::{check_references, reconstruct_path, QueueItem, SearchError};
use crate::graph::Edge;
use crate::{Graph, NodeId};

/// Uses [Dijkstra's algorithm](https://en.wikipedia.org/wiki/Dijkstra%27s_algorithm)
/// to find the cheapest path between two nodes in the provided graph.
///
/// Returns [SearchError::NoPathFound] if `to` isn't reachable from `from`.
pub fn find_path_dijkstra(g: &Graph, from: NodeId, to: NodeId) -> Result<Vec<NodeId>, SearchError> {
    check_references(g, from, to)?;

    let mut queue: BinaryHeap<QueueItem> = BinaryHeap::default();
    let mut came_from: HashMap<NodeId, NodeId> = HashMap::default();
    let mut known_costs: HashMap<NodeId, f64> = HashMap::default();

    queue.push(QueueItem {
        at: from,
        cost: 0.0,
        score: 0.0,
    });
    known_costs.insert(from, 0.0);

    while let Some(item) = queue.pop() {
        if item.at == to {
            return Ok(reconstruct_path(&came_from, to));
        }

        // Stale queue entry - a cheaper way to this node was already expanded
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

            let neighbor_cost = item.cost + edge_cost;
            if neighbor_cost >= known_costs.get(&neighbor).copied().unwrap_or(f64::INFINITY) {
                continue;
            }

            came_from.insert(neighbor, item.at);
            known_costs.insert(neighbor, neighbor_cost);
            queue.push(QueueItem {
                at: neighbor,
                cost: neighbor_cost,
                score: neighbor_cost,
            });
        }
    }

    Err(SearchError::NoPathFound)
}

#[cfg(test)]
mod tests {
    use super::super::test_graphs;
    use super::*;

    #[test]
    fn finds_cheapest_path() {
        let g = test_graphs::simple();
        assert_eq!(find_path_dijkstra(&g, 1, 6), Ok(vec![1, 2, 3, 5, 6]));
        assert_eq!(find_path_dijkstra(&g, 6, 4), Ok(vec![6, 5, 4]));
    }

    #[test]
    fn path_to_self() {
        let g = test_graphs::simple();
        assert_eq!(find_path_dijkstra(&g, 3, 3), Ok(vec![3]));
    }

    #[test]
    fn unreachable() {
        let g = test_graphs::simple();
        assert_eq!(find_path_dijkstra(&g, 1, 7), Err(SearchError::NoPathFound));
    }

    #[test]
    fn invalid_reference() {
        let g = test_graphs::simple();
        assert_eq!(find_path_dijkstra(&g, 1, 42), Err(SearchError::InvalidReference(42)));
        assert_eq!(find_path_dijkstra(&g, 42, 1), Err(SearchError::InvalidReference(42)));
    }
}
