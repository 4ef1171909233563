// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::{BinaryHeap, HashMap};

use super::{check_references, reconstruct_path, QueueItem, SearchError};
use crate::graph::Edge;
use crate::{Graph, NodeId};

/// State of a single search direction.
struct Frontier<'a> {
    edges: Box<dyn Fn(NodeId) -> &'a [Edge] + 'a>,
    queue: BinaryHeap<QueueItem>,
    came_from: HashMap<NodeId, NodeId>,
    known_costs: HashMap<NodeId, f64>,
}

impl<'a> Frontier<'a> {
    fn new(start: NodeId, edges: Box<dyn Fn(NodeId) -> &'a [Edge] + 'a>) -> Self {
        let mut f = Self {
            edges,
            queue: BinaryHeap::default(),
            came_from: HashMap::default(),
            known_costs: HashMap::default(),
        };
        f.queue.push(QueueItem {
            at: start,
            cost: 0.0,
            score: 0.0,
        });
        f.known_costs.insert(start, 0.0);
        f
    }

    fn cost(&self, id: NodeId) -> f64 {
        self.known_costs.get(&id).copied().unwrap_or(f64::INFINITY)
    }

    /// Discards stale queue entries and returns the cost of the cheapest unexpanded node.
    fn top_cost(&mut self) -> f64 {
        while let Some(item) = self.queue.peek() {
            if item.cost > self.cost(item.at) {
                self.queue.pop();
            } else {
                return item.cost;
            }
        }
        f64::INFINITY
    }

    /// Expands the cheapest node, relaxing its edges. Every node reached which was also
    /// reached by the `other` direction is a meeting candidate; the cheapest one found
    /// so far is kept in `best`.
    fn expand(&mut self, g: &Graph, other: &Frontier<'_>, best: &mut Option<(f64, NodeId)>) {
        let item = match self.queue.pop() {
            Some(item) => item,
            None => return,
        };

        for &Edge {
            to: neighbor,
            cost: edge_cost,
        } in (self.edges)(item.at)
        {
            if !g.contains(neighbor) {
                continue;
            }

            let neighbor_cost = item.cost + edge_cost;
            if neighbor_cost < self.cost(neighbor) {
                self.came_from.insert(neighbor, item.at);
                self.known_costs.insert(neighbor, neighbor_cost);
                self.queue.push(QueueItem {
                    at: neighbor,
                    cost: neighbor_cost,
                    score: neighbor_cost,
                });
            }

            let through = self.cost(neighbor) + other.cost(neighbor);
            if through < best.map_or(f64::INFINITY, |(cost, _)| cost) {
                *best = Some((through, neighbor));
            }
        }
    }
}

/// Runs [Dijkstra's algorithm](https://en.wikipedia.org/wiki/Dijkstra%27s_algorithm)
/// from both ends at once, always expanding the direction with the cheaper frontier.
///
/// The search stops once the cheapest unexpanded nodes of both directions together
/// cost at least as much as the best meeting point found, which guarantees
/// the returned path is a cheapest one.
///
/// Returns [SearchError::NoPathFound] if `to` isn't reachable from `from`.
pub fn find_path_bidirectional(
    g: &Graph,
    from: NodeId,
    to: NodeId,
) -> Result<Vec<NodeId>, SearchError> {
    check_references(g, from, to)?;

    if from == to {
        return Ok(vec![from]);
    }

    // Backward search must follow edges in reverse
    let mut reversed: HashMap<NodeId, Vec<Edge>> = HashMap::default();
    for id in g.node_ids() {
        for edge in g.get_edges(id) {
            reversed.entry(edge.to).or_default().push(Edge {
                to: id,
                cost: edge.cost,
            });
        }
    }

    let mut forward = Frontier::new(from, Box::new(|id| g.get_edges(id)));
    let mut backward = Frontier::new(
        to,
        Box::new(|id| reversed.get(&id).map(|e| e.as_slice()).unwrap_or_default()),
    );
    let mut best: Option<(f64, NodeId)> = None;

    loop {
        let forward_top = forward.top_cost();
        let backward_top = backward.top_cost();

        if forward_top.is_infinite() && backward_top.is_infinite() {
            break;
        }

        if let Some((best_cost, _)) = best {
            if forward_top + backward_top >= best_cost {
                break;
            }
        }

        if forward_top <= backward_top {
            forward.expand(g, &backward, &mut best);
        } else {
            backward.expand(g, &forward, &mut best);
        }
    }

    let meeting = match best {
        Some((_, meeting)) => meeting,
        None => return Err(SearchError::NoPathFound),
    };

    let mut path = reconstruct_path(&forward.came_from, meeting);
    let mut last = meeting;
    while let Some(&nd) = backward.came_from.get(&last) {
        path.push(nd);
        last = nd;
    }

    return Ok(path);
}

#[cfg(test)]
mod tests {
    use super::super::test_graphs;
    use super::*;
    use crate::Point;

    #[test]
    fn finds_cheapest_path() {
        let g = test_graphs::simple();
        assert_eq!(find_path_bidirectional(&g, 1, 6), Ok(vec![1, 2, 3, 5, 6]));
        assert_eq!(find_path_bidirectional(&g, 6, 4), Ok(vec![6, 5, 4]));
    }

    #[test]
    fn adjacent_and_same_nodes() {
        let g = test_graphs::simple();
        assert_eq!(find_path_bidirectional(&g, 1, 2), Ok(vec![1, 2]));
        assert_eq!(find_path_bidirectional(&g, 2, 2), Ok(vec![2]));
    }

    #[test]
    fn does_not_stop_at_first_meeting() {
        // The direct edge meets first, but the detour through 3 is cheaper.
        //
        //   1 ───10─── 2
        //    \        /
        //     1      1
        //      \    /
        //        3
        let mut g = Graph::new();
        g.set_node(1, Point::new(0.0, 0.0));
        g.set_node(2, Point::new(0.0, 0.02));
        g.set_node(3, Point::new(-0.01, 0.01));
        g.connect(1, 2, 10.0);
        g.connect(1, 3, 1.0);
        g.connect(3, 2, 1.0);

        assert_eq!(find_path_bidirectional(&g, 1, 2), Ok(vec![1, 3, 2]));
    }

    #[test]
    fn follows_one_way_edges() {
        let mut g = Graph::new();
        g.set_node(1, Point::new(0.0, 0.0));
        g.set_node(2, Point::new(0.0, 0.01));
        g.set_node(3, Point::new(0.0, 0.02));
        g.set_edge(1, Edge { to: 2, cost: 1.0 });
        g.set_edge(2, Edge { to: 3, cost: 1.0 });

        assert_eq!(find_path_bidirectional(&g, 1, 3), Ok(vec![1, 2, 3]));
        assert_eq!(find_path_bidirectional(&g, 3, 1), Err(SearchError::NoPathFound));
    }

    #[test]
    fn unreachable_and_invalid() {
        let g = test_graphs::simple();
        assert_eq!(find_path_bidirectional(&g, 1, 7), Err(SearchError::NoPathFound));
        assert_eq!(
            find_path_bidirectional(&g, 1, 99),
            Err(SearchError::InvalidReference(99))
        );
    }
}
