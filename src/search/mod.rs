// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Minimum-cost path search over a [Graph].
//!
//! All three algorithms return the same (minimum) path cost for the same input,
//! but may return different paths if multiple paths share that cost.

mod astar;
mod bidirectional;
mod dijkstra;
mod error;

pub use astar::{find_path_astar, Heuristic};
pub use bidirectional::find_path_bidirectional;
pub use dijkstra::find_path_dijkstra;
pub use error::SearchError;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{Graph, NodeId};

/// Path search algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    /// Classic [Dijkstra's algorithm](https://en.wikipedia.org/wiki/Dijkstra%27s_algorithm).
    Dijkstra,

    /// [A* search](https://en.wikipedia.org/wiki/A*_search_algorithm),
    /// guided by the straight-line distance to the goal.
    AStar,

    /// Dijkstra's algorithm run simultaneously from both ends.
    Bidirectional,
}

impl Algorithm {
    /// Picks an algorithm based on the straight-line distance (km) between the endpoints:
    /// A* below `short`, bidirectional Dijkstra below `long` and plain Dijkstra beyond.
    pub fn for_distance(distance: f64, short: f64, long: f64) -> Self {
        if distance < short {
            Self::AStar
        } else if distance < long {
            Self::Bidirectional
        } else {
            Self::Dijkstra
        }
    }

    /// Runs the algorithm. [Heuristic] is only used by [Algorithm::AStar].
    pub fn find_path(
        self,
        g: &Graph,
        from: NodeId,
        to: NodeId,
        heuristic: Heuristic<'_>,
    ) -> Result<Vec<NodeId>, SearchError> {
        match self {
            Self::Dijkstra => find_path_dijkstra(g, from, to),
            Self::AStar => find_path_astar(g, from, to, heuristic),
            Self::Bidirectional => find_path_bidirectional(g, from, to),
        }
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dijkstra => write!(f, "dijkstra"),
            Self::AStar => write!(f, "astar"),
            Self::Bidirectional => write!(f, "bidirectional"),
        }
    }
}

impl std::str::FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dijkstra" => Ok(Self::Dijkstra),
            "astar" | "a_star" => Ok(Self::AStar),
            "bidirectional" => Ok(Self::Bidirectional),
            _ => Err(format!("unknown algorithm: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct QueueItem {
    at: NodeId,
    cost: f64,
    score: f64,
}

impl PartialEq for QueueItem {
    fn eq(&self, other: &Self) -> bool {
        self.score.eq(&other.score)
    }
}

impl PartialOrd for QueueItem {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Eq for QueueItem {}

impl Ord for QueueItem {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // NOTE: We revert the order of comparison,
        // as lower scores are considered better ("higher"),
        // and Rust's BinaryHeap is a max-heap.
        other.score.total_cmp(&self.score)
    }
}

fn reconstruct_path(came_from: &HashMap<NodeId, NodeId>, mut last: NodeId) -> Vec<NodeId> {
    let mut path = vec![last];

    while let Some(&nd) = came_from.get(&last) {
        path.push(nd);
        last = nd;
    }

    path.reverse();
    return path;
}

fn check_references(g: &Graph, from: NodeId, to: NodeId) -> Result<(), SearchError> {
    if !g.contains(from) {
        Err(SearchError::InvalidReference(from))
    } else if !g.contains(to) {
        Err(SearchError::InvalidReference(to))
    } else {
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_graphs {
    use crate::{Graph, Point};

    //   1 ─1.5─ 2 ─1.5─ 3
    //   │1.5            │1.5
    //   4 ──────5────── 5 ─1.5─ 6
    //
    //   7 (disconnected)
    pub fn simple() -> Graph {
        let mut g = Graph::new();
        g.set_node(1, Point::new(0.01, 0.00));
        g.set_node(2, Point::new(0.01, 0.01));
        g.set_node(3, Point::new(0.01, 0.02));
        g.set_node(4, Point::new(0.00, 0.00));
        g.set_node(5, Point::new(0.00, 0.02));
        g.set_node(6, Point::new(0.00, 0.03));
        g.set_node(7, Point::new(0.05, 0.05));
        g.connect(1, 2, 1.5);
        g.connect(2, 3, 1.5);
        g.connect(1, 4, 1.5);
        g.connect(3, 5, 1.5);
        g.connect(4, 5, 5.0);
        g.connect(5, 6, 1.5);
        g
    }

    /// Pseudo-random, deterministic graph with `n` nodes on a small area.
    /// Edge costs are distances multiplied by factors both above and below 1.
    pub fn pseudo_random(n: i64, seed: u64) -> Graph {
        let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let mut next = move || {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (state >> 11) as f64 / (1u64 << 53) as f64
        };

        let mut g = Graph::new();
        for id in 0..n {
            g.set_node(id, Point::new(next() * 0.1, next() * 0.1));
        }
        for id in 0..n {
            for _ in 0..3 {
                let other = (next() * n as f64) as i64 % n;
                if other != id {
                    let a = g.position(id).unwrap();
                    let b = g.position(other).unwrap();
                    let cost = crate::earth_distance(a, b) * (0.4 + next() * 1.2);
                    g.connect(id, other, cost);
                }
            }
        }
        g
    }
}
