// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::NodeId;

/// Error conditions which may occur during path search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchError {
    /// The start or end nodes don't exist in a graph.
    InvalidReference(NodeId),

    /// The search exhausted every node reachable from the start
    /// without reaching the end.
    NoPathFound,
}

impl std::fmt::Display for SearchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidReference(node_id) => write!(f, "invalid node: {}", node_id),
            Self::NoPathFound => write!(f, "no path found"),
        }
    }
}

impl std::error::Error for SearchError {}

impl From<SearchError> for crate::Error {
    fn from(_: SearchError) -> Self {
        crate::Error::NoPathFound
    }
}
