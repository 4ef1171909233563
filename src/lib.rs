// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Fallback route estimation between two geographic points.
//!
//! When no external routing service can answer, waypath estimates a plausible driving route
//! by building a small weighted graph - either from road geometry supplied by a
//! [RoadSource](crate::source::RoadSource), or from a synthetic grid of waypoints shaped by
//! geographic [heuristics](crate::heuristic) - and searching it with Dijkstra, A* or
//! bidirectional Dijkstra. Results are [smoothed](crate::smooth), [cached](crate::cache)
//! and compared against routes observed from real routing providers to
//! [calibrate](crate::learning) the heuristics over time.
//!
//! # Example
//!
//! ```no_run
//! # async fn example() -> Result<(), waypath::Error> {
//! let router = waypath::Router::new(waypath::RoutingContext::in_memory());
//! let route = router
//!     .compute_route(
//!         waypath::Point::new(-15.90, -48.07),
//!         waypath::Point::new(-15.80, -47.90),
//!         &waypath::RouteOptions::default(),
//!     )
//!     .await?;
//!
//! println!("{} points, {:?}", route.points.len(), route.provenance);
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod cache;
mod context;
mod distance;
mod error;
mod graph;
pub mod heuristic;
mod kd;
pub mod learning;
mod router;
pub mod search;
pub mod smooth;
pub mod source;

pub use context::RoutingContext;
pub use distance::{bearing, bearing_difference, earth_distance, lerp, route_length};
pub use error::{Error, Result};
pub use graph::{Graph, NodeId};
pub use kd::KDTree;
pub use router::{interpolate, AlgorithmChoice, MaintenanceReport, RouteOptions, Router, RouterConfig};

use serde::{Deserialize, Serialize};

/// A geographic position, in degrees (WGS84).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub lat: f64,
    pub lon: f64,
}

impl Point {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Checks that both coordinates are finite and within their valid ranges
    /// (`[-90, 90]` for latitude, `[-180, 180]` for longitude).
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }

    /// Returns the point itself if [valid](Point::is_valid),
    /// or [Error::InvalidCoordinates] otherwise.
    pub fn validate(self) -> Result<Self> {
        if self.is_valid() {
            Ok(self)
        } else {
            Err(Error::InvalidCoordinates {
                lat: self.lat,
                lon: self.lon,
            })
        }
    }
}

impl From<(f64, f64)> for Point {
    fn from((lat, lon): (f64, f64)) -> Self {
        Self { lat, lon }
    }
}

/// Describes where a [Route] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Calculated over road geometry from an external data source.
    RoadData,

    /// Estimated over the synthetic heuristic grid.
    Heuristic,

    /// Straight-line interpolation, used when every other strategy failed.
    Interpolated,
}

impl Provenance {
    /// Returns true for routes which were not calculated over real road geometry,
    /// and should be presented as approximations.
    pub fn is_approximate(self) -> bool {
        !matches!(self, Self::RoadData)
    }
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RoadData => write!(f, "road_data"),
            Self::Heuristic => write!(f, "heuristic"),
            Self::Interpolated => write!(f, "interpolated"),
        }
    }
}

/// An ordered sequence of [Points](Point) from an origin to a destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub points: Vec<Point>,
    pub provenance: Provenance,
}

impl Route {
    pub fn new(points: Vec<Point>, provenance: Provenance) -> Self {
        Self { points, provenance }
    }

    pub fn origin(&self) -> Option<Point> {
        self.points.first().copied()
    }

    pub fn destination(&self) -> Option<Point> {
        self.points.last().copied()
    }

    /// Total length of the route, in kilometers.
    pub fn length(&self) -> f64 {
        route_length(&self.points)
    }
}
