// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Seams for external collaborators: providers of road geometry and of routes
//! observed from real routing services.
//!
//! Collaborators are resolved when a [Router](crate::Router) is constructed.
//! A router without road data uses [NoRoadData], which makes it go straight to
//! the synthetic heuristic graph.

mod osm;

pub use osm::{FileFormat, OsmFileSource};

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::builder::RoadSegment;
use crate::{Error, Point, Result};

/// Rectangular lat-lon region used to scope road data queries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl BoundingBox {
    /// Returns the smallest box containing both points, extended by `margin` degrees on every side.
    pub fn around(a: Point, b: Point, margin: f64) -> Self {
        Self {
            south: a.lat.min(b.lat) - margin,
            west: a.lon.min(b.lon) - margin,
            north: a.lat.max(b.lat) + margin,
            east: a.lon.max(b.lon) + margin,
        }
    }

    pub fn contains(&self, p: Point) -> bool {
        p.lat >= self.south && p.lat <= self.north && p.lon >= self.west && p.lon <= self.east
    }
}

/// Provider of road geometry.
pub trait RoadSource: Send + Sync {
    /// Returns false if this source never has any data, letting callers skip it entirely.
    fn is_available(&self) -> bool {
        true
    }

    /// Fetches all road segments with at least one point within the bounding box.
    fn fetch_road_segments(
        &self,
        bbox: &BoundingBox,
    ) -> impl Future<Output = Result<Vec<RoadSegment>>> + Send;
}

/// Provider of routes calculated by a real routing service, used as ground truth
/// for [learning](crate::learning).
pub trait ObservedRouteSource: Send + Sync {
    fn fetch_observed_route(
        &self,
        origin: Point,
        destination: Point,
    ) -> impl Future<Output = Result<Vec<Point>>> + Send;
}

/// [RoadSource] without any data.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRoadData;

impl RoadSource for NoRoadData {
    fn is_available(&self) -> bool {
        false
    }

    async fn fetch_road_segments(&self, _: &BoundingBox) -> Result<Vec<RoadSegment>> {
        Err(Error::ExternalDataUnavailable("no road source configured".to_string()))
    }
}

/// [RoadSource] over a fixed, in-memory set of segments.
#[derive(Debug, Clone, Default)]
pub struct StaticRoadSource(pub Vec<RoadSegment>);

impl RoadSource for StaticRoadSource {
    async fn fetch_road_segments(&self, bbox: &BoundingBox) -> Result<Vec<RoadSegment>> {
        Ok(segments_within(&self.0, bbox))
    }
}

/// Returns clones of all segments with at least one point inside the bounding box.
pub(crate) fn segments_within(segments: &[RoadSegment], bbox: &BoundingBox) -> Vec<RoadSegment> {
    segments
        .iter()
        .filter(|s| s.points.iter().any(|&p| bbox.contains(p)))
        .cloned()
        .collect()
}
