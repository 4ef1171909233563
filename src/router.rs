// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::builder::{synthetic_grid, GridConfig, RoadGraphBuilder, RoadSegment};
use crate::cache::{CacheStore, MemoryStore};
use crate::distance::wrap_longitude;
use crate::search::{Algorithm, Heuristic};
use crate::smooth::{smooth_full, SmoothOptions};
use crate::source::{BoundingBox, NoRoadData, ObservedRouteSource, RoadSource};
use crate::{earth_distance, lerp, Error, Point, Provenance, Result, Route, RoutingContext};

/// Algorithm requested for a single route computation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlgorithmChoice {
    /// Pick the algorithm based on the distance between endpoints, see [Algorithm::for_distance].
    #[default]
    Auto,
    AStar,
    Dijkstra,
    Bidirectional,
}

impl AlgorithmChoice {
    /// Resolves the choice into a concrete [Algorithm].
    pub fn resolve(self, distance: f64, config: &RouterConfig) -> Algorithm {
        match self {
            Self::Auto => Algorithm::for_distance(distance, config.short_distance, config.long_distance),
            Self::AStar => Algorithm::AStar,
            Self::Dijkstra => Algorithm::Dijkstra,
            Self::Bidirectional => Algorithm::Bidirectional,
        }
    }
}

impl std::str::FromStr for AlgorithmChoice {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Self::Auto),
            other => match other.parse::<Algorithm>()? {
                Algorithm::AStar => Ok(Self::AStar),
                Algorithm::Dijkstra => Ok(Self::Dijkstra),
                Algorithm::Bidirectional => Ok(Self::Bidirectional),
            },
        }
    }
}

impl std::fmt::Display for AlgorithmChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::AStar => write!(f, "astar"),
            Self::Dijkstra => write!(f, "dijkstra"),
            Self::Bidirectional => write!(f, "bidirectional"),
        }
    }
}

/// Per-request options of [Router::compute_route].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteOptions {
    /// Try to build the graph from the router's [RoadSource] first.
    pub use_external_data: bool,

    /// Read and write the route cache.
    pub use_cache: bool,

    pub algorithm: AlgorithmChoice,

    /// Apply [smooth_full] to computed routes.
    pub smooth: bool,
}

impl Default for RouteOptions {
    fn default() -> Self {
        Self {
            use_external_data: true,
            use_cache: true,
            algorithm: AlgorithmChoice::Auto,
            smooth: true,
        }
    }
}

/// Static parameters of a [Router].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Below this distance (km) [AlgorithmChoice::Auto] picks A*.
    pub short_distance: f64,

    /// Below this distance (km) [AlgorithmChoice::Auto] picks bidirectional Dijkstra,
    /// and plain Dijkstra beyond.
    pub long_distance: f64,

    /// Routes longer than this (km) are split into segments.
    pub segmentation_threshold: f64,

    /// Maximum length (km) of a segment of a long route.
    pub max_segment: f64,

    /// Time limit for a single request to an external collaborator.
    pub fetch_timeout: Duration,

    /// Endpoints are snapped to road vertices not further than this (km).
    pub snap_radius: f64,

    /// Margin (degrees) added around the endpoints when querying road data.
    pub bbox_margin: f64,

    /// Number of points of an interpolated fallback route.
    pub fallback_points: usize,

    /// Maximum offset (degrees) of intermediate points of an interpolated fallback route.
    pub interpolation_jitter: f64,

    /// Seed of the random number generator used for synthetic grids and interpolation.
    /// Seeded from system entropy if not provided.
    pub seed: Option<u64>,

    /// Interval between runs of [Router::maintain] started by [Router::spawn_maintenance].
    pub maintenance_interval: Duration,

    pub grid: GridConfig,
    pub smoothing: SmoothOptions,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            short_distance: 10.0,
            long_distance: 30.0,
            segmentation_threshold: 30.0,
            max_segment: 20.0,
            fetch_timeout: Duration::from_secs(10),
            snap_radius: 0.5,
            bbox_margin: 0.05,
            fallback_points: 12,
            interpolation_jitter: 0.0005,
            seed: None,
            maintenance_interval: Duration::from_secs(5 * 60),
            grid: GridConfig::default(),
            smoothing: SmoothOptions::default(),
        }
    }
}

/// Generates a route of `n` points: `a`, `n - 2` points evenly spread along the straight line
/// and shifted by up to `jitter` degrees on both axes, and `b`.
/// Always returns at least `a` and `b`.
pub fn interpolate<R: Rng + ?Sized>(a: Point, b: Point, n: usize, jitter: f64, rng: &mut R) -> Vec<Point> {
    let n = n.max(2);
    let mut points = Vec::with_capacity(n);
    points.push(a);

    for i in 1..n - 1 {
        let on_line = lerp(a, b, i as f64 / (n - 1) as f64);
        points.push(Point::new(
            on_line.lat + (rng.gen::<f64>() - 0.5) * 2.0 * jitter,
            wrap_longitude(on_line.lon + (rng.gen::<f64>() - 0.5) * 2.0 * jitter),
        ));
    }

    points.push(b);
    return points;
}

/// Ways of producing a route, tried in order until one succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    /// Search over a graph built from road segments of the [RoadSource].
    RoadData,

    /// Search over a [synthetic grid](synthetic_grid) shaped by the heuristics.
    HeuristicGrid,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RoadData => write!(f, "road data"),
            Self::HeuristicGrid => write!(f, "heuristic grid"),
        }
    }
}

/// Outcome of a [Router::maintain] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    /// Number of compared predicted-observed route pairs.
    pub reconciled: usize,

    /// Number of removed cache entries.
    pub expired: usize,
}

/// Estimates routes between pairs of points, see [Router::compute_route].
#[derive(Debug)]
pub struct Router<S = MemoryStore, R = NoRoadData> {
    ctx: RoutingContext<S>,
    roads: R,
    config: RouterConfig,
    rng: Mutex<StdRng>,
}

impl<S: CacheStore> Router<S, NoRoadData> {
    /// Creates a router without any road data, using the default [RouterConfig].
    pub fn new(ctx: RoutingContext<S>) -> Self {
        Self::with_config(ctx, NoRoadData, RouterConfig::default())
    }
}

impl<S: CacheStore, R: RoadSource> Router<S, R> {
    pub fn with_config(ctx: RoutingContext<S>, roads: R, config: RouterConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            ctx,
            roads,
            config,
            rng: Mutex::new(rng),
        }
    }

    /// Replaces the [RoadSource].
    pub fn with_road_source<R2: RoadSource>(self, roads: R2) -> Router<S, R2> {
        Router {
            ctx: self.ctx,
            roads,
            config: self.config,
            rng: self.rng,
        }
    }

    pub fn context(&self) -> &RoutingContext<S> {
        &self.ctx
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn road_source(&self) -> &R {
        &self.roads
    }

    /// Computes a route from `origin` to `destination`.
    ///
    /// Apart from [Error::InvalidCoordinates], this function never fails: unavailable road data,
    /// cache failures and unreachable destinations are logged, and the computation falls back
    /// to less precise strategies, down to a straight-line interpolation. The returned route
    /// always starts at `origin`, ends at `destination` and has at least 3 points
    /// (unless both endpoints are the same).
    ///
    /// Routes longer than [RouterConfig::segmentation_threshold] are computed
    /// in segments, without road data.
    pub async fn compute_route(&self, origin: Point, destination: Point, options: &RouteOptions) -> Result<Route> {
        let origin = origin.validate()?;
        let destination = destination.validate()?;

        let distance = earth_distance(origin, destination);
        if distance > self.config.segmentation_threshold {
            Ok(self.compute_segmented(origin, destination, distance, options).await)
        } else {
            Ok(self.compute_leg(origin, destination, distance, options).await)
        }
    }

    async fn compute_segmented(&self, origin: Point, destination: Point, distance: f64, options: &RouteOptions) -> Route {
        let count = (distance / self.config.max_segment).ceil().max(1.0) as usize;
        log::debug!("splitting {:.1} km route into {} segments", distance, count);

        let options = RouteOptions {
            use_external_data: false,
            ..*options
        };

        let mut waypoints: Vec<Point> = (0..count)
            .map(|i| lerp(origin, destination, i as f64 / count as f64))
            .collect();
        waypoints.push(destination);

        let mut points: Vec<Point> = Vec::default();
        let mut provenance = Provenance::RoadData;

        for pair in waypoints.windows(2) {
            let leg = self
                .compute_leg(pair[0], pair[1], earth_distance(pair[0], pair[1]), &options)
                .await;

            let skip = match (points.last(), leg.points.first()) {
                (Some(last), Some(first)) if last == first => 1,
                _ => 0,
            };
            points.extend(leg.points.into_iter().skip(skip));
            provenance = least_precise(provenance, leg.provenance);
        }

        Route::new(points, provenance)
    }

    /// Computes a route without segmentation: cache, strategies, smoothing, cache write.
    async fn compute_leg(&self, origin: Point, destination: Point, distance: f64, options: &RouteOptions) -> Route {
        if options.use_cache {
            match self.ctx.cache().get_route(origin, destination).await {
                Ok(Some(route)) => {
                    log::debug!("route cache hit");
                    return route;
                }
                Ok(None) => log::debug!("route cache miss"),
                Err(e) => log::warn!("route cache unavailable, continuing uncached: {}", e),
            }
        }

        let algorithm = options.algorithm.resolve(distance, &self.config);
        log::debug!("using {} for a {:.1} km route", algorithm, distance);

        let mut strategies = Vec::with_capacity(2);
        if options.use_external_data && self.roads.is_available() {
            strategies.push(Strategy::RoadData);
        }
        strategies.push(Strategy::HeuristicGrid);

        let mut route = None;
        for strategy in strategies {
            let attempt = match strategy {
                Strategy::RoadData => self.route_over_roads(origin, destination, algorithm, options).await,
                Strategy::HeuristicGrid => self.route_over_grid(origin, destination, algorithm),
            };

            match attempt {
                Ok(r) => {
                    log::info!("route calculated using {} ({} points)", strategy, r.points.len());
                    route = Some(r);
                    break;
                }
                Err(e) => log::warn!("{} strategy failed: {}", strategy, e),
            }
        }

        let mut route = match route {
            Some(mut route) => {
                if options.smooth {
                    route.points = smooth_full(&route.points, &self.config.smoothing);
                }
                route
            }
            None => self.interpolated(origin, destination),
        };

        if route.points.len() < 3 && origin != destination {
            log::warn!("route has only {} points, interpolating instead", route.points.len());
            route = self.interpolated(origin, destination);
        }

        if options.use_cache {
            if let Err(e) = self.ctx.cache().put_route(origin, destination, &route).await {
                log::warn!("failed to cache route: {}", e);
            }
        }

        if route.provenance != Provenance::RoadData {
            self.ctx.learning().record_predicted(&route.points, origin, destination);
        }

        route
    }

    fn interpolated(&self, origin: Point, destination: Point) -> Route {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        let points = interpolate(
            origin,
            destination,
            self.config.fallback_points,
            self.config.interpolation_jitter,
            &mut *rng,
        );
        Route::new(points, Provenance::Interpolated)
    }

    /// Fetches road segments around the endpoints, either from the road data cache
    /// or from the [RoadSource] (with a timeout).
    async fn road_segments(&self, bbox: &BoundingBox, options: &RouteOptions) -> Result<Vec<RoadSegment>> {
        if options.use_cache {
            match self.ctx.cache().get_roads(bbox).await {
                Ok(Some(segments)) => {
                    log::debug!("road data cache hit");
                    return Ok(segments);
                }
                Ok(None) => {}
                Err(e) => log::warn!("road data cache unavailable: {}", e),
            }
        }

        let timeout = self.config.fetch_timeout;
        let segments = tokio::time::timeout(timeout, self.roads.fetch_road_segments(bbox))
            .await
            .map_err(|_| Error::Timeout(timeout))??;

        if segments.is_empty() {
            return Err(Error::ExternalDataUnavailable("no roads in the area".to_string()));
        }

        if options.use_cache {
            if let Err(e) = self.ctx.cache().put_roads(bbox, &segments).await {
                log::warn!("failed to cache road data: {}", e);
            }
        }

        Ok(segments)
    }

    async fn route_over_roads(
        &self,
        origin: Point,
        destination: Point,
        algorithm: Algorithm,
        options: &RouteOptions,
    ) -> Result<Route> {
        let bbox = BoundingBox::around(origin, destination, self.config.bbox_margin);
        let segments = self.road_segments(&bbox, options).await?;

        let mut builder = RoadGraphBuilder::new();
        builder.add_segments(&segments);
        let built = builder.finish(origin, destination, self.config.snap_radius)?;

        let path = algorithm.find_path(&built.graph, built.origin, built.destination, Heuristic::Haversine)?;

        let mut points = Vec::with_capacity(path.len() + 2);
        points.push(origin);
        for p in built.graph.positions(&path) {
            if points.last() != Some(&p) {
                points.push(p);
            }
        }
        if points.last() != Some(&destination) {
            points.push(destination);
        }

        Ok(Route::new(points, Provenance::RoadData))
    }

    fn route_over_grid(&self, origin: Point, destination: Point, algorithm: Algorithm) -> Result<Route> {
        let built = {
            let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
            synthetic_grid(
                origin,
                destination,
                &self.config.grid,
                self.ctx.heuristics(),
                &mut *rng,
            )
        };

        let path = algorithm.find_path(&built.graph, built.origin, built.destination, Heuristic::Haversine)?;
        Ok(Route::new(built.graph.positions(&path), Provenance::Heuristic))
    }

    /// Feeds a route calculated by a real routing provider into the learning loop.
    /// Invalid points of the route are dropped.
    pub fn record_observed_route(&self, route: &[Point], origin: Point, destination: Point) -> Result<()> {
        let origin = origin.validate()?;
        let destination = destination.validate()?;
        let points: Vec<Point> = route.iter().copied().filter(Point::is_valid).collect();

        self.ctx.learning().record_observed(&points, origin, destination);
        Ok(())
    }

    /// Asks an [ObservedRouteSource] for the route between two points and records it
    /// with [Router::record_observed_route]. Returns false if the source failed
    /// or didn't answer within [RouterConfig::fetch_timeout].
    pub async fn observe_with<O: ObservedRouteSource>(&self, source: &O, origin: Point, destination: Point) -> Result<bool> {
        let origin = origin.validate()?;
        let destination = destination.validate()?;

        let timeout = self.config.fetch_timeout;
        let fetched = tokio::time::timeout(timeout, source.fetch_observed_route(origin, destination))
            .await
            .unwrap_or(Err(Error::Timeout(timeout)));

        match fetched {
            Ok(route) => {
                self.record_observed_route(&route, origin, destination)?;
                Ok(true)
            }
            Err(e) => {
                log::warn!("observed route unavailable: {}", e);
                Ok(false)
            }
        }
    }

    /// Runs periodic housekeeping: reconciles learning samples, persists the adjustments
    /// (if the context has a learning file) and sweeps expired cache entries.
    /// Failures are logged and don't stop the remaining steps.
    pub async fn maintain(&self) -> MaintenanceReport {
        let reconciled = self.ctx.learning().batch_reconcile();

        if let Some(path) = self.ctx.learning_path() {
            let adjustments = self.ctx.adjustments().snapshot();
            if let Err(e) = crate::learning::save_adjustments(path, &adjustments).await {
                log::warn!("failed to persist adjustments to {}: {}", path.display(), e);
            }
        }

        let expired = match self.ctx.cache().sweep_expired().await {
            Ok(n) => n,
            Err(e) => {
                log::warn!("failed to sweep the cache: {}", e);
                0
            }
        };

        MaintenanceReport { reconciled, expired }
    }
}

impl<S, R> Router<S, R>
where
    S: CacheStore + 'static,
    R: RoadSource + 'static,
{
    /// Runs [Router::maintain] every [RouterConfig::maintenance_interval] on the tokio runtime,
    /// until the returned task is aborted.
    pub fn spawn_maintenance(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let router = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(router.config.maintenance_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            // The first tick completes immediately
            interval.tick().await;

            loop {
                interval.tick().await;
                let report = router.maintain().await;
                log::debug!("maintenance: {:?}", report);
            }
        })
    }
}

fn least_precise(a: Provenance, b: Provenance) -> Provenance {
    fn rank(p: Provenance) -> u8 {
        match p {
            Provenance::RoadData => 0,
            Provenance::Heuristic => 1,
            Provenance::Interpolated => 2,
        }
    }

    if rank(b) > rank(a) {
        b
    } else {
        a
    }
}
