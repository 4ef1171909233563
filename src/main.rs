// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use waypath::cache::CacheStore;
use waypath::source::{NoRoadData, OsmFileSource, RoadSource};
use waypath::{AlgorithmChoice, Point, Route, RouteOptions, Router, RouterConfig, RoutingContext};

#[derive(Debug, thiserror::Error)]
#[error("{0}: {1}")]
struct RoadDataLoadError(PathBuf, #[source] waypath::Error);

/// Estimates a driving route between two points and prints it as GeoJSON.
#[derive(Parser)]
struct Cli {
    /// Latitude of the origin
    #[arg(allow_negative_numbers = true)]
    origin_lat: f64,

    /// Longitude of the origin
    #[arg(allow_negative_numbers = true)]
    origin_lon: f64,

    /// Latitude of the destination
    #[arg(allow_negative_numbers = true)]
    destination_lat: f64,

    /// Longitude of the destination
    #[arg(allow_negative_numbers = true)]
    destination_lon: f64,

    /// OSM XML file (optionally .gz or .bz2 compressed) with road geometry
    #[arg(long)]
    osm_file: Option<PathBuf>,

    /// JSON file persisting the route cache between runs
    #[arg(long)]
    cache_file: Option<PathBuf>,

    /// JSON file persisting learned heuristic adjustments between runs
    #[arg(long)]
    learning_file: Option<PathBuf>,

    /// Path search algorithm: auto, astar, dijkstra or bidirectional
    #[arg(long, default_value_t = AlgorithmChoice::Auto)]
    algorithm: AlgorithmChoice,

    /// Skip route smoothing
    #[arg(long)]
    no_smooth: bool,

    /// Neither read nor write the route cache
    #[arg(long)]
    no_cache: bool,

    /// Seed for the random number generator, for reproducible routes
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
pub async fn main() -> Result<(), Box<dyn Error>> {
    colog::init();
    let cli = Cli::parse();

    let origin = Point::new(cli.origin_lat, cli.origin_lon);
    let destination = Point::new(cli.destination_lat, cli.destination_lon);
    let options = RouteOptions {
        use_external_data: cli.osm_file.is_some(),
        use_cache: !cli.no_cache,
        algorithm: cli.algorithm,
        smooth: !cli.no_smooth,
    };
    let config = RouterConfig {
        seed: cli.seed,
        ..Default::default()
    };

    let route = match &cli.cache_file {
        Some(path) => {
            let ctx = RoutingContext::open(path, cli.learning_file.clone()).await?;
            with_roads(ctx, &cli, config, origin, destination, &options).await?
        }
        None => {
            let mut ctx = RoutingContext::in_memory();
            if let Some(path) = &cli.learning_file {
                ctx = ctx.with_learning_file(path.clone()).await;
            }
            with_roads(ctx, &cli, config, origin, destination, &options).await?
        }
    };

    println!("{}", serde_json::to_string_pretty(&to_geojson(&route))?);
    Ok(())
}

async fn with_roads<S: CacheStore>(
    ctx: RoutingContext<S>,
    cli: &Cli,
    config: RouterConfig,
    origin: Point,
    destination: Point,
    options: &RouteOptions,
) -> Result<Route, Box<dyn Error>> {
    match &cli.osm_file {
        Some(path) => {
            let roads = OsmFileSource::open(path)
                .await
                .map_err(|e| RoadDataLoadError(path.clone(), e))?;
            log::info!("loaded {} road segments from {}", roads.segments().len(), path.display());
            run(Router::with_config(ctx, roads, config), origin, destination, options).await
        }
        None => run(Router::with_config(ctx, NoRoadData, config), origin, destination, options).await,
    }
}

async fn run<S: CacheStore, R: RoadSource>(
    router: Router<S, R>,
    origin: Point,
    destination: Point,
    options: &RouteOptions,
) -> Result<Route, Box<dyn Error>> {
    let route = router.compute_route(origin, destination, options).await?;

    // Persists the adjustments, if a learning file was given
    router.maintain().await;
    Ok(route)
}

fn to_geojson(route: &Route) -> serde_json::Value {
    let coordinates: Vec<[f64; 2]> = route.points.iter().map(|p| [p.lon, p.lat]).collect();

    serde_json::json!({
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "properties": {
                "provenance": route.provenance,
                "approximate": route.provenance.is_approximate(),
                "length_km": route.length(),
            },
            "geometry": {
                "type": "LineString",
                "coordinates": coordinates,
            },
        }],
    })
}
