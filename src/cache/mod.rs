// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Time-limited storage of computed routes and fetched road data.
//!
//! [RouteCache] sits on top of any [CacheStore] - a plain key-value store of
//! timestamped JSON values. Entries older than their time-to-live are treated as absent
//! and removed when read, or in bulk by [RouteCache::sweep_expired].

mod clock;
mod file;
mod memory;

pub use clock::{Clock, ManualClock, SystemClock};
pub use file::FileStore;
pub use memory::MemoryStore;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::builder::RoadSegment;
use crate::source::BoundingBox;
use crate::{Point, Result, Route};

const ROUTE_PREFIX: &str = "route";
const ROADS_PREFIX: &str = "roads";

/// A value stored in a [CacheStore], with the time it was stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub value: serde_json::Value,

    /// Milliseconds since the Unix epoch, as reported by a [Clock].
    pub stored_at: u64,
}

/// Durable (or not) key-value storage backing a [RouteCache].
///
/// Failures should be reported as [Error::CacheUnavailable](crate::Error::CacheUnavailable);
/// callers treat them as cache misses.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<CacheEntry>>> + Send;

    /// Stores an entry, overwriting any previous one under the same key.
    fn put(&self, key: &str, entry: CacheEntry) -> impl Future<Output = Result<()>> + Send;

    /// Removes an entry. Removing a missing key is not an error.
    fn delete(&self, key: &str) -> impl Future<Output = Result<()>> + Send;

    fn keys(&self) -> impl Future<Output = Result<Vec<String>>> + Send;
}

/// Parameters of a [RouteCache].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Number of decimal places of coordinates in cache keys.
    pub precision: usize,

    /// Time-to-live of computed routes.
    pub route_ttl: Duration,

    /// Time-to-live of road segments fetched from external sources.
    pub road_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            precision: 6,
            route_ttl: Duration::from_secs(60 * 60),
            road_ttl: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// Typed cache of [Routes](Route) and [RoadSegments](RoadSegment) over a [CacheStore].
pub struct RouteCache<S> {
    store: S,
    clock: Arc<dyn Clock>,
    config: CacheConfig,
}

impl<S: std::fmt::Debug> std::fmt::Debug for RouteCache<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteCache")
            .field("store", &self.store)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S: CacheStore> RouteCache<S> {
    pub fn new(store: S, config: CacheConfig) -> Self {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    pub fn with_clock(store: S, config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Key of a route between two points, e.g. `route:-15.900000,-48.070000:-15.800000,-47.900000`.
    pub fn route_key(&self, origin: Point, destination: Point) -> String {
        let p = self.config.precision;
        format!(
            "{ROUTE_PREFIX}:{:.p$},{:.p$}:{:.p$},{:.p$}",
            origin.lat, origin.lon, destination.lat, destination.lon
        )
    }

    /// Key of road data within a bounding box, as south,west,north,east.
    pub fn road_key(&self, bbox: &BoundingBox) -> String {
        let p = self.config.precision;
        format!(
            "{ROADS_PREFIX}:{:.p$},{:.p$},{:.p$},{:.p$}",
            bbox.south, bbox.west, bbox.north, bbox.east
        )
    }

    /// Returns the time-to-live of an entry, based on its key.
    /// Keys not produced by this cache never expire.
    fn ttl(&self, key: &str) -> Option<Duration> {
        match key.split_once(':').map(|(prefix, _)| prefix) {
            Some(ROUTE_PREFIX) => Some(self.config.route_ttl),
            Some(ROADS_PREFIX) => Some(self.config.road_ttl),
            _ => None,
        }
    }

    fn is_expired(&self, key: &str, entry: &CacheEntry, now: u64) -> bool {
        match self.ttl(key) {
            Some(ttl) => now.saturating_sub(entry.stored_at) > ttl.as_millis() as u64,
            None => false,
        }
    }

    async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let entry = match self.store.get(key).await? {
            Some(entry) => entry,
            None => return Ok(None),
        };

        if self.is_expired(key, &entry, self.clock.now_ms()) {
            log::debug!("cache entry {} expired", key);
            self.store.delete(key).await?;
            return Ok(None);
        }

        match serde_json::from_value(entry.value) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                log::warn!("dropping malformed cache entry {}: {}", key, e);
                self.store.delete(key).await?;
                Ok(None)
            }
        }
    }

    async fn put<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let entry = CacheEntry {
            value: serde_json::to_value(value)?,
            stored_at: self.clock.now_ms(),
        };
        self.store.put(key, entry).await
    }

    pub async fn get_route(&self, origin: Point, destination: Point) -> Result<Option<Route>> {
        self.get(&self.route_key(origin, destination)).await
    }

    pub async fn put_route(&self, origin: Point, destination: Point, route: &Route) -> Result<()> {
        self.put(&self.route_key(origin, destination), route).await
    }

    pub async fn get_roads(&self, bbox: &BoundingBox) -> Result<Option<Vec<RoadSegment>>> {
        self.get(&self.road_key(bbox)).await
    }

    pub async fn put_roads(&self, bbox: &BoundingBox, segments: &[RoadSegment]) -> Result<()> {
        self.put(&self.road_key(bbox), segments).await
    }

    /// Removes all expired entries from the store. Returns the number of removed entries.
    pub async fn sweep_expired(&self) -> Result<usize> {
        let now = self.clock.now_ms();
        let mut removed = 0;

        for key in self.store.keys().await? {
            // Entries may be overwritten or removed concurrently; re-read every one of them.
            let expired = match self.store.get(&key).await? {
                Some(entry) => self.is_expired(&key, &entry, now),
                None => false,
            };

            if expired {
                self.store.delete(&key).await?;
                removed += 1;
            }
        }

        if removed > 0 {
            log::debug!("swept {} expired cache entries", removed);
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Provenance;

    fn cache() -> (RouteCache<MemoryStore>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let cache = RouteCache::with_clock(MemoryStore::new(), CacheConfig::default(), clock.clone());
        (cache, clock)
    }

    fn route() -> Route {
        Route::new(
            vec![Point::new(-15.9, -48.07), Point::new(-15.85, -48.0), Point::new(-15.8, -47.9)],
            Provenance::Heuristic,
        )
    }

    #[test]
    fn keys_are_quantized() {
        let (cache, _) = cache();
        assert_eq!(
            cache.route_key(Point::new(-15.9, -48.07), Point::new(-15.8, -47.9)),
            "route:-15.900000,-48.070000:-15.800000,-47.900000"
        );
        assert_eq!(
            cache.route_key(Point::new(-15.90000001, -48.07), Point::new(-15.8, -47.9)),
            cache.route_key(Point::new(-15.9, -48.07), Point::new(-15.8, -47.9)),
        );

        let bbox = BoundingBox {
            south: -15.95,
            west: -48.12,
            north: -15.75,
            east: -47.85,
        };
        assert_eq!(cache.road_key(&bbox), "roads:-15.950000,-48.120000,-15.750000,-47.850000");
    }

    #[tokio::test]
    async fn route_round_trip_within_ttl() {
        let (cache, clock) = cache();
        let (a, b) = (Point::new(-15.9, -48.07), Point::new(-15.8, -47.9));

        assert_eq!(cache.get_route(a, b).await.unwrap(), None);
        cache.put_route(a, b, &route()).await.unwrap();

        clock.advance(Duration::from_secs(10 * 60));
        assert_eq!(cache.get_route(a, b).await.unwrap(), Some(route()));

        // Reversed direction is a different route
        assert_eq!(cache.get_route(b, a).await.unwrap(), None);
    }

    #[tokio::test]
    async fn route_expires_after_ttl() {
        let (cache, clock) = cache();
        let (a, b) = (Point::new(-15.9, -48.07), Point::new(-15.8, -47.9));
        cache.put_route(a, b, &route()).await.unwrap();

        clock.advance(Duration::from_secs(60 * 60));
        assert!(cache.get_route(a, b).await.unwrap().is_some());

        clock.advance(Duration::from_millis(1));
        assert_eq!(cache.get_route(a, b).await.unwrap(), None);

        // Lazily evicted
        assert!(cache.store().keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn roads_live_longer_than_routes() {
        let (cache, clock) = cache();
        let bbox = BoundingBox::around(Point::new(-15.9, -48.07), Point::new(-15.8, -47.9), 0.05);
        let segments = vec![RoadSegment::new(
            "primary",
            vec![Point::new(-15.9, -48.07), Point::new(-15.8, -47.9)],
        )];
        cache.put_roads(&bbox, &segments).await.unwrap();

        clock.advance(Duration::from_secs(2 * 60 * 60));
        assert_eq!(cache.get_roads(&bbox).await.unwrap(), Some(segments));

        clock.advance(Duration::from_secs(23 * 60 * 60));
        assert_eq!(cache.get_roads(&bbox).await.unwrap(), None);
    }

    #[tokio::test]
    async fn put_overwrites_and_refreshes_timestamp() {
        let (cache, clock) = cache();
        let (a, b) = (Point::new(1.0, 1.0), Point::new(2.0, 2.0));

        cache.put_route(a, b, &route()).await.unwrap();
        clock.advance(Duration::from_secs(50 * 60));

        let mut newer = route();
        newer.provenance = Provenance::Interpolated;
        cache.put_route(a, b, &newer).await.unwrap();

        clock.advance(Duration::from_secs(50 * 60));
        assert_eq!(cache.get_route(a, b).await.unwrap(), Some(newer));
    }

    #[tokio::test]
    async fn malformed_entries_are_misses() {
        let (cache, clock) = cache();
        let (a, b) = (Point::new(1.0, 1.0), Point::new(2.0, 2.0));
        let key = cache.route_key(a, b);

        cache
            .store()
            .put(
                &key,
                CacheEntry {
                    value: serde_json::json!({"not": "a route"}),
                    stored_at: clock.now_ms(),
                },
            )
            .await
            .unwrap();

        assert_eq!(cache.get_route(a, b).await.unwrap(), None);
        assert!(cache.store().get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn sweep_removes_only_expired() {
        let (cache, clock) = cache();
        let (a, b, c) = (Point::new(1.0, 1.0), Point::new(2.0, 2.0), Point::new(3.0, 3.0));

        cache.put_route(a, b, &route()).await.unwrap();
        clock.advance(Duration::from_secs(45 * 60));
        cache.put_route(b, c, &route()).await.unwrap();
        cache
            .put_roads(&BoundingBox::around(a, b, 0.05), &[])
            .await
            .unwrap();
        clock.advance(Duration::from_secs(30 * 60));

        assert_eq!(cache.sweep_expired().await.unwrap(), 1);
        assert_eq!(cache.store().keys().await.unwrap().len(), 2);
        assert!(cache.get_route(a, b).await.unwrap().is_none());
        assert!(cache.get_route(b, c).await.unwrap().is_some());
    }
}
