// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::cache::{CacheConfig, CacheStore, FileStore, MemoryStore, RouteCache};
use crate::heuristic::{HeuristicConfig, HeuristicModel, SharedAdjustments};
use crate::learning::{load_adjustments, LearningConfig, LearningFeedback};
use crate::Result;

/// State shared by all route computations of a [Router](crate::Router):
/// the route cache, the learned heuristic adjustments and the learning history.
///
/// Independent contexts never share any state.
#[derive(Debug)]
pub struct RoutingContext<S = MemoryStore> {
    cache: RouteCache<S>,
    adjustments: SharedAdjustments,
    heuristics: HeuristicModel,
    learning: Mutex<LearningFeedback>,
    learning_path: Option<PathBuf>,
}

impl RoutingContext<MemoryStore> {
    /// Creates a context with a non-persistent cache and default parameters.
    pub fn in_memory() -> Self {
        Self::new(RouteCache::new(MemoryStore::new(), CacheConfig::default()))
    }
}

impl RoutingContext<FileStore> {
    /// Creates a context with the cache persisted in `cache_path`. If `learning_path` is provided,
    /// adjustments are loaded from it, and [Router::maintain](crate::Router::maintain) writes them back.
    ///
    /// Fails with [Error::CacheUnavailable](crate::Error::CacheUnavailable) if the cache file
    /// can't be opened; unreadable learning files only produce a warning.
    pub async fn open<P: AsRef<Path>>(cache_path: P, learning_path: Option<PathBuf>) -> Result<Self> {
        let store = FileStore::open(cache_path).await?;
        let mut ctx = Self::new(RouteCache::new(store, CacheConfig::default()));
        if let Some(path) = learning_path {
            ctx = ctx.with_learning_file(path).await;
        }
        Ok(ctx)
    }
}

impl<S: CacheStore> RoutingContext<S> {
    pub fn new(cache: RouteCache<S>) -> Self {
        let adjustments = SharedAdjustments::default();
        Self {
            cache,
            heuristics: HeuristicModel::new(HeuristicConfig::default(), adjustments.clone()),
            learning: Mutex::new(LearningFeedback::new(LearningConfig::default(), adjustments.clone())),
            adjustments,
            learning_path: None,
        }
    }

    /// Replaces the static heuristic parameters.
    pub fn with_heuristics(mut self, config: HeuristicConfig) -> Self {
        self.heuristics = HeuristicModel::new(config, self.adjustments.clone());
        self
    }

    /// Replaces the learning parameters. Recorded samples are discarded.
    pub fn with_learning_config(mut self, config: LearningConfig) -> Self {
        self.learning = Mutex::new(LearningFeedback::new(config, self.adjustments.clone()));
        self
    }

    /// Loads adjustments from a JSON file (if it exists) and remembers the path
    /// for persisting them during maintenance.
    pub async fn with_learning_file(mut self, path: PathBuf) -> Self {
        match load_adjustments(&path).await {
            Ok(Some(adjustments)) => {
                log::debug!("loaded heuristic adjustments {:?} from {}", adjustments, path.display());
                self.adjustments.replace(adjustments);
            }
            Ok(None) => {}
            Err(e) => log::warn!("failed to load adjustments from {}: {}", path.display(), e),
        }

        self.learning_path = Some(path);
        self
    }

    pub fn cache(&self) -> &RouteCache<S> {
        &self.cache
    }

    pub fn adjustments(&self) -> &SharedAdjustments {
        &self.adjustments
    }

    pub fn heuristics(&self) -> &HeuristicModel {
        &self.heuristics
    }

    pub fn learning_path(&self) -> Option<&Path> {
        self.learning_path.as_deref()
    }

    /// Locks the learning state. The guard must not be held across `.await`.
    pub fn learning(&self) -> MutexGuard<'_, LearningFeedback> {
        self.learning.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heuristic::HeuristicAdjustments;
    use crate::learning::save_adjustments;

    #[test]
    fn contexts_are_isolated() {
        let a = RoutingContext::in_memory();
        let b = RoutingContext::in_memory();

        a.adjustments().replace(HeuristicAdjustments {
            area_penalty: 1.5,
            ..Default::default()
        });

        assert_eq!(a.heuristics().adjustments().area_penalty, 1.5);
        assert_eq!(a.learning().adjustments().area_penalty, 1.5);
        assert_eq!(b.heuristics().adjustments().area_penalty, 1.0);
    }

    #[tokio::test]
    async fn open_loads_learned_adjustments() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let learning = dir.path().join("learning.json");
        let saved = HeuristicAdjustments {
            area_penalty: 0.8,
            density_weight: 1.1,
            direction_weight: 1.2,
        };
        save_adjustments(&learning, &saved).await?;

        let ctx = RoutingContext::open(dir.path().join("cache.json"), Some(learning.clone())).await?;
        assert_eq!(ctx.adjustments().snapshot(), saved);
        assert_eq!(ctx.learning_path(), Some(learning.as_path()));
        Ok(())
    }

    #[tokio::test]
    async fn broken_learning_file_keeps_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let learning = dir.path().join("learning.json");
        tokio::fs::write(&learning, b"[1, 2").await?;

        let ctx = RoutingContext::in_memory().with_learning_file(learning).await;
        assert_eq!(ctx.adjustments().snapshot(), HeuristicAdjustments::default());
        assert!(ctx.learning_path().is_some());
        Ok(())
    }
}
