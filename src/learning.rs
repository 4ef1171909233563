// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Calibration of [heuristic multipliers](HeuristicAdjustments) against routes
//! observed from real routing providers.
//!
//! Routes estimated by the [Router](crate::Router) are recorded as predicted samples,
//! routes supplied through [Router::record_observed_route](crate::Router::record_observed_route)
//! as observed samples. [LearningFeedback::batch_reconcile] pairs samples with matching endpoints
//! and nudges the multipliers towards making predictions as long as the observed routes.

use std::collections::VecDeque;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cache::{Clock, SystemClock};
use crate::heuristic::{HeuristicAdjustments, SharedAdjustments};
use crate::{earth_distance, route_length, Point, Result};

/// Thresholds and step sizes of [LearningFeedback].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    /// Number of most recent predicted and observed samples kept (each).
    pub capacity: usize,

    /// Multipliers are only adjusted if the relative difference of route lengths exceeds this.
    pub length_ratio_threshold: f64,

    /// Relative length error above which predictions are considered too long
    /// (and below the negation of which - too short).
    pub error_threshold: f64,

    /// Trajectories less similar than this increase the direction multiplier.
    pub similarity_threshold: f64,

    /// Maximum deviation (km) at which trajectories are considered completely different.
    pub reference_deviation: f64,

    /// Relative step of the area penalty multiplier.
    pub area_step: f64,

    /// Relative step of the density weight multiplier.
    pub density_step: f64,

    /// Relative step of the direction weight multiplier.
    pub direction_step: f64,

    /// Samples are paired if both their origins and destinations are closer than this (km).
    pub match_radius: f64,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            length_ratio_threshold: 0.2,
            error_threshold: 0.1,
            similarity_threshold: 0.5,
            reference_deviation: 5.0,
            area_step: 0.05,
            density_step: 0.02,
            direction_step: 0.05,
            match_radius: 0.5,
        }
    }
}

/// A recorded route together with the endpoints it was requested for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningSample {
    pub points: Vec<Point>,
    pub origin: Point,
    pub destination: Point,

    /// Milliseconds since the Unix epoch.
    pub recorded_at: u64,
}

impl LearningSample {
    fn matches(&self, other: &LearningSample, radius: f64) -> bool {
        earth_distance(self.origin, other.origin) < radius
            && earth_distance(self.destination, other.destination) < radius
    }
}

/// Outcome of [LearningFeedback::compare_and_adjust].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Comparison {
    /// `|predicted - observed| / observed` of route lengths.
    pub length_ratio: f64,

    /// See [trajectory_similarity].
    pub similarity: f64,

    /// Adjustments after the comparison.
    pub adjustments: HeuristicAdjustments,
}

/// Returns how closely `predicted` follows `observed`, within `[0, 1]`.
///
/// For every predicted point the distance to the closest observed point is taken;
/// the largest of those (a one-sided Hausdorff distance) is mapped linearly so that
/// 0 km gives 1 and `reference_deviation` km or more gives 0.
pub fn trajectory_similarity(predicted: &[Point], observed: &[Point], reference_deviation: f64) -> f64 {
    let max_deviation = predicted
        .iter()
        .map(|&p| {
            observed
                .iter()
                .map(|&o| earth_distance(p, o))
                .fold(f64::INFINITY, f64::min)
        })
        .fold(0.0, f64::max);

    (1.0 - max_deviation / reference_deviation).max(0.0)
}

/// Bounded history of predicted and observed routes, and the only writer
/// of the [SharedAdjustments].
pub struct LearningFeedback {
    config: LearningConfig,
    adjustments: SharedAdjustments,
    predicted: VecDeque<LearningSample>,
    observed: VecDeque<LearningSample>,
    clock: Box<dyn Clock>,
}

impl std::fmt::Debug for LearningFeedback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LearningFeedback")
            .field("config", &self.config)
            .field("adjustments", &self.adjustments.snapshot())
            .field("predicted", &self.predicted.len())
            .field("observed", &self.observed.len())
            .finish()
    }
}

impl LearningFeedback {
    pub fn new(config: LearningConfig, adjustments: SharedAdjustments) -> Self {
        Self {
            config,
            adjustments,
            predicted: VecDeque::with_capacity(config.capacity),
            observed: VecDeque::with_capacity(config.capacity),
            clock: Box::new(SystemClock),
        }
    }

    pub fn config(&self) -> &LearningConfig {
        &self.config
    }

    pub fn adjustments(&self) -> HeuristicAdjustments {
        self.adjustments.snapshot()
    }

    pub fn predicted(&self) -> impl ExactSizeIterator<Item = &LearningSample> + '_ {
        self.predicted.iter()
    }

    pub fn observed(&self) -> impl ExactSizeIterator<Item = &LearningSample> + '_ {
        self.observed.iter()
    }

    fn sample(&self, points: &[Point], origin: Point, destination: Point) -> LearningSample {
        LearningSample {
            points: points.to_vec(),
            origin,
            destination,
            recorded_at: self.clock.now_ms(),
        }
    }

    /// Remembers a route estimated by the router. Routes with less than 2 points are ignored.
    pub fn record_predicted(&mut self, points: &[Point], origin: Point, destination: Point) {
        if points.len() >= 2 {
            let sample = self.sample(points, origin, destination);
            push_bounded(&mut self.predicted, self.config.capacity, sample);
        }
    }

    /// Remembers a route calculated by a real routing provider.
    /// Routes with less than 2 points are ignored.
    pub fn record_observed(&mut self, points: &[Point], origin: Point, destination: Point) {
        if points.len() >= 2 {
            let sample = self.sample(points, origin, destination);
            push_bounded(&mut self.observed, self.config.capacity, sample);
        }
    }

    /// Compares a predicted route with the observed one and adjusts the multipliers.
    ///
    /// Nothing changes unless route lengths differ by more than
    /// [LearningConfig::length_ratio_threshold]. In that case the area penalty and density
    /// weight multipliers are decreased (prediction too long) or increased (prediction too short),
    /// and if trajectories are also less similar than [LearningConfig::similarity_threshold],
    /// the direction weight multiplier is increased.
    ///
    /// Returns None if either route has less than 2 points or the observed route has no length.
    pub fn compare_and_adjust(&mut self, predicted: &[Point], observed: &[Point]) -> Option<Comparison> {
        if predicted.len() < 2 || observed.len() < 2 {
            return None;
        }

        let predicted_length = route_length(predicted);
        let observed_length = route_length(observed);
        if observed_length <= 0.0 {
            return None;
        }

        let c = &self.config;
        let error = (predicted_length - observed_length) / observed_length;
        let length_ratio = error.abs();
        let similarity = trajectory_similarity(predicted, observed, c.reference_deviation);

        let mut a = self.adjustments.snapshot();
        let before = a;

        // Predictions of about the right length are left alone, however they are shaped
        if length_ratio > c.length_ratio_threshold {
            if error > c.error_threshold {
                a.area_penalty *= 1.0 - c.area_step;
                a.density_weight *= 1.0 - c.density_step;
            } else if error < -c.error_threshold {
                a.area_penalty *= 1.0 + c.area_step;
                a.density_weight *= 1.0 + c.density_step;
            }

            if similarity < c.similarity_threshold {
                a.direction_weight *= 1.0 + c.direction_step;
            }
        }

        let a = a.clamped();
        if a != before {
            self.adjustments.replace(a);
        }

        log::debug!(
            "learning: length difference {:.1}%, similarity {:.1}%",
            length_ratio * 100.0,
            similarity * 100.0
        );

        Some(Comparison {
            length_ratio,
            similarity,
            adjustments: a,
        })
    }

    /// Compares every observed sample with every predicted sample
    /// with matching endpoints (see [LearningConfig::match_radius]).
    ///
    /// Observed samples which found a match are consumed, so that repeated
    /// reconciliation doesn't learn from the same observation twice.
    /// Returns the number of compared pairs.
    pub fn batch_reconcile(&mut self) -> usize {
        if self.observed.is_empty() || self.predicted.is_empty() {
            return 0;
        }

        let radius = self.config.match_radius;
        let observed = std::mem::take(&mut self.observed);
        let predicted = std::mem::take(&mut self.predicted);
        let mut compared = 0;

        for o in observed {
            let mut matched = false;
            for p in predicted.iter().filter(|p| p.matches(&o, radius)) {
                self.compare_and_adjust(&p.points, &o.points);
                compared += 1;
                matched = true;
            }

            if !matched {
                self.observed.push_back(o);
            }
        }

        self.predicted = predicted;

        if compared > 0 {
            log::info!(
                "reconciled {} route pairs, adjustments now {:?}",
                compared,
                self.adjustments.snapshot()
            );
        }
        compared
    }
}

fn push_bounded(samples: &mut VecDeque<LearningSample>, capacity: usize, sample: LearningSample) {
    if capacity == 0 {
        return;
    }
    while samples.len() >= capacity {
        samples.pop_front();
    }
    samples.push_back(sample);
}

/// Writes adjustments to a JSON file.
pub async fn save_adjustments<P: AsRef<Path>>(path: P, adjustments: &HeuristicAdjustments) -> Result<()> {
    let content = serde_json::to_vec_pretty(adjustments)?;
    tokio::fs::write(path, content).await?;
    Ok(())
}

/// Reads adjustments from a JSON file. Missing fields keep their default value of 1.0,
/// and all values are clamped into the allowed range. Returns None if the file doesn't exist.
pub async fn load_adjustments<P: AsRef<Path>>(path: P) -> Result<Option<HeuristicAdjustments>> {
    let content = match tokio::fs::read(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let adjustments: HeuristicAdjustments = serde_json::from_slice(&content)?;
    Ok(Some(adjustments.clamped()))
}
