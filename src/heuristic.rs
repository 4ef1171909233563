// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Geographic heuristics shaping edge costs of synthetic graphs.
//!
//! Three functions make up the model:
//! - [HeuristicModel::area_penalty] - additive cost for passing through areas without roads
//!   (parks, lakes, reserves), described by [AvoidZones](AvoidZone);
//! - [HeuristicModel::density_weight] - multiplier depending on the distance from the urban
//!   center, as dense areas have more roads;
//! - [HeuristicModel::direction_weight] - multiplier penalizing sharp turns and preferring
//!   cardinal directions.
//!
//! Each is scaled by a learned multiplier from [HeuristicAdjustments],
//! which is only ever read here.

use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::{bearing, bearing_difference, earth_distance, Point};

/// Lower bound of every [HeuristicAdjustments] multiplier.
pub const MIN_ADJUSTMENT: f64 = 0.5;

/// Upper bound of every [HeuristicAdjustments] multiplier.
pub const MAX_ADJUSTMENT: f64 = 2.0;

/// Learned multipliers applied on top of the heuristic functions.
///
/// All values are kept within [MIN_ADJUSTMENT]..=[MAX_ADJUSTMENT].
/// Missing fields deserialize to the neutral value of 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicAdjustments {
    pub area_penalty: f64,
    pub density_weight: f64,
    pub direction_weight: f64,
}

impl Default for HeuristicAdjustments {
    fn default() -> Self {
        Self {
            area_penalty: 1.0,
            density_weight: 1.0,
            direction_weight: 1.0,
        }
    }
}

impl HeuristicAdjustments {
    /// Returns a copy with every multiplier clamped into the allowed range.
    /// Non-finite values are reset to 1.0.
    pub fn clamped(self) -> Self {
        fn clamp(x: f64) -> f64 {
            if x.is_finite() {
                x.clamp(MIN_ADJUSTMENT, MAX_ADJUSTMENT)
            } else {
                1.0
            }
        }

        Self {
            area_penalty: clamp(self.area_penalty),
            density_weight: clamp(self.density_weight),
            direction_weight: clamp(self.direction_weight),
        }
    }
}

/// Handle to [HeuristicAdjustments] shared between the [HeuristicModel] (readers)
/// and [LearningFeedback](crate::learning::LearningFeedback) (the only writer).
///
/// Readers always take a complete snapshot; writers replace the whole value at once,
/// so a reader never observes a partially applied update.
#[derive(Debug, Clone, Default)]
pub struct SharedAdjustments(Arc<RwLock<HeuristicAdjustments>>);

impl SharedAdjustments {
    pub fn new(adjustments: HeuristicAdjustments) -> Self {
        Self(Arc::new(RwLock::new(adjustments.clamped())))
    }

    /// Returns a copy of the current adjustments.
    pub fn snapshot(&self) -> HeuristicAdjustments {
        *self.0.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Atomically replaces the adjustments, clamping them first.
    pub(crate) fn replace(&self, adjustments: HeuristicAdjustments) {
        *self.0.write().unwrap_or_else(|e| e.into_inner()) = adjustments.clamped();
    }
}

/// Kind of an [AvoidZone]. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneKind {
    Park,
    Lake,
    Reserve,
    Rural,
}

/// A circular area without roads which routes should go around.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvoidZone {
    pub name: String,
    pub kind: ZoneKind,
    pub center: Point,

    /// Radius of the zone, in kilometers.
    pub radius: f64,

    /// Penalty applied at the very center of the zone.
    /// It falls off quadratically to zero at the zone boundary.
    pub penalty: f64,
}

impl AvoidZone {
    pub fn new(name: &str, kind: ZoneKind, lat: f64, lon: f64, radius: f64, penalty: f64) -> Self {
        Self {
            name: name.to_string(),
            kind,
            center: Point::new(lat, lon),
            radius,
            penalty,
        }
    }
}

/// Known areas without roads in the Brasília (DF) region.
pub fn default_zones() -> Vec<AvoidZone> {
    use ZoneKind::*;
    vec![
        AvoidZone::new("Parque da Cidade", Park, -15.80, -47.90, 0.015, 10.0),
        AvoidZone::new("Parque Olhos d'Água", Park, -15.78, -47.88, 0.008, 8.0),
        AvoidZone::new("Parque Nacional de Brasília", Park, -15.82, -47.92, 0.010, 12.0),
        AvoidZone::new("Parque do Bosque", Park, -15.79, -47.87, 0.006, 6.0),
        AvoidZone::new("Parque Águas Claras", Park, -15.83, -47.91, 0.007, 7.0),
        AvoidZone::new("Parque Ecológico do Guará", Park, -15.76, -47.89, 0.005, 5.0),
        AvoidZone::new("Lago Paranoá (Norte)", Lake, -15.85, -47.95, 0.020, 15.0),
        AvoidZone::new("Lago Paranoá (Sul)", Lake, -15.87, -47.93, 0.018, 15.0),
        AvoidZone::new("Lago Paranoá (Oeste)", Lake, -15.84, -47.97, 0.012, 15.0),
        AvoidZone::new("Reserva Ecológica", Reserve, -15.88, -47.90, 0.010, 12.0),
        AvoidZone::new("Parque Ecológico Águas Claras", Park, -15.75, -47.85, 0.008, 8.0),
        AvoidZone::new("Área Rural (Noroeste)", Rural, -15.70, -47.80, 0.015, 5.0),
        AvoidZone::new("Área Rural (Sudoeste)", Rural, -15.90, -48.00, 0.012, 5.0),
    ]
}

/// Static parameters of the [HeuristicModel].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeuristicConfig {
    pub zones: Vec<AvoidZone>,

    /// Reference point for urban density.
    pub density_center: Point,

    /// Distance from [HeuristicConfig::density_center] (km) within which
    /// [HeuristicConfig::urban_weight] applies.
    pub urban_radius: f64,

    /// Distance from [HeuristicConfig::density_center] (km) within which
    /// [HeuristicConfig::suburban_weight] applies. Beyond, [HeuristicConfig::rural_weight] applies.
    pub suburban_radius: f64,

    pub urban_weight: f64,
    pub suburban_weight: f64,
    pub rural_weight: f64,

    /// Turns sharper than this (degrees) are penalized.
    pub sharp_turn: f64,

    /// Turn angle (degrees) at which the sharp turn penalty reaches its maximum.
    pub max_turn: f64,

    /// Maximum relative increase of weight for sharp turns.
    pub max_turn_penalty: f64,

    /// Headings closer than this (degrees) to N, E, S or W are considered cardinal.
    pub cardinal_tolerance: f64,

    /// Weight multiplier for cardinal headings.
    pub cardinal_weight: f64,
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            zones: default_zones(),
            density_center: Point::new(-15.7942, -47.8822),
            urban_radius: 10.0,
            suburban_radius: 20.0,
            urban_weight: 0.8,
            suburban_weight: 1.0,
            rural_weight: 1.3,
            sharp_turn: 45.0,
            max_turn: 90.0,
            max_turn_penalty: 0.5,
            cardinal_tolerance: 10.0,
            cardinal_weight: 0.9,
        }
    }
}

/// Geographic cost shaping functions, see the [module documentation](self).
#[derive(Debug, Clone)]
pub struct HeuristicModel {
    config: HeuristicConfig,
    adjustments: SharedAdjustments,
}

impl HeuristicModel {
    pub fn new(config: HeuristicConfig, adjustments: SharedAdjustments) -> Self {
        Self {
            config,
            adjustments,
        }
    }

    pub fn config(&self) -> &HeuristicConfig {
        &self.config
    }

    pub fn adjustments(&self) -> HeuristicAdjustments {
        self.adjustments.snapshot()
    }

    /// Returns the penalty for being at the given position. Every [AvoidZone]
    /// containing the position contributes `(1 - dist/radius)² × penalty × multiplier`.
    /// Returns zero outside of all zones.
    pub fn area_penalty(&self, p: Point) -> f64 {
        let multiplier = self.adjustments.snapshot().area_penalty;

        self.config
            .zones
            .iter()
            .filter_map(|zone| {
                let dist = earth_distance(p, zone.center);
                if dist < zone.radius {
                    let factor = 1.0 - dist / zone.radius;
                    Some(factor * factor * zone.penalty * multiplier)
                } else {
                    None
                }
            })
            .sum()
    }

    /// Returns the cost multiplier for traveling from the given position,
    /// lower in the dense city center and higher in rural areas.
    pub fn density_weight(&self, p: Point) -> f64 {
        let dist = earth_distance(p, self.config.density_center);

        let base = if dist < self.config.urban_radius {
            self.config.urban_weight
        } else if dist < self.config.suburban_radius {
            self.config.suburban_weight
        } else {
            self.config.rural_weight
        };

        base * self.adjustments.snapshot().density_weight
    }

    /// Returns the cost multiplier for turning at `cur` when traveling from `prev` to `next`.
    ///
    /// Turns sharper than [HeuristicConfig::sharp_turn] increase the weight linearly,
    /// up to [HeuristicConfig::max_turn_penalty] at [HeuristicConfig::max_turn]. Gentle turns
    /// which leave `cur` close to a cardinal heading get [HeuristicConfig::cardinal_weight].
    ///
    /// Returns 1.0 if any of the positions is missing (at route ends).
    pub fn direction_weight(
        &self,
        prev: Option<Point>,
        cur: Option<Point>,
        next: Option<Point>,
    ) -> f64 {
        let (prev, cur, next) = match (prev, cur, next) {
            (Some(prev), Some(cur), Some(next)) => (prev, cur, next),
            _ => return 1.0,
        };

        let incoming = bearing(prev, cur);
        let outgoing = bearing(cur, next);
        let turn = bearing_difference(incoming, outgoing);

        let base = if turn > self.config.sharp_turn {
            let span = self.config.max_turn - self.config.sharp_turn;
            let excess = ((turn - self.config.sharp_turn) / span).min(1.0);
            1.0 + excess * self.config.max_turn_penalty
        } else {
            let to_cardinal = [0.0, 90.0, 180.0, 270.0]
                .iter()
                .map(|&dir| bearing_difference(outgoing, dir))
                .fold(f64::INFINITY, f64::min);

            if to_cardinal < self.config.cardinal_tolerance {
                self.config.cardinal_weight
            } else {
                1.0
            }
        };

        base * self.adjustments.snapshot().direction_weight
    }

    /// Cost of an edge from `from` to `to`: the distance scaled by the density weight
    /// of `from`, plus the area penalty of `from`, all scaled by the direction weight
    /// if the waypoint preceding `from` is known.
    pub fn edge_cost(&self, prev: Option<Point>, from: Point, to: Point) -> f64 {
        let cost = earth_distance(from, to) * self.density_weight(from) + self.area_penalty(from);
        match prev {
            Some(prev) => cost * self.direction_weight(Some(prev), Some(from), Some(to)),
            None => cost,
        }
    }

    /// Estimated remaining cost from `from` to `goal`, shaped by the same density and
    /// area terms as [HeuristicModel::edge_cost]. Not admissible - it may overestimate.
    pub fn estimate(&self, from: Point, goal: Point) -> f64 {
        earth_distance(from, goal) * self.density_weight(from) + self.area_penalty(from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! assert_almost_eq {
        ($a:expr, $b:expr) => {
            assert!(
                (($a - $b).abs() < 1e-6),
                "assertion failed: {} ≈ {}",
                $a,
                $b
            )
        };
    }

    fn model() -> HeuristicModel {
        HeuristicModel::new(HeuristicConfig::default(), SharedAdjustments::default())
    }

    #[test]
    fn area_penalty_at_zone_center_is_full() {
        let m = model();
        let zone = &m.config().zones[0];
        assert_almost_eq!(m.area_penalty(zone.center), zone.penalty);
    }

    #[test]
    fn area_penalty_at_zone_boundary_is_zero() {
        let m = model();
        let zone = m.config().zones[0].clone();
        // Move north by exactly the zone radius
        let boundary = Point::new(zone.center.lat + zone.radius / 111.19492664455873, zone.center.lon);
        assert!(m.area_penalty(boundary) < 1e-3);
    }

    #[test]
    fn area_penalty_outside_zones_is_zero() {
        assert_eq!(model().area_penalty(Point::new(0.0, 0.0)), 0.0);
    }

    #[test]
    fn area_penalty_scales_with_adjustment() {
        let adjustments = SharedAdjustments::default();
        let m = HeuristicModel::new(HeuristicConfig::default(), adjustments.clone());
        let zone = m.config().zones[0].clone();

        adjustments.replace(HeuristicAdjustments {
            area_penalty: 1.5,
            ..Default::default()
        });
        assert_almost_eq!(m.area_penalty(zone.center), zone.penalty * 1.5);
    }

    #[test]
    fn density_weight_bands() {
        let m = model();
        let center = m.config().density_center;
        assert_almost_eq!(m.density_weight(center), 0.8);
        // ~15 km north
        assert_almost_eq!(m.density_weight(Point::new(center.lat + 0.135, center.lon)), 1.0);
        // ~33 km north
        assert_almost_eq!(m.density_weight(Point::new(center.lat + 0.3, center.lon)), 1.3);
    }

    #[test]
    fn direction_weight_missing_points() {
        let m = model();
        let p = Some(Point::new(0.0, 0.0));
        assert_eq!(m.direction_weight(None, p, p), 1.0);
        assert_eq!(m.direction_weight(p, None, p), 1.0);
        assert_eq!(m.direction_weight(p, p, None), 1.0);
    }

    #[test]
    fn direction_weight_straight_cardinal() {
        let m = model();
        let w = m.direction_weight(
            Some(Point::new(0.0, 0.0)),
            Some(Point::new(0.01, 0.0)),
            Some(Point::new(0.02, 0.0)),
        );
        assert_almost_eq!(w, 0.9);
    }

    #[test]
    fn direction_weight_straight_diagonal() {
        let m = model();
        let w = m.direction_weight(
            Some(Point::new(0.0, 0.0)),
            Some(Point::new(0.01, 0.01)),
            Some(Point::new(0.02, 0.02)),
        );
        assert_almost_eq!(w, 1.0);
    }

    #[test]
    fn direction_weight_sharp_turns() {
        let m = model();
        let o = Some(Point::new(0.0, 0.0));
        let north = Some(Point::new(0.01, 0.0));

        // 90° turn: maximum penalty
        let right = m.direction_weight(o, north, Some(Point::new(0.01, 0.01)));
        assert_almost_eq!(right, 1.5);

        // U-turn is capped at the same maximum
        let back = m.direction_weight(o, north, Some(Point::new(0.0, 0.0)));
        assert_almost_eq!(back, 1.5);

        // 67.5° turn: half of the penalty
        let heading = 67.5_f64.to_radians();
        let mid = m.direction_weight(
            o,
            north,
            Some(Point::new(0.01 + 0.01 * heading.cos(), 0.01 * heading.sin())),
        );
        assert_almost_eq!(mid, 1.25);
    }

    #[test]
    fn adjustments_clamp() {
        let a = HeuristicAdjustments {
            area_penalty: 5.0,
            density_weight: 0.1,
            direction_weight: f64::NAN,
        }
        .clamped();
        assert_eq!(a.area_penalty, MAX_ADJUSTMENT);
        assert_eq!(a.density_weight, MIN_ADJUSTMENT);
        assert_eq!(a.direction_weight, 1.0);
    }

    #[test]
    fn adjustments_deserialize_over_defaults() {
        let a: HeuristicAdjustments = serde_json::from_str(r#"{"area_penalty": 1.2}"#).unwrap();
        assert_eq!(a.area_penalty, 1.2);
        assert_eq!(a.density_weight, 1.0);
        assert_eq!(a.direction_weight, 1.0);
    }
}
