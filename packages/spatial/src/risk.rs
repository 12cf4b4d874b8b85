//! Area risk evaluation.
//!
//! Two evaluators share one capability, producing an [`AreaRisk`] for a
//! coordinate:
//!
//! * [`LiveRiskEvaluator`] scores a location from geofence membership
//!   alone and is fully deterministic. Used at inference time.
//! * [`SyntheticRiskEvaluator`] scores a location from the nearest named
//!   risk anchor plus Gaussian noise. Used only to generate training data.
//!
//! [`AreaRiskEvaluator`] wraps both so the mode is chosen once, at
//! configuration time, and never inferred at the call site.

use rand::Rng;
use rand_distr::{Distribution as _, Normal};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use tourist_safety_trajectory_models::Coordinate;

use crate::SpatialError;
use crate::distance::degree_distance;
use crate::zones::{ZoneIndex, ZoneKind};

/// Risk assessment for a single coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AreaRisk {
    /// Risk score in `[0, 1]`.
    pub risk_score: f64,
    /// Whether the coordinate lies inside any restricted zone.
    pub in_restricted_zone: bool,
}

/// A named location with an intrinsic risk level.
///
/// Doubles as an itinerary destination candidate during simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAnchor {
    /// Human-readable name (e.g. `"Mysuru Palace"`).
    pub name: String,
    /// Anchor location.
    pub coordinate: Coordinate,
    /// Intrinsic risk in `[0, 1]`.
    pub risk: f64,
}

/// Which evaluator variant is in use.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RiskMode {
    /// Geofence-based, deterministic.
    Live,
    /// Anchor-based with noise, for training labels.
    Synthetic,
}

/// Score composition for [`LiveRiskEvaluator`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveRiskConfig {
    /// Risk assigned to a location outside every zone. Default `0.2`.
    pub baseline: f64,
    /// Added when inside any high-risk zone. Default `0.5`.
    pub high_risk_increment: f64,
    /// Added when inside any restricted zone. Default `0.3`.
    pub restricted_increment: f64,
}

impl Default for LiveRiskConfig {
    fn default() -> Self {
        Self {
            baseline: 0.2,
            high_risk_increment: 0.5,
            restricted_increment: 0.3,
        }
    }
}

/// Parameters for [`SyntheticRiskEvaluator`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticRiskConfig {
    /// Standard deviation of the Gaussian noise added to anchor risk.
    /// Default `0.1`.
    pub noise_std: f64,
    /// Risk used when no anchors are configured. Default `0.3`.
    pub fallback_risk: f64,
}

impl Default for SyntheticRiskConfig {
    fn default() -> Self {
        Self {
            noise_std: 0.1,
            fallback_risk: 0.3,
        }
    }
}

/// Geofence-based risk scoring for live inference.
#[derive(Debug, Clone)]
pub struct LiveRiskEvaluator {
    zones: ZoneIndex,
    config: LiveRiskConfig,
}

impl LiveRiskEvaluator {
    /// Creates an evaluator over the given zones.
    #[must_use]
    pub const fn new(zones: ZoneIndex, config: LiveRiskConfig) -> Self {
        Self { zones, config }
    }

    /// Creates an evaluator over the embedded default zones.
    #[must_use]
    pub fn with_default_zones(config: LiveRiskConfig) -> Self {
        Self::new(crate::registry::default_zones(), config)
    }

    /// Baseline, plus the high-risk increment if inside any high-risk
    /// zone, plus the restricted increment if inside any restricted zone,
    /// clamped to `[0, 1]`.
    #[must_use]
    pub fn evaluate(&self, coordinate: &Coordinate) -> AreaRisk {
        let mut in_restricted_zone = false;
        let mut in_high_risk = false;
        for zone in self.zones.zones_containing(coordinate) {
            match zone.kind {
                ZoneKind::Restricted => in_restricted_zone = true,
                ZoneKind::HighRisk => in_high_risk = true,
            }
        }

        let mut risk = self.config.baseline;
        if in_high_risk {
            risk += self.config.high_risk_increment;
        }
        if in_restricted_zone {
            risk += self.config.restricted_increment;
        }

        AreaRisk {
            risk_score: risk.clamp(0.0, 1.0),
            in_restricted_zone,
        }
    }

    /// The zones this evaluator consults.
    #[must_use]
    pub const fn zones(&self) -> &ZoneIndex {
        &self.zones
    }
}

/// Nearest-anchor risk scoring for synthetic training data.
#[derive(Debug, Clone)]
pub struct SyntheticRiskEvaluator {
    anchors: Vec<RiskAnchor>,
    zones: ZoneIndex,
    config: SyntheticRiskConfig,
    noise: Normal<f64>,
}

impl SyntheticRiskEvaluator {
    /// Creates an evaluator from anchors and the restricted-zone index.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::Config`] if the noise standard deviation is
    /// negative or not finite, or an anchor risk lies outside `[0, 1]`.
    pub fn new(
        anchors: Vec<RiskAnchor>,
        zones: ZoneIndex,
        config: SyntheticRiskConfig,
    ) -> Result<Self, SpatialError> {
        if let Some(bad) = anchors.iter().find(|a| !(0.0..=1.0).contains(&a.risk)) {
            return Err(SpatialError::Config {
                message: format!("anchor {} has risk {} outside [0, 1]", bad.name, bad.risk),
            });
        }
        let noise = Normal::new(0.0, config.noise_std).map_err(|e| SpatialError::Config {
            message: format!("invalid risk noise_std {}: {e}", config.noise_std),
        })?;

        Ok(Self {
            anchors,
            zones,
            config,
            noise,
        })
    }

    /// The anchor closest to `coordinate` in degree space. Ties resolve to
    /// the earliest anchor in configuration order.
    #[must_use]
    pub fn nearest_anchor(&self, coordinate: &Coordinate) -> Option<&RiskAnchor> {
        let mut best: Option<(&RiskAnchor, f64)> = None;
        for anchor in &self.anchors {
            let d = degree_distance(coordinate, &anchor.coordinate);
            match best {
                Some((_, best_d)) if d >= best_d => {}
                _ => best = Some((anchor, d)),
            }
        }
        best.map(|(anchor, _)| anchor)
    }

    /// Nearest anchor's risk plus one Gaussian noise draw, clamped to
    /// `[0, 1]`. Exactly one value is drawn from `rng` per call.
    pub fn evaluate<R: Rng + ?Sized>(&self, coordinate: &Coordinate, rng: &mut R) -> AreaRisk {
        let base = self
            .nearest_anchor(coordinate)
            .map_or(self.config.fallback_risk, |a| a.risk);
        let risk = base + self.noise.sample(rng);

        AreaRisk {
            risk_score: risk.clamp(0.0, 1.0),
            in_restricted_zone: self.zones.contains(ZoneKind::Restricted, coordinate),
        }
    }

    /// The configured anchors.
    #[must_use]
    pub fn anchors(&self) -> &[RiskAnchor] {
        &self.anchors
    }
}

/// Area risk capability, with the evaluation mode fixed at construction.
#[derive(Debug, Clone)]
pub enum AreaRiskEvaluator {
    /// Geofence-based scoring.
    Live(LiveRiskEvaluator),
    /// Anchor-plus-noise scoring.
    Synthetic(SyntheticRiskEvaluator),
}

impl AreaRiskEvaluator {
    /// The mode this evaluator was configured with.
    #[must_use]
    pub const fn mode(&self) -> RiskMode {
        match self {
            Self::Live(_) => RiskMode::Live,
            Self::Synthetic(_) => RiskMode::Synthetic,
        }
    }

    /// Evaluates `coordinate`. The live variant never touches `rng`.
    pub fn evaluate<R: Rng + ?Sized>(&self, coordinate: &Coordinate, rng: &mut R) -> AreaRisk {
        match self {
            Self::Live(live) => live.evaluate(coordinate),
            Self::Synthetic(synthetic) => synthetic.evaluate(coordinate, rng),
        }
    }
}
