//! Synthetic safety labels for training data.
//!
//! The formula starts from a neutral-good base score and subtracts
//! penalties for each risk signal, then adds Gaussian noise. It only ever
//! labels synthetic data; live scores come from the trained scorer.

use rand::Rng;
use rand_distr::{Distribution as _, Normal};
use serde::{Deserialize, Serialize};
use tourist_safety_features_models::{FeatureVector, SafetyLabel, TimeOfDayBucket};

use crate::ScoringError;

/// Weights and thresholds of the label formula.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    /// Starting score. Default `75`.
    pub base_score: f64,
    /// Multiplier on area risk. Default `30`.
    pub area_risk_weight: f64,
    /// Meters per point of route-deviation penalty. Default `1000`.
    pub distance_per_point_m: f64,
    /// Cap on the route-deviation penalty. Default `20`.
    pub distance_penalty_cap: f64,
    /// Seconds per point of communication-gap penalty. Default `3600`.
    pub gap_per_point_s: f64,
    /// Cap on the communication-gap penalty. Default `25`.
    pub gap_penalty_cap: f64,
    /// Penalty per prior incident. Default `10`.
    pub prior_incident_penalty: f64,
    /// Penalty for the night bucket. Default `15`.
    pub night_penalty: f64,
    /// Penalty for the evening bucket. Default `5`.
    pub evening_penalty: f64,
    /// Ages below this are penalized. Default `25`.
    pub young_age_below: u8,
    /// Ages above this are penalized. Default `60`.
    pub senior_age_above: u8,
    /// Age penalty. Default `5`.
    pub age_penalty: f64,
    /// Penalty when trailing speed is zero. Default `10`.
    pub inactivity_penalty: f64,
    /// Trailing speed above which the vehicle bonus applies. Default `20`.
    pub vehicle_speed_above: f64,
    /// Bonus for vehicle-speed travel. Default `5`.
    pub vehicle_bonus: f64,
    /// Penalty inside a restricted zone. Default `20`.
    pub restricted_penalty: f64,
    /// Standard deviation of the additive noise. Default `5`.
    pub noise_std: f64,
    /// Scores below this may carry a near-term incident. Default `20`.
    pub incident_score_below: u8,
    /// Probability that a low score carries a near-term incident.
    /// Default `0.1`.
    pub incident_probability: f64,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            base_score: 75.0,
            area_risk_weight: 30.0,
            distance_per_point_m: 1000.0,
            distance_penalty_cap: 20.0,
            gap_per_point_s: 3600.0,
            gap_penalty_cap: 25.0,
            prior_incident_penalty: 10.0,
            night_penalty: 15.0,
            evening_penalty: 5.0,
            young_age_below: 25,
            senior_age_above: 60,
            age_penalty: 5.0,
            inactivity_penalty: 10.0,
            vehicle_speed_above: 20.0,
            vehicle_bonus: 5.0,
            restricted_penalty: 20.0,
            noise_std: 5.0,
            incident_score_below: 20,
            incident_probability: 0.1,
        }
    }
}

impl LabelConfig {
    /// Noise-free score before rounding, clamping, and the SOS override.
    #[must_use]
    pub fn raw_score(&self, features: &FeatureVector) -> f64 {
        let mut score = self.base_score;

        score -= features.area_risk_score * self.area_risk_weight;
        score -= (features.distance_from_itinerary / self.distance_per_point_m)
            .min(self.distance_penalty_cap);
        score -= (features.time_since_last_fix / self.gap_per_point_s).min(self.gap_penalty_cap);
        score -= f64::from(features.prior_incidents_count) * self.prior_incident_penalty;

        score -= match features.time_of_day_bucket {
            TimeOfDayBucket::Night => self.night_penalty,
            TimeOfDayBucket::Evening => self.evening_penalty,
            TimeOfDayBucket::Morning | TimeOfDayBucket::Afternoon => 0.0,
        };

        if features.age > self.senior_age_above || features.age < self.young_age_below {
            score -= self.age_penalty;
        }

        if features.avg_speed_last_15min <= 0.0 {
            score -= self.inactivity_penalty;
        } else if features.avg_speed_last_15min > self.vehicle_speed_above {
            score += self.vehicle_bonus;
        }

        if features.is_in_restricted_zone {
            score -= self.restricted_penalty;
        }

        score
    }

    fn validate(&self) -> Result<(), ScoringError> {
        if !(0.0..=1.0).contains(&self.incident_probability) {
            return Err(ScoringError::Config {
                message: format!(
                    "incident_probability must be in [0, 1], got {}",
                    self.incident_probability
                ),
            });
        }
        if !(self.distance_per_point_m > 0.0 && self.gap_per_point_s > 0.0) {
            return Err(ScoringError::Config {
                message: "distance_per_point_m and gap_per_point_s must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Final integer score: `0` when SOS is set, otherwise `raw` rounded half
/// away from zero and clamped to `[0, 100]`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn finalize_score(raw: f64, sos_flag: bool) -> u8 {
    if sos_flag {
        return 0;
    }
    raw.round().clamp(0.0, 100.0) as u8
}

/// Score for `features` with an explicit noise term.
#[must_use]
pub fn synthesize_score(features: &FeatureVector, config: &LabelConfig, noise: f64) -> u8 {
    finalize_score(config.raw_score(features) + noise, features.sos_flag)
}

/// Draws noisy labels from [`LabelConfig`].
#[derive(Debug, Clone)]
pub struct LabelSynthesizer {
    config: LabelConfig,
    noise: Normal<f64>,
}

impl LabelSynthesizer {
    /// Validates `config` and prepares the noise distribution.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::Config`] if the noise standard deviation,
    /// incident probability, or divisors are invalid.
    pub fn new(config: LabelConfig) -> Result<Self, ScoringError> {
        config.validate()?;
        let noise = Normal::new(0.0, config.noise_std).map_err(|e| ScoringError::Config {
            message: format!("invalid label noise_std {}: {e}", config.noise_std),
        })?;
        Ok(Self { config, noise })
    }

    /// The formula parameters.
    #[must_use]
    pub const fn config(&self) -> &LabelConfig {
        &self.config
    }

    /// Labels one feature vector.
    ///
    /// One noise value is always drawn. The incident coin is drawn only
    /// when the score is below the incident threshold.
    pub fn synthesize<R: Rng + ?Sized>(
        &self,
        features: &FeatureVector,
        rng: &mut R,
    ) -> SafetyLabel {
        let noise = self.noise.sample(rng);
        let score = synthesize_score(features, &self.config, noise);
        let incident_within_24h = score < self.config.incident_score_below
            && rng.gen_bool(self.config.incident_probability);

        SafetyLabel {
            subject_id: features.subject_id.clone(),
            timestamp: features.timestamp,
            safety_label: score,
            incident_within_24h,
        }
    }

    /// Labels every feature vector in order.
    pub fn synthesize_labels<R: Rng + ?Sized>(
        &self,
        features: &[FeatureVector],
        rng: &mut R,
    ) -> Vec<SafetyLabel> {
        features.iter().map(|f| self.synthesize(f, rng)).collect()
    }
}
