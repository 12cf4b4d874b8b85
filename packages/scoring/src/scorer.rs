//! Contracts for the externally trained scorers.
//!
//! The safety regressor and the two outlier detectors are trained outside
//! this workspace. Inference only needs them to implement these traits;
//! any failure they report aborts the request rather than being replaced
//! by a made-up score.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tourist_safety_features_models::{FeatureVector, OutlierOutput};

/// Error reported by an external scorer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScorerError {
    /// The scorer has no model loaded.
    #[error("scorer {name} is not loaded")]
    NotLoaded {
        /// Scorer name.
        name: String,
    },

    /// The scorer failed while scoring.
    #[error("scorer {name} failed: {message}")]
    Failed {
        /// Scorer name.
        name: String,
        /// Description of what went wrong.
        message: String,
    },
}

/// A safety prediction and its confidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SafetyPrediction {
    /// Predicted safety score in `[0, 100]`.
    pub score: f64,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
}

/// Trained safety-score regressor.
pub trait SafetyScorer: Send + Sync {
    /// Predicts the safety score for one feature vector.
    ///
    /// # Errors
    ///
    /// Returns [`ScorerError`] if the model is unavailable or fails.
    fn predict(&self, features: &FeatureVector) -> Result<SafetyPrediction, ScorerError>;
}

/// Trained outlier detector. Lower decision scores are more anomalous.
pub trait OutlierScorer: Send + Sync {
    /// Continuous decision score.
    ///
    /// # Errors
    ///
    /// Returns [`ScorerError`] if the model is unavailable or fails.
    fn decision_score(&self, features: &OutlierFeatures) -> Result<f64, ScorerError>;

    /// Binary outlier verdict.
    ///
    /// # Errors
    ///
    /// Returns [`ScorerError`] if the model is unavailable or fails.
    fn is_outlier(&self, features: &OutlierFeatures) -> Result<bool, ScorerError>;

    /// Both outputs at once.
    ///
    /// # Errors
    ///
    /// Returns [`ScorerError`] if either call fails.
    fn score(&self, features: &OutlierFeatures) -> Result<OutlierOutput, ScorerError> {
        Ok(OutlierOutput {
            decision_score: self.decision_score(features)?,
            is_outlier: self.is_outlier(features)?,
        })
    }
}

/// Column names of [`OutlierFeatures::inputs`], in order.
pub const OUTLIER_INPUT_COLUMNS: [&str; 7] = [
    "distance_from_itinerary",
    "time_since_last_fix",
    "avg_speed_last_15min",
    "area_risk_score",
    "days_into_trip",
    "speed_variance",
    "location_consistency",
];

/// Inputs of the outlier detectors for one feature vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutlierFeatures {
    /// Meters to the nearest waypoint.
    pub distance_from_itinerary: f64,
    /// Seconds since the previous fix.
    pub time_since_last_fix: f64,
    /// Trailing mean speed.
    pub avg_speed_last_15min: f64,
    /// Area risk.
    pub area_risk_score: f64,
    /// Days since trip start.
    pub days_into_trip: i64,
    /// Sample standard deviation of the subject's trailing speeds across
    /// the batch; `0` with fewer than two vectors.
    pub speed_variance: f64,
    /// `1 / (1 + distance_from_itinerary)`.
    pub location_consistency: f64,
}

impl OutlierFeatures {
    /// Builds one entry per feature vector, computing `speed_variance` per
    /// subject over all of that subject's vectors in `features`.
    #[must_use]
    pub fn from_subject_features(features: &[FeatureVector]) -> Vec<Self> {
        let mut speeds: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
        for fv in features {
            speeds
                .entry(fv.subject_id.as_str())
                .or_default()
                .push(fv.avg_speed_last_15min);
        }
        let deviation: BTreeMap<&str, f64> = speeds
            .into_iter()
            .map(|(subject, values)| (subject, sample_std(&values)))
            .collect();

        features
            .iter()
            .map(|fv| Self {
                distance_from_itinerary: fv.distance_from_itinerary,
                time_since_last_fix: fv.time_since_last_fix,
                avg_speed_last_15min: fv.avg_speed_last_15min,
                area_risk_score: fv.area_risk_score,
                days_into_trip: fv.days_into_trip,
                speed_variance: deviation
                    .get(fv.subject_id.as_str())
                    .copied()
                    .unwrap_or(0.0),
                location_consistency: 1.0 / (1.0 + fv.distance_from_itinerary),
            })
            .collect()
    }

    /// Numeric inputs in [`OUTLIER_INPUT_COLUMNS`] order.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub const fn inputs(&self) -> [f64; 7] {
        [
            self.distance_from_itinerary,
            self.time_since_last_fix,
            self.avg_speed_last_15min,
            self.area_risk_score,
            self.days_into_trip as f64,
            self.speed_variance,
            self.location_consistency,
        ]
    }
}

#[allow(clippy::cast_precision_loss)]
fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    variance.sqrt()
}
