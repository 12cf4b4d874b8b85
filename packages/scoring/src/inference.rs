//! Batch scoring of live location reports.
//!
//! Each raw record is parsed on its own, so one malformed record is
//! rejected without affecting the rest. Scorer failures are different:
//! they abort the whole batch, since a safety score is never substituted.

use serde::{Deserialize, Serialize};
use tourist_safety_features::InferenceRecord;
use tourist_safety_features_models::{FeatureVector, OutlierOutputs, SafetyAssessment, SafetyBand};
use tourist_safety_spatial::LiveRiskEvaluator;

use crate::ScoringError;
use crate::explain::explain;
use crate::fusion::fuse_alert;
use crate::rules::AlertThresholds;
use crate::scorer::{OutlierFeatures, OutlierScorer, SafetyScorer};

/// A record that could not be scored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordRejection {
    /// Position of the record in the submitted batch.
    pub index: usize,
    /// Why it was rejected.
    pub reason: String,
}

/// Results of a batch: one assessment per accepted record, in submission
/// order, plus the rejected records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchOutcome {
    /// Scored records.
    pub results: Vec<SafetyAssessment>,
    /// Records that failed to parse or validate.
    pub rejected: Vec<RecordRejection>,
}

/// Scores live records with the external scorers.
pub struct InferenceEngine {
    safety: Box<dyn SafetyScorer>,
    primary: Box<dyn OutlierScorer>,
    secondary: Box<dyn OutlierScorer>,
    evaluator: LiveRiskEvaluator,
    thresholds: AlertThresholds,
}

impl std::fmt::Debug for InferenceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceEngine")
            .field("evaluator", &self.evaluator)
            .field("thresholds", &self.thresholds)
            .finish_non_exhaustive()
    }
}

impl InferenceEngine {
    /// Creates an engine from the three scorers and the live evaluator.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::Config`] if `thresholds` are invalid.
    pub fn new(
        safety: Box<dyn SafetyScorer>,
        primary: Box<dyn OutlierScorer>,
        secondary: Box<dyn OutlierScorer>,
        evaluator: LiveRiskEvaluator,
        thresholds: AlertThresholds,
    ) -> Result<Self, ScoringError> {
        thresholds.validate()?;
        Ok(Self {
            safety,
            primary,
            secondary,
            evaluator,
            thresholds,
        })
    }

    /// Parses, scores, explains, and fuses every record.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::Scorer`] if any scorer call fails; the
    /// whole batch is then discarded.
    pub fn score_batch(&self, records: &[serde_json::Value]) -> Result<BatchOutcome, ScoringError> {
        let mut accepted: Vec<FeatureVector> = Vec::with_capacity(records.len());
        let mut rejected = Vec::new();

        for (index, raw) in records.iter().enumerate() {
            let parsed = InferenceRecord::from_value(raw.clone())
                .and_then(|record| record.to_features(&self.evaluator));
            match parsed {
                Ok(features) => accepted.push(features),
                Err(e) => {
                    log::warn!("Rejecting record {index}: {e}");
                    rejected.push(RecordRejection {
                        index,
                        reason: e.to_string(),
                    });
                }
            }
        }

        let outlier_inputs = OutlierFeatures::from_subject_features(&accepted);
        let results = accepted
            .iter()
            .zip(&outlier_inputs)
            .map(|(features, outlier)| self.assess(features, outlier))
            .collect::<Result<Vec<_>, _>>()?;

        log::debug!(
            "Scored {} records, rejected {}",
            results.len(),
            rejected.len()
        );

        Ok(BatchOutcome { results, rejected })
    }

    /// Scores one already-derived feature vector.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::Scorer`] if any scorer call fails.
    pub fn assess(
        &self,
        features: &FeatureVector,
        outlier: &OutlierFeatures,
    ) -> Result<SafetyAssessment, ScoringError> {
        let prediction = self.safety.predict(features)?;
        let outputs = OutlierOutputs {
            primary: self.primary.score(outlier)?,
            secondary: self.secondary.score(outlier)?,
        };

        Ok(SafetyAssessment {
            subject_id: features.subject_id.clone(),
            timestamp: features.timestamp,
            predicted_safety: prediction.score,
            confidence: prediction.confidence,
            safety_band: SafetyBand::from_score(prediction.score),
            explanations: explain(features),
            alert: fuse_alert(features, outputs, &self.thresholds),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tourist_safety_features_models::{FeatureVector, ReasonCode, Severity};
    use tourist_safety_spatial::{LiveRiskConfig, registry};

    use crate::scorer::{SafetyPrediction, ScorerError};

    struct FixedSafety(f64);

    impl SafetyScorer for FixedSafety {
        fn predict(&self, _: &FeatureVector) -> Result<SafetyPrediction, ScorerError> {
            Ok(SafetyPrediction {
                score: self.0,
                confidence: 0.8,
            })
        }
    }

    struct FixedOutlier {
        score: f64,
        outlier: bool,
    }

    impl OutlierScorer for FixedOutlier {
        fn decision_score(&self, _: &OutlierFeatures) -> Result<f64, ScorerError> {
            Ok(self.score)
        }

        fn is_outlier(&self, _: &OutlierFeatures) -> Result<bool, ScorerError> {
            Ok(self.outlier)
        }
    }

    struct Unloaded;

    impl SafetyScorer for Unloaded {
        fn predict(&self, _: &FeatureVector) -> Result<SafetyPrediction, ScorerError> {
            Err(ScorerError::NotLoaded {
                name: "safety".to_string(),
            })
        }
    }

    fn engine(safety: Box<dyn SafetyScorer>, primary_outlier: bool) -> InferenceEngine {
        InferenceEngine::new(
            safety,
            Box::new(FixedOutlier {
                score: if primary_outlier { -0.2 } else { 0.1 },
                outlier: primary_outlier,
            }),
            Box::new(FixedOutlier {
                score: 0.05,
                outlier: false,
            }),
            LiveRiskEvaluator::new(registry::default_zones(), LiveRiskConfig::default()),
            AlertThresholds::default(),
        )
        .unwrap()
    }

    fn record(id: &str, extra: &serde_json::Value) -> serde_json::Value {
        let mut value = json!({
            "tourist_id": id,
            "timestamp": "2024-06-01T10:00:00Z",
            "latitude": 12.3051,
            "longitude": 76.6551,
            "avg_speed_last_15min": 1.5
        });
        if let (Some(base), Some(extra)) = (value.as_object_mut(), extra.as_object()) {
            for (k, v) in extra {
                base.insert(k.clone(), v.clone());
            }
        }
        value
    }

    #[test]
    fn malformed_record_fails_alone() {
        let records = vec![
            record("a", &json!({})),
            json!({ "tourist_id": "b", "timestamp": "2024-06-01T10:00:00Z" }),
            record("c", &json!({ "latitude": 123.0 })),
            record("d", &json!({ "timestamp": "not a time" })),
            record("e", &json!({ "time_since_last_fix": 4000.0 })),
        ];
        let outcome = engine(Box::new(FixedSafety(82.0)), false)
            .score_batch(&records)
            .unwrap();

        assert_eq!(outcome.results.len(), 2);
        assert_eq!(
            outcome.rejected.iter().map(|r| r.index).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );

        let first = &outcome.results[0];
        assert_eq!(first.subject_id, "a");
        assert_eq!(first.safety_band, SafetyBand::High);
        assert_eq!(first.alert.severity, Severity::Info);
        assert!(!first.alert.anomaly);

        let gap = &outcome.results[1];
        assert_eq!(gap.alert.severity, Severity::Critical);
        assert_eq!(gap.alert.reasons, vec![ReasonCode::CommunicationLoss]);
        assert!(
            gap.explanations
                .factors
                .contains(&tourist_safety_features_models::RiskFactor::StaleGpsSignal)
        );
    }

    #[test]
    fn lone_outlier_verdict_warns() {
        let outcome = engine(Box::new(FixedSafety(60.0)), true)
            .score_batch(&[record("a", &json!({}))])
            .unwrap();
        let result = &outcome.results[0];
        assert_eq!(result.safety_band, SafetyBand::Medium);
        assert_eq!(result.alert.severity, Severity::Warn);
        assert_eq!(result.alert.reasons, vec![ReasonCode::MlDetectedAnomaly]);
    }

    #[test]
    fn scorer_failure_fails_batch() {
        let result = engine(Box::new(Unloaded), false).score_batch(&[record("a", &json!({}))]);
        assert!(matches!(result, Err(ScoringError::Scorer(_))));
    }

    #[test]
    fn empty_batch_is_empty() {
        let outcome = engine(Box::new(Unloaded), false).score_batch(&[]).unwrap();
        assert!(outcome.results.is_empty());
        assert!(outcome.rejected.is_empty());
    }
}
