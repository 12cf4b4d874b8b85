//! Fusion of the rule pass with outlier-scorer verdicts.
//!
//! A lone outlier verdict raises at most a warning; it reaches critical
//! only together with at least one rule reason.

use tourist_safety_features_models::{Alert, FeatureVector, OutlierOutputs, ReasonCode, Severity};

use crate::rules::{AlertThresholds, RuleOutcome, evaluate_rules};

/// Minimum combined score of a critical alert.
pub const CRITICAL_SCORE_FLOOR: f64 = 0.9;
/// Minimum combined score of a warning.
pub const WARN_SCORE_FLOOR: f64 = 0.6;
/// Combined score of an informational alert with reasons.
pub const INFO_SCORE: f64 = 0.3;

/// Severity, reasons, and combined score produced by fusion.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedSeverity {
    /// Final severity.
    pub severity: Severity,
    /// Rule reasons, followed by [`ReasonCode::MlDetectedAnomaly`] if any
    /// scorer flagged an outlier.
    pub reasons: Vec<ReasonCode>,
    /// Combined score in `[0, 1]`.
    pub anomaly_score: f64,
}

impl FusedSeverity {
    /// Whether this counts as an anomaly (warning or worse).
    #[must_use]
    pub fn is_anomaly(&self) -> bool {
        self.severity >= Severity::Warn
    }
}

/// Applies the fusion table to a rule outcome and the scorer outputs.
#[must_use]
pub fn fuse(rules: RuleOutcome, outputs: &OutlierOutputs) -> FusedSeverity {
    let ml_anomaly = outputs.any_outlier();
    let mut reasons = rules.reasons;
    if ml_anomaly {
        reasons.push(ReasonCode::MlDetectedAnomaly);
    }

    let magnitude = outputs.min_decision_score().abs();
    let (severity, anomaly_score) =
        if rules.floor == Some(Severity::Critical) || (ml_anomaly && reasons.len() > 1) {
            (Severity::Critical, CRITICAL_SCORE_FLOOR.max(magnitude))
        } else if rules.floor == Some(Severity::Warn) || ml_anomaly {
            (Severity::Warn, WARN_SCORE_FLOOR.max(magnitude))
        } else if !reasons.is_empty() {
            (Severity::Info, INFO_SCORE)
        } else {
            (Severity::Info, 0.0)
        };

    FusedSeverity {
        severity,
        reasons,
        anomaly_score: anomaly_score.clamp(0.0, 1.0),
    }
}

/// Runs the rule pass and fusion for one feature vector.
#[must_use]
pub fn fuse_alert(
    features: &FeatureVector,
    outputs: OutlierOutputs,
    thresholds: &AlertThresholds,
) -> Alert {
    let fused = fuse(evaluate_rules(features, thresholds), &outputs);

    Alert {
        subject_id: features.subject_id.clone(),
        timestamp: features.timestamp,
        anomaly: fused.is_anomaly(),
        severity: fused.severity,
        reasons: fused.reasons,
        anomaly_score: fused.anomaly_score,
        ml_scores: outputs,
    }
}
