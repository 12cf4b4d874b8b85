//! Rule-based anomaly checks.
//!
//! Each rule is independent of the others: it looks at one or two feature
//! values, and when it fires it records a reason and proposes a severity
//! floor. The overall floor is the highest proposed by any rule, so rule
//! order only affects the order of reasons.

use serde::{Deserialize, Serialize};
use tourist_safety_features_models::{FeatureVector, ReasonCode, Severity};

use crate::ScoringError;

/// Thresholds for the rule pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertThresholds {
    /// Route deviation fires above this distance in meters. Default `500`.
    pub route_deviation_m: f64,
    /// Communication loss fires above this gap in seconds. Default `1800`.
    pub communication_loss_s: f64,
    /// Communication loss is critical above this gap in seconds.
    /// Default `3600`.
    pub communication_critical_s: f64,
    /// High-risk area fires above this risk. Default `0.7`.
    pub high_risk_area: f64,
    /// Night travel fires above this risk at night. Default `0.4`.
    pub night_risky_area: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            route_deviation_m: 500.0,
            communication_loss_s: 1800.0,
            communication_critical_s: 3600.0,
            high_risk_area: 0.7,
            night_risky_area: 0.4,
        }
    }
}

impl AlertThresholds {
    /// Checks that the critical gap is not below the warning gap.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::Config`] if the gaps are inverted.
    pub fn validate(&self) -> Result<(), ScoringError> {
        if self.communication_critical_s < self.communication_loss_s {
            return Err(ScoringError::Config {
                message: format!(
                    "communication_critical_s ({}) must be >= communication_loss_s ({})",
                    self.communication_critical_s, self.communication_loss_s
                ),
            });
        }
        Ok(())
    }
}

/// Result of the rule pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleOutcome {
    /// Reasons of every rule that fired, in rule order.
    pub reasons: Vec<ReasonCode>,
    /// Highest severity proposed by any fired rule.
    pub floor: Option<Severity>,
}

impl RuleOutcome {
    fn record(&mut self, reason: ReasonCode, severity: Severity) {
        self.reasons.push(reason);
        self.floor = self.floor.max(Some(severity));
    }
}

/// Runs every rule against `features`.
#[must_use]
pub fn evaluate_rules(features: &FeatureVector, thresholds: &AlertThresholds) -> RuleOutcome {
    let mut outcome = RuleOutcome::default();

    if features.distance_from_itinerary > thresholds.route_deviation_m {
        outcome.record(ReasonCode::RouteDeviation, Severity::Warn);
    }

    if features.time_since_last_fix > thresholds.communication_loss_s {
        let severity = if features.time_since_last_fix > thresholds.communication_critical_s {
            Severity::Critical
        } else {
            Severity::Warn
        };
        outcome.record(ReasonCode::CommunicationLoss, severity);
    }

    if features.avg_speed_last_15min <= 0.0 {
        outcome.record(ReasonCode::ProlongedInactivity, Severity::Warn);
    }

    if features.area_risk_score > thresholds.high_risk_area {
        outcome.record(ReasonCode::HighRiskArea, Severity::Warn);
    }

    if features.is_night() && features.area_risk_score > thresholds.night_risky_area {
        outcome.record(ReasonCode::NightTravelRiskyArea, Severity::Warn);
    }

    if features.sos_flag {
        outcome.record(ReasonCode::SosActivated, Severity::Critical);
    }

    if features.is_in_restricted_zone {
        outcome.record(ReasonCode::RestrictedZoneEntry, Severity::Warn);
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tourist_safety_features_models::TimeOfDayBucket;

    fn quiet() -> FeatureVector {
        FeatureVector {
            subject_id: "t1".to_string(),
            timestamp: NaiveDate::from_ymd_opt(2024, 6, 1)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
            time_of_day_bucket: TimeOfDayBucket::Morning,
            distance_from_itinerary: 100.0,
            time_since_last_fix: 600.0,
            avg_speed_last_15min: 1.2,
            area_risk_score: 0.2,
            prior_incidents_count: 0,
            days_into_trip: 1,
            is_in_restricted_zone: false,
            sos_flag: false,
            age: 30,
            sex_encoded: 0,
            days_trip_duration: 5,
        }
    }

    #[test]
    fn quiet_record_fires_nothing() {
        let outcome = evaluate_rules(&quiet(), &AlertThresholds::default());
        assert!(outcome.reasons.is_empty());
        assert_eq!(outcome.floor, None);
    }

    #[test]
    fn communication_loss_tiers() {
        let thresholds = AlertThresholds::default();

        let warn = FeatureVector {
            time_since_last_fix: 2000.0,
            ..quiet()
        };
        let outcome = evaluate_rules(&warn, &thresholds);
        assert_eq!(outcome.reasons, vec![ReasonCode::CommunicationLoss]);
        assert_eq!(outcome.floor, Some(Severity::Warn));

        let critical = FeatureVector {
            time_since_last_fix: 4000.0,
            ..quiet()
        };
        assert_eq!(
            evaluate_rules(&critical, &thresholds).floor,
            Some(Severity::Critical)
        );

        let boundary = FeatureVector {
            time_since_last_fix: 1800.0,
            ..quiet()
        };
        assert!(evaluate_rules(&boundary, &thresholds).reasons.is_empty());
    }

    #[test]
    fn floor_is_max_regardless_of_order() {
        // SOS fires before restricted zone; a warn rule after a critical one
        // must not lower the floor.
        let features = FeatureVector {
            sos_flag: true,
            is_in_restricted_zone: true,
            ..quiet()
        };
        let outcome = evaluate_rules(&features, &AlertThresholds::default());
        assert_eq!(
            outcome.reasons,
            vec![ReasonCode::SosActivated, ReasonCode::RestrictedZoneEntry]
        );
        assert_eq!(outcome.floor, Some(Severity::Critical));
    }

    #[test]
    fn night_travel_needs_night_and_risk() {
        let thresholds = AlertThresholds::default();
        let day = FeatureVector {
            area_risk_score: 0.5,
            ..quiet()
        };
        assert!(evaluate_rules(&day, &thresholds).reasons.is_empty());

        let night = FeatureVector {
            time_of_day_bucket: TimeOfDayBucket::Night,
            ..day
        };
        assert_eq!(
            evaluate_rules(&night, &thresholds).reasons,
            vec![ReasonCode::NightTravelRiskyArea]
        );
    }

    #[test]
    fn all_rules_fire_in_order() {
        let features = FeatureVector {
            distance_from_itinerary: 900.0,
            time_since_last_fix: 2400.0,
            avg_speed_last_15min: 0.0,
            area_risk_score: 0.9,
            time_of_day_bucket: TimeOfDayBucket::Night,
            sos_flag: true,
            is_in_restricted_zone: true,
            ..quiet()
        };
        let outcome = evaluate_rules(&features, &AlertThresholds::default());
        assert_eq!(
            outcome.reasons,
            vec![
                ReasonCode::RouteDeviation,
                ReasonCode::CommunicationLoss,
                ReasonCode::ProlongedInactivity,
                ReasonCode::HighRiskArea,
                ReasonCode::NightTravelRiskyArea,
                ReasonCode::SosActivated,
                ReasonCode::RestrictedZoneEntry,
            ]
        );
        assert_eq!(outcome.floor, Some(Severity::Critical));
    }

    #[test]
    fn rejects_inverted_gaps() {
        let thresholds = AlertThresholds {
            communication_critical_s: 100.0,
            ..AlertThresholds::default()
        };
        assert!(thresholds.validate().is_err());
    }
}
