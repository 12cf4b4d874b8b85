//! Input-driven risk factors reported next to a prediction.

use tourist_safety_features_models::{FeatureVector, RiskExplanation, RiskFactor};

const HIGH_AREA_RISK: f64 = 0.6;
const OFF_ITINERARY_M: f64 = 300.0;
const STALE_SIGNAL_S: f64 = 900.0;
const LOW_MOVEMENT_M_S: f64 = 0.3;

/// Lists the risk factors present in `features`, in fixed order.
#[must_use]
pub fn explain(features: &FeatureVector) -> RiskExplanation {
    let checks = [
        (
            features.area_risk_score >= HIGH_AREA_RISK,
            RiskFactor::HighAreaRisk,
        ),
        (
            features.distance_from_itinerary >= OFF_ITINERARY_M,
            RiskFactor::OffItinerary,
        ),
        (
            features.time_since_last_fix >= STALE_SIGNAL_S,
            RiskFactor::StaleGpsSignal,
        ),
        (
            features.avg_speed_last_15min < LOW_MOVEMENT_M_S,
            RiskFactor::LowRecentMovement,
        ),
        (
            features.is_in_restricted_zone,
            RiskFactor::RestrictedZoneFlag,
        ),
        (features.sos_flag, RiskFactor::SosFlagActive),
        (
            features.prior_incidents_count > 0,
            RiskFactor::PriorIncidentsHistory,
        ),
    ];

    RiskExplanation::new(
        checks
            .into_iter()
            .filter_map(|(present, factor)| present.then_some(factor))
            .collect(),
    )
}
