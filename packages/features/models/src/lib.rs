#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Feature vectors, safety labels, and alerts.
//!
//! These are the shapes exchanged with the externally trained scorers, so
//! field names serialize exactly as the scorers' training schema expects
//! (`tourist_id`, `distance_from_itinerary`, ...).

use chrono::{NaiveDateTime, Timelike as _};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Coarse local time-of-day bucket.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TimeOfDayBucket {
    /// 06:00 to 11:59
    Morning,
    /// 12:00 to 17:59
    Afternoon,
    /// 18:00 to 21:59
    Evening,
    /// 22:00 to 05:59
    Night,
}

impl TimeOfDayBucket {
    /// Bucket for a local hour of day (`0..=23`).
    #[must_use]
    pub const fn from_hour(hour: u32) -> Self {
        match hour {
            6..=11 => Self::Morning,
            12..=17 => Self::Afternoon,
            18..=21 => Self::Evening,
            _ => Self::Night,
        }
    }

    /// Bucket for a local wall-clock timestamp.
    #[must_use]
    pub fn from_timestamp(timestamp: &NaiveDateTime) -> Self {
        Self::from_hour(timestamp.hour())
    }

    /// Label-encoded value used as a model input. Codes follow alphabetical
    /// order of the bucket names.
    #[must_use]
    pub const fn label_code(self) -> u8 {
        match self {
            Self::Afternoon => 0,
            Self::Evening => 1,
            Self::Morning => 2,
            Self::Night => 3,
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Morning, Self::Afternoon, Self::Evening, Self::Night]
    }
}

/// Column names of [`FeatureVector::model_inputs`], in order.
pub const MODEL_INPUT_COLUMNS: [&str; 12] = [
    "distance_from_itinerary",
    "time_since_last_fix",
    "avg_speed_last_15min",
    "area_risk_score",
    "prior_incidents_count",
    "days_into_trip",
    "is_in_restricted_zone",
    "sos_flag",
    "age",
    "sex_encoded",
    "days_trip_duration",
    "time_of_day_bucket_encoded",
];

/// Safety-relevant features derived from one location sample and the
/// subject's earlier samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Subject the sample belongs to.
    #[serde(rename = "tourist_id")]
    pub subject_id: String,
    /// Sample timestamp (local time).
    pub timestamp: NaiveDateTime,
    /// Local time-of-day bucket.
    pub time_of_day_bucket: TimeOfDayBucket,
    /// Meters to the nearest itinerary waypoint.
    pub distance_from_itinerary: f64,
    /// Seconds since the previous sample, `0` for the first.
    pub time_since_last_fix: f64,
    /// Mean speed in m/s over the trailing 15 minutes, inclusive of this
    /// sample.
    pub avg_speed_last_15min: f64,
    /// Area risk in `[0, 1]`.
    pub area_risk_score: f64,
    /// Number of prior incidents on record.
    pub prior_incidents_count: u32,
    /// Whole days since trip start.
    pub days_into_trip: i64,
    /// Whether the sample lies in a restricted zone.
    pub is_in_restricted_zone: bool,
    /// Whether the subject has raised an SOS.
    pub sos_flag: bool,
    /// Subject age in years.
    pub age: u8,
    /// Encoded sex category (`M=0`, `F=1`, `Other=2`).
    pub sex_encoded: u8,
    /// Whole days between trip start and trip end.
    pub days_trip_duration: i64,
}

impl FeatureVector {
    /// Returns `true` if the sample falls in the night bucket.
    #[must_use]
    pub fn is_night(&self) -> bool {
        self.time_of_day_bucket == TimeOfDayBucket::Night
    }

    /// Numeric model inputs in [`MODEL_INPUT_COLUMNS`] order.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn model_inputs(&self) -> [f64; 12] {
        [
            self.distance_from_itinerary,
            self.time_since_last_fix,
            self.avg_speed_last_15min,
            self.area_risk_score,
            f64::from(self.prior_incidents_count),
            self.days_into_trip as f64,
            f64::from(u8::from(self.is_in_restricted_zone)),
            f64::from(u8::from(self.sos_flag)),
            f64::from(self.age),
            f64::from(self.sex_encoded),
            self.days_trip_duration as f64,
            f64::from(self.time_of_day_bucket.label_code()),
        ]
    }
}

/// Synthetic training label for one feature vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyLabel {
    /// Subject the labelled sample belongs to.
    #[serde(rename = "tourist_id")]
    pub subject_id: String,
    /// Timestamp of the labelled sample.
    pub timestamp: NaiveDateTime,
    /// Safety score in `[0, 100]`.
    pub safety_label: u8,
    /// Whether a near-term incident is recorded for this sample.
    pub incident_within_24h: bool,
}

/// Ordinal alert severity.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Severity {
    /// Informational only.
    #[default]
    Info,
    /// Needs attention.
    Warn,
    /// Needs immediate response.
    Critical,
}

/// Why an alert was raised.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReasonCode {
    /// Far from every itinerary waypoint.
    RouteDeviation,
    /// No fix for a long time.
    CommunicationLoss,
    /// Zero trailing speed.
    ProlongedInactivity,
    /// Area risk above the high-risk threshold.
    HighRiskArea,
    /// Night-time presence in a moderately risky area.
    NightTravelRiskyArea,
    /// SOS raised.
    SosActivated,
    /// Inside a restricted zone.
    RestrictedZoneEntry,
    /// At least one outlier scorer flagged the sample.
    MlDetectedAnomaly,
}

/// Output of one external outlier scorer. Lower decision scores are more
/// anomalous.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OutlierOutput {
    /// Continuous decision score.
    pub decision_score: f64,
    /// Binary outlier verdict.
    pub is_outlier: bool,
}

/// Raw outputs of the two outlier scorers consulted for an alert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OutlierOutputs {
    /// First scorer (e.g. an isolation forest).
    pub primary: OutlierOutput,
    /// Second scorer (e.g. a one-class SVM).
    pub secondary: OutlierOutput,
}

impl OutlierOutputs {
    /// Returns `true` if either scorer flagged an outlier.
    #[must_use]
    pub const fn any_outlier(&self) -> bool {
        self.primary.is_outlier || self.secondary.is_outlier
    }

    /// The lower (more anomalous) of the two decision scores.
    #[must_use]
    pub const fn min_decision_score(&self) -> f64 {
        self.primary.decision_score.min(self.secondary.decision_score)
    }
}

/// Fused anomaly alert for one feature vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Subject the alert concerns.
    #[serde(rename = "tourist_id")]
    pub subject_id: String,
    /// Timestamp of the triggering sample.
    pub timestamp: NaiveDateTime,
    /// `true` when severity is at least [`Severity::Warn`].
    pub anomaly: bool,
    /// Fused severity tier.
    pub severity: Severity,
    /// Reasons in rule order, with [`ReasonCode::MlDetectedAnomaly`] last.
    pub reasons: Vec<ReasonCode>,
    /// Combined anomaly score in `[0, 1]`.
    pub anomaly_score: f64,
    /// Raw outlier-scorer outputs.
    pub ml_scores: OutlierOutputs,
}

/// Coarse safety band for a predicted score.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SafetyBand {
    /// Score below 50.
    Low,
    /// Score in `[50, 75)`.
    Medium,
    /// Score of 75 or more.
    High,
}

impl SafetyBand {
    /// Band for a predicted safety score.
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score >= 75.0 {
            Self::High
        } else if score >= 50.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// Input-driven risk factor surfaced alongside a prediction. These explain
/// the inputs; they are not anomaly reasons.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RiskFactor {
    /// Area risk at or above the reporting threshold.
    HighAreaRisk,
    /// Far from the itinerary.
    OffItinerary,
    /// Last fix is stale.
    StaleGpsSignal,
    /// Little recent movement.
    LowRecentMovement,
    /// Inside a restricted zone.
    RestrictedZoneFlag,
    /// SOS raised.
    SosFlagActive,
    /// Prior incidents on record.
    PriorIncidentsHistory,
}

/// Summary used when no risk factor applies.
pub const NO_RISK_FACTORS_SUMMARY: &str = "no notable risk factors from input";

/// Risk factors and a one-line summary of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskExplanation {
    /// Factors in fixed reporting order.
    pub factors: Vec<RiskFactor>,
    /// Factors joined with `" | "`, or [`NO_RISK_FACTORS_SUMMARY`].
    pub summary: String,
}

impl RiskExplanation {
    /// Builds an explanation, deriving the summary from `factors`.
    #[must_use]
    pub fn new(factors: Vec<RiskFactor>) -> Self {
        let summary = if factors.is_empty() {
            NO_RISK_FACTORS_SUMMARY.to_string()
        } else {
            factors
                .iter()
                .map(AsRef::as_ref)
                .collect::<Vec<&str>>()
                .join(" | ")
        };
        Self { factors, summary }
    }
}

/// Scored result for one live location report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyAssessment {
    /// Subject the report belongs to.
    #[serde(rename = "tourist_id")]
    pub subject_id: String,
    /// Report timestamp.
    pub timestamp: NaiveDateTime,
    /// Safety score from the external scorer.
    pub predicted_safety: f64,
    /// Scorer confidence in `[0, 1]`.
    pub confidence: f64,
    /// Band for `predicted_safety`.
    pub safety_band: SafetyBand,
    /// Input-driven explanation.
    pub explanations: RiskExplanation,
    /// Fused anomaly alert.
    pub alert: Alert,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(hour, 30, 0)
            .unwrap()
    }

    #[test]
    fn bucket_boundaries() {
        assert_eq!(TimeOfDayBucket::from_hour(5), TimeOfDayBucket::Night);
        assert_eq!(TimeOfDayBucket::from_hour(6), TimeOfDayBucket::Morning);
        assert_eq!(TimeOfDayBucket::from_hour(11), TimeOfDayBucket::Morning);
        assert_eq!(TimeOfDayBucket::from_hour(12), TimeOfDayBucket::Afternoon);
        assert_eq!(TimeOfDayBucket::from_hour(17), TimeOfDayBucket::Afternoon);
        assert_eq!(TimeOfDayBucket::from_hour(18), TimeOfDayBucket::Evening);
        assert_eq!(TimeOfDayBucket::from_hour(21), TimeOfDayBucket::Evening);
        assert_eq!(TimeOfDayBucket::from_hour(22), TimeOfDayBucket::Night);
        assert_eq!(TimeOfDayBucket::from_hour(0), TimeOfDayBucket::Night);
        assert_eq!(
            TimeOfDayBucket::from_timestamp(&ts(19)),
            TimeOfDayBucket::Evening
        );
    }

    #[test]
    fn label_codes_are_alphabetical() {
        let mut names: Vec<_> = TimeOfDayBucket::all()
            .iter()
            .map(|b| (b.as_ref().to_string(), b.label_code()))
            .collect();
        names.sort();
        let codes: Vec<u8> = names.into_iter().map(|(_, code)| code).collect();
        assert_eq!(codes, vec![0, 1, 2, 3]);
    }

    #[test]
    fn feature_vector_uses_training_field_names() {
        let fv = FeatureVector {
            subject_id: "t1".to_string(),
            timestamp: ts(9),
            time_of_day_bucket: TimeOfDayBucket::Morning,
            distance_from_itinerary: 12.5,
            time_since_last_fix: 600.0,
            avg_speed_last_15min: 1.5,
            area_risk_score: 0.2,
            prior_incidents_count: 1,
            days_into_trip: 2,
            is_in_restricted_zone: false,
            sos_flag: false,
            age: 30,
            sex_encoded: 1,
            days_trip_duration: 5,
        };
        let json = serde_json::to_value(&fv).unwrap();
        assert_eq!(json["tourist_id"], "t1");
        assert_eq!(json["time_of_day_bucket"], "morning");
        assert_eq!(json["timestamp"], "2024-06-01T09:30:00");

        let inputs = fv.model_inputs();
        assert_eq!(inputs.len(), MODEL_INPUT_COLUMNS.len());
        assert!((inputs[0] - 12.5).abs() < f64::EPSILON);
        assert!((inputs[4] - 1.0).abs() < f64::EPSILON);
        assert!((inputs[11] - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn severity_orders_by_urgency() {
        assert!(Severity::Info < Severity::Warn);
        assert!(Severity::Warn < Severity::Critical);
        assert_eq!(Severity::Critical.to_string(), "critical");
    }

    #[test]
    fn reason_codes_serialize_snake_case() {
        assert_eq!(
            serde_json::to_string(&ReasonCode::NightTravelRiskyArea).unwrap(),
            "\"night_travel_risky_area\""
        );
        assert_eq!(ReasonCode::MlDetectedAnomaly.as_ref(), "ml_detected_anomaly");
    }

    #[test]
    fn safety_bands() {
        assert_eq!(SafetyBand::from_score(75.0), SafetyBand::High);
        assert_eq!(SafetyBand::from_score(74.9), SafetyBand::Medium);
        assert_eq!(SafetyBand::from_score(50.0), SafetyBand::Medium);
        assert_eq!(SafetyBand::from_score(49.9), SafetyBand::Low);
    }

    #[test]
    fn explanation_summary() {
        assert_eq!(RiskExplanation::new(vec![]).summary, NO_RISK_FACTORS_SUMMARY);
        assert_eq!(
            RiskExplanation::new(vec![RiskFactor::HighAreaRisk, RiskFactor::SosFlagActive])
                .summary,
            "high_area_risk | sos_flag_active"
        );
    }

    #[test]
    fn outlier_outputs_helpers() {
        let outputs = OutlierOutputs {
            primary: OutlierOutput {
                decision_score: -0.4,
                is_outlier: true,
            },
            secondary: OutlierOutput {
                decision_score: 0.1,
                is_outlier: false,
            },
        };
        assert!(outputs.any_outlier());
        assert!((outputs.min_decision_score() + 0.4).abs() < f64::EPSILON);
    }
}
