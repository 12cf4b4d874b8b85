//! Inference-time location reports.
//!
//! A report carries the raw fix plus whatever features the caller already
//! knows. Missing optional fields take documented defaults; a missing area
//! risk or restricted flag is filled from the live evaluator and a missing
//! time-of-day bucket from the timestamp.

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tourist_safety_features_models::{FeatureVector, TimeOfDayBucket};
use tourist_safety_spatial::LiveRiskEvaluator;
use tourist_safety_trajectory_models::{Coordinate, DeviceStatus, LocationSample, Provider};

use crate::FeatureError;

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// One live location report as received from a caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceRecord {
    /// Subject the report belongs to.
    #[serde(rename = "tourist_id")]
    pub subject_id: String,
    /// RFC 3339 or naive ISO 8601 timestamp.
    pub timestamp: String,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,

    /// Speed in m/s. Default `0`.
    #[serde(default)]
    pub speed_m_s: f64,
    /// Accuracy radius in meters. Default `10`.
    #[serde(default = "default_accuracy_m")]
    pub accuracy_m: f64,
    /// Positioning source. Default `gps`.
    #[serde(default)]
    pub provider: Provider,
    /// Battery percentage. Default `100`.
    #[serde(default = "default_battery_pct")]
    pub battery_pct: u8,
    /// Device status. Default `active`.
    #[serde(default)]
    pub device_status: DeviceStatus,

    /// Meters to the nearest waypoint. Default `0`.
    #[serde(default)]
    pub distance_from_itinerary: f64,
    /// Seconds since the previous fix. Default `0`.
    #[serde(default)]
    pub time_since_last_fix: f64,
    /// Trailing 15-minute mean speed. Default `0`.
    #[serde(default)]
    pub avg_speed_last_15min: f64,
    /// Area risk; evaluated live when absent.
    #[serde(default)]
    pub area_risk_score: Option<f64>,
    /// Restricted-zone flag; evaluated live when absent.
    #[serde(default)]
    pub is_in_restricted_zone: Option<bool>,
    /// Time-of-day bucket; inferred from the timestamp when absent.
    #[serde(default)]
    pub time_of_day_bucket: Option<TimeOfDayBucket>,
    /// Prior incidents on record. Default `0`.
    #[serde(default)]
    pub prior_incidents_count: u32,
    /// Days since trip start. Default `0`.
    #[serde(default)]
    pub days_into_trip: i64,
    /// SOS flag. Default `false`.
    #[serde(default)]
    pub sos_flag: bool,
    /// Subject age. Default `30`.
    #[serde(default = "default_age")]
    pub age: u8,
    /// Encoded sex category. Default `0`.
    #[serde(default)]
    pub sex_encoded: u8,
    /// Trip length in days. Default `5`.
    #[serde(default = "default_trip_duration")]
    pub days_trip_duration: i64,
}

const fn default_accuracy_m() -> f64 {
    10.0
}

const fn default_battery_pct() -> u8 {
    100
}

const fn default_age() -> u8 {
    30
}

const fn default_trip_duration() -> i64 {
    5
}

impl InferenceRecord {
    /// Parses a record from an arbitrary JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::Json`] if required fields are missing or
    /// mistyped.
    pub fn from_value(value: serde_json::Value) -> Result<Self, FeatureError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Parses the timestamp as RFC 3339 (taking the wall-clock time in its
    /// offset) or naive ISO 8601.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::Timestamp`] if no format matches.
    pub fn parsed_timestamp(&self) -> Result<NaiveDateTime, FeatureError> {
        parse_timestamp(&self.timestamp)
    }

    /// Validated coordinate of the report.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::Coordinate`] if latitude or longitude is out
    /// of range.
    pub fn coordinate(&self) -> Result<Coordinate, FeatureError> {
        Ok(Coordinate::new(self.latitude, self.longitude)?)
    }

    /// Converts the raw fix to a [`LocationSample`].
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError`] if the timestamp, coordinate, speed,
    /// accuracy, or battery level is invalid.
    pub fn to_sample(&self) -> Result<LocationSample, FeatureError> {
        if !(self.speed_m_s.is_finite() && self.speed_m_s >= 0.0) {
            return Err(FeatureError::InvalidRecord {
                message: format!("speed_m_s must be >= 0, got {}", self.speed_m_s),
            });
        }
        if !(self.accuracy_m.is_finite() && self.accuracy_m > 0.0) {
            return Err(FeatureError::InvalidRecord {
                message: format!("accuracy_m must be > 0, got {}", self.accuracy_m),
            });
        }
        if self.battery_pct > 100 {
            return Err(FeatureError::InvalidRecord {
                message: format!("battery_pct must be <= 100, got {}", self.battery_pct),
            });
        }

        Ok(LocationSample {
            subject_id: self.subject_id.clone(),
            timestamp: self.parsed_timestamp()?,
            coordinate: self.coordinate()?,
            speed_m_s: self.speed_m_s,
            accuracy_m: self.accuracy_m,
            provider: self.provider,
            battery_pct: self.battery_pct,
            device_status: self.device_status,
        })
    }

    /// Builds the feature vector, filling missing area fields from
    /// `evaluator` and a missing bucket from the timestamp.
    ///
    /// The evaluator is consulted only when the area risk or restricted
    /// flag is absent, and then fills only the absent one.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError`] if the record fails validation.
    pub fn to_features(
        &self,
        evaluator: &LiveRiskEvaluator,
    ) -> Result<FeatureVector, FeatureError> {
        let sample = self.to_sample()?;

        let (area_risk_score, is_in_restricted_zone) =
            match (self.area_risk_score, self.is_in_restricted_zone) {
                (Some(risk), Some(restricted)) => (risk, restricted),
                (risk, restricted) => {
                    let area = evaluator.evaluate(&sample.coordinate);
                    (
                        risk.unwrap_or(area.risk_score),
                        restricted.unwrap_or(area.in_restricted_zone),
                    )
                }
            };

        if !(0.0..=1.0).contains(&area_risk_score) {
            return Err(FeatureError::InvalidRecord {
                message: format!("area_risk_score must be in [0, 1], got {area_risk_score}"),
            });
        }
        for (name, value) in [
            ("distance_from_itinerary", self.distance_from_itinerary),
            ("time_since_last_fix", self.time_since_last_fix),
            ("avg_speed_last_15min", self.avg_speed_last_15min),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(FeatureError::InvalidRecord {
                    message: format!("{name} must be >= 0, got {value}"),
                });
            }
        }

        Ok(FeatureVector {
            subject_id: sample.subject_id,
            timestamp: sample.timestamp,
            time_of_day_bucket: self
                .time_of_day_bucket
                .unwrap_or_else(|| TimeOfDayBucket::from_timestamp(&sample.timestamp)),
            distance_from_itinerary: self.distance_from_itinerary,
            time_since_last_fix: self.time_since_last_fix,
            avg_speed_last_15min: self.avg_speed_last_15min,
            area_risk_score,
            prior_incidents_count: self.prior_incidents_count,
            days_into_trip: self.days_into_trip.max(0),
            is_in_restricted_zone,
            sos_flag: self.sos_flag,
            age: self.age,
            sex_encoded: self.sex_encoded,
            days_trip_duration: self.days_trip_duration,
        })
    }
}

/// Parses an RFC 3339 or naive ISO 8601 timestamp into local wall-clock
/// time.
///
/// # Errors
///
/// Returns [`FeatureError::Timestamp`] if no supported format matches.
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime, FeatureError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.naive_local());
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .ok_or_else(|| FeatureError::Timestamp {
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike as _;
    use serde_json::json;
    use tourist_safety_spatial::{LiveRiskConfig, registry};

    fn evaluator() -> LiveRiskEvaluator {
        LiveRiskEvaluator::new(registry::default_zones(), LiveRiskConfig::default())
    }

    #[test]
    fn minimal_record_takes_defaults() {
        let record = InferenceRecord::from_value(json!({
            "tourist_id": "t1",
            "timestamp": "2024-06-01T23:15:00Z",
            "latitude": 12.30,
            "longitude": 76.60
        }))
        .unwrap();

        assert!((record.accuracy_m - 10.0).abs() < f64::EPSILON);
        assert_eq!(record.battery_pct, 100);
        assert_eq!(record.provider, Provider::Gps);
        assert_eq!(record.device_status, DeviceStatus::Active);
        assert_eq!(record.age, 30);
        assert_eq!(record.days_trip_duration, 5);

        let fv = record.to_features(&evaluator()).unwrap();
        assert_eq!(fv.time_of_day_bucket, TimeOfDayBucket::Night);
        assert!((fv.area_risk_score - 0.2).abs() < 1e-12);
        assert!(!fv.is_in_restricted_zone);
        assert_eq!(fv.sex_encoded, 0);
    }

    #[test]
    fn fills_only_missing_area_field() {
        let record = InferenceRecord::from_value(json!({
            "tourist_id": "t1",
            "timestamp": "2024-06-01T10:00:00",
            "latitude": 12.25,
            "longitude": 76.75,
            "area_risk_score": 0.1
        }))
        .unwrap();

        let fv = record.to_features(&evaluator()).unwrap();
        assert!((fv.area_risk_score - 0.1).abs() < f64::EPSILON);
        assert!(fv.is_in_restricted_zone, "outskirts quarry is restricted");
    }

    #[test]
    fn explicit_bucket_wins() {
        let record = InferenceRecord::from_value(json!({
            "tourist_id": "t1",
            "timestamp": "2024-06-01T10:00:00",
            "latitude": 0.0,
            "longitude": 0.0,
            "time_of_day_bucket": "evening"
        }))
        .unwrap();
        let fv = record.to_features(&evaluator()).unwrap();
        assert_eq!(fv.time_of_day_bucket, TimeOfDayBucket::Evening);
    }

    #[test]
    fn timestamp_formats() {
        assert_eq!(parse_timestamp("2024-06-01T08:30:00+05:30").unwrap().hour(), 8);
        assert_eq!(parse_timestamp("2024-06-01T08:30:00.250").unwrap().hour(), 8);
        assert_eq!(parse_timestamp("2024-06-01 21:05:00").unwrap().hour(), 21);
        assert!(matches!(
            parse_timestamp("yesterday"),
            Err(FeatureError::Timestamp { .. })
        ));
    }

    #[test]
    fn rejects_invalid_fields() {
        let base = json!({
            "tourist_id": "t1",
            "timestamp": "2024-06-01T10:00:00",
            "latitude": 12.3,
            "longitude": 76.6
        });

        let mut bad_lat = base.clone();
        bad_lat["latitude"] = json!(95.0);
        let record = InferenceRecord::from_value(bad_lat).unwrap();
        assert!(matches!(
            record.to_features(&evaluator()),
            Err(FeatureError::Coordinate(_))
        ));

        let mut bad_speed = base.clone();
        bad_speed["speed_m_s"] = json!(-1.0);
        let record = InferenceRecord::from_value(bad_speed).unwrap();
        assert!(matches!(
            record.to_sample(),
            Err(FeatureError::InvalidRecord { .. })
        ));

        let mut missing = base;
        missing.as_object_mut().unwrap().remove("latitude");
        assert!(matches!(
            InferenceRecord::from_value(missing),
            Err(FeatureError::Json(_))
        ));
    }
}
