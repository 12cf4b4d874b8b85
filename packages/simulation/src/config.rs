//! Simulation parameters.
//!
//! Every probability, range, and noise level the simulator uses lives in
//! [`SimulationConfig`] (trajectory and anomaly injection) or
//! [`ProfileConfig`] (subject and itinerary generation). Both deserialize
//! from TOML with every field optional.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tourist_safety_spatial::RiskAnchor;

use crate::ConfigError;

/// Parameters for generating subject profiles and itineraries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    /// Trips start up to `start_offset_days_max - 1` days before this time.
    pub reference_time: NaiveDateTime,
    /// Exclusive upper bound on the trip start offset in days.
    pub start_offset_days_max: i64,
    /// Minimum trip length in days (inclusive).
    pub trip_days_min: i64,
    /// Maximum trip length in days (inclusive).
    pub trip_days_max: i64,
    /// Minimum number of itinerary destinations (inclusive).
    pub destinations_min: usize,
    /// Maximum number of itinerary destinations (inclusive).
    pub destinations_max: usize,
    /// Standard deviation in degrees of the offset applied to each
    /// destination when it becomes a waypoint.
    pub waypoint_jitter_deg: f64,
    /// Minimum hours between consecutive planned arrivals (inclusive).
    pub arrival_gap_hours_min: i64,
    /// Maximum hours between consecutive planned arrivals (exclusive).
    pub arrival_gap_hours_max: i64,
    /// Minimum age (inclusive).
    pub age_min: u8,
    /// Maximum age (exclusive).
    pub age_max: u8,
    /// Relative weights for `M`, `F`, `Other`.
    pub sex_weights: [f64; 3],
    /// Nationalities drawn uniformly.
    pub nationalities: Vec<String>,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            reference_time: NaiveDate::from_ymd_opt(2024, 6, 1)
                .and_then(|d| d.and_hms_opt(9, 0, 0))
                .unwrap_or_default(),
            start_offset_days_max: 30,
            trip_days_min: 1,
            trip_days_max: 14,
            destinations_min: 3,
            destinations_max: 8,
            waypoint_jitter_deg: 0.01,
            arrival_gap_hours_min: 2,
            arrival_gap_hours_max: 8,
            age_min: 18,
            age_max: 70,
            sex_weights: [0.45, 0.45, 0.1],
            nationalities: [
                "Indian",
                "American",
                "British",
                "German",
                "French",
                "Japanese",
                "Australian",
                "Canadian",
            ]
            .into_iter()
            .map(ToString::to_string)
            .collect(),
        }
    }
}

impl ProfileConfig {
    /// Checks every range and weight.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] naming the first invalid field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.start_offset_days_max < 1 {
            return Err(ConfigError::new("start_offset_days_max must be at least 1"));
        }
        if self.trip_days_min < 1 || self.trip_days_min > self.trip_days_max {
            return Err(ConfigError::new(
                "trip_days_min must be at least 1 and not exceed trip_days_max",
            ));
        }
        if self.destinations_min < 1 || self.destinations_min > self.destinations_max {
            return Err(ConfigError::new(
                "destinations_min must be at least 1 and not exceed destinations_max",
            ));
        }
        check_std("waypoint_jitter_deg", self.waypoint_jitter_deg)?;
        if self.arrival_gap_hours_min < 1
            || self.arrival_gap_hours_min >= self.arrival_gap_hours_max
        {
            return Err(ConfigError::new(
                "arrival gap hours must satisfy 1 <= min < max",
            ));
        }
        if self.age_min >= self.age_max {
            return Err(ConfigError::new("age_min must be below age_max"));
        }
        if self.sex_weights.iter().any(|w| !w.is_finite() || *w < 0.0)
            || self.sex_weights.iter().sum::<f64>() <= 0.0
        {
            return Err(ConfigError::new(
                "sex_weights must be non-negative with a positive sum",
            ));
        }
        if self.nationalities.is_empty() {
            return Err(ConfigError::new("nationalities must not be empty"));
        }
        Ok(())
    }
}

/// Trajectory and anomaly-injection parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Master switch for anomaly injection. When `false` no subject
    /// receives any anomaly mode.
    pub inject_anomalies: bool,
    /// Per-subject probability of the route-deviation mode.
    pub route_deviation_probability: f64,
    /// Per-subject probability of the sudden-dropout mode.
    pub sudden_dropout_probability: f64,
    /// Per-subject probability of the prolonged-inactivity mode.
    pub prolonged_inactivity_probability: f64,

    /// Standard deviation in degrees of the per-step positional noise.
    pub gps_noise_deg: f64,
    /// Per-step probability of a displacement while deviating.
    pub deviation_step_probability: f64,
    /// Minimum displacement in meters.
    pub deviation_min_m: f64,
    /// Maximum displacement in meters.
    pub deviation_max_m: f64,

    /// Minimum reported speed in m/s.
    pub speed_min_m_s: f64,
    /// Maximum reported speed in m/s.
    pub speed_max_m_s: f64,
    /// Per-step probability of a zero-speed fix while inactive.
    pub inactivity_step_probability: f64,

    /// Minimum reported accuracy radius in meters.
    pub accuracy_min_m: f64,
    /// Maximum reported accuracy radius in meters.
    pub accuracy_max_m: f64,
    /// Relative weights for `gps`, `wifi`, `cell`.
    pub provider_weights: [f64; 3],

    /// Minimum battery drain per step in percent.
    pub battery_drain_min_pct: f64,
    /// Maximum battery drain per step in percent.
    pub battery_drain_max_pct: f64,
    /// Battery resets to 100 when it falls below this level.
    pub battery_recharge_below_pct: f64,
    /// Status is `low_power` below this battery level.
    pub low_power_below_pct: f64,
    /// Per-step probability of a transient `screen_off`/`no_signal` status.
    pub transient_status_probability: f64,

    /// Per-step probability of a silent gap while in dropout mode.
    pub dropout_step_probability: f64,
    /// Minimum silent gap in minutes (inclusive).
    pub dropout_gap_minutes_min: i64,
    /// Maximum silent gap in minutes (exclusive).
    pub dropout_gap_minutes_max: i64,
    /// Minimum spacing between emitted samples in minutes (inclusive).
    pub sample_gap_minutes_min: i64,
    /// Maximum spacing between emitted samples in minutes (exclusive).
    pub sample_gap_minutes_max: i64,

    /// Destination catalog that itineraries are drawn from.
    pub destinations: Vec<RiskAnchor>,
    /// Profile and itinerary generation.
    pub profile: ProfileConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            inject_anomalies: true,
            route_deviation_probability: 0.15,
            sudden_dropout_probability: 0.05,
            prolonged_inactivity_probability: 0.08,
            gps_noise_deg: 0.0001,
            deviation_step_probability: 0.1,
            deviation_min_m: 500.0,
            deviation_max_m: 2000.0,
            speed_min_m_s: 0.5,
            speed_max_m_s: 15.0,
            inactivity_step_probability: 0.05,
            accuracy_min_m: 3.0,
            accuracy_max_m: 50.0,
            provider_weights: [0.7, 0.2, 0.1],
            battery_drain_min_pct: 0.5,
            battery_drain_max_pct: 2.0,
            battery_recharge_below_pct: 10.0,
            low_power_below_pct: 20.0,
            transient_status_probability: 0.1,
            dropout_step_probability: 0.02,
            dropout_gap_minutes_min: 30,
            dropout_gap_minutes_max: 180,
            sample_gap_minutes_min: 5,
            sample_gap_minutes_max: 30,
            destinations: tourist_safety_spatial::registry::default_anchors(),
            profile: ProfileConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Checks every probability, range, and weight, including the nested
    /// [`ProfileConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] naming the first invalid field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, p) in [
            ("route_deviation_probability", self.route_deviation_probability),
            ("sudden_dropout_probability", self.sudden_dropout_probability),
            (
                "prolonged_inactivity_probability",
                self.prolonged_inactivity_probability,
            ),
            ("deviation_step_probability", self.deviation_step_probability),
            (
                "inactivity_step_probability",
                self.inactivity_step_probability,
            ),
            (
                "transient_status_probability",
                self.transient_status_probability,
            ),
            ("dropout_step_probability", self.dropout_step_probability),
        ] {
            check_probability(name, p)?;
        }

        check_std("gps_noise_deg", self.gps_noise_deg)?;
        check_range("deviation_m", self.deviation_min_m, self.deviation_max_m)?;
        check_range("speed_m_s", self.speed_min_m_s, self.speed_max_m_s)?;
        check_range("accuracy_m", self.accuracy_min_m, self.accuracy_max_m)?;
        check_range(
            "battery_drain_pct",
            self.battery_drain_min_pct,
            self.battery_drain_max_pct,
        )?;

        if self.provider_weights.iter().any(|w| !w.is_finite() || *w < 0.0)
            || self.provider_weights.iter().sum::<f64>() <= 0.0
        {
            return Err(ConfigError::new(
                "provider_weights must be non-negative with a positive sum",
            ));
        }
        if self.dropout_gap_minutes_min < 1
            || self.dropout_gap_minutes_min >= self.dropout_gap_minutes_max
        {
            return Err(ConfigError::new(
                "dropout gap minutes must satisfy 1 <= min < max",
            ));
        }
        if self.sample_gap_minutes_min < 1
            || self.sample_gap_minutes_min >= self.sample_gap_minutes_max
        {
            return Err(ConfigError::new(
                "sample gap minutes must satisfy 1 <= min < max",
            ));
        }
        if self.destinations.is_empty() {
            return Err(ConfigError::new("destinations must not be empty"));
        }

        self.profile.validate()
    }
}

fn check_probability(name: &str, p: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&p) {
        Ok(())
    } else {
        Err(ConfigError::new(format!("{name} must be in [0, 1], got {p}")))
    }
}

fn check_std(name: &str, std: f64) -> Result<(), ConfigError> {
    if std.is_finite() && std >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::new(format!(
            "{name} must be finite and non-negative, got {std}"
        )))
    }
}

fn check_range(name: &str, min: f64, max: f64) -> Result<(), ConfigError> {
    if min.is_finite() && max.is_finite() && min >= 0.0 && min <= max {
        Ok(())
    } else {
        Err(ConfigError::new(format!(
            "{name} range must satisfy 0 <= min <= max, got [{min}, {max}]"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        SimulationConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_probability_above_one() {
        let config = SimulationConfig {
            dropout_step_probability: 1.5,
            ..SimulationConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("dropout_step_probability"));
    }

    #[test]
    fn rejects_inverted_speed_range() {
        let config = SimulationConfig {
            speed_min_m_s: 10.0,
            speed_max_m_s: 1.0,
            ..SimulationConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_empty_destinations() {
        let config = SimulationConfig {
            destinations: Vec::new(),
            ..SimulationConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_bad_nested_profile() {
        let mut config = SimulationConfig::default();
        config.profile.age_min = 80;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_hour_arrival_gap() {
        let mut config = SimulationConfig::default();
        config.profile.arrival_gap_hours_min = 0;
        config.profile.arrival_gap_hours_max = 1;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("arrival gap hours"));

        config.profile.arrival_gap_hours_min = 1;
        config.profile.arrival_gap_hours_max = 2;
        config.validate().unwrap();
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: SimulationConfig = toml::de::from_str(
            r"
            inject_anomalies = false
            sample_gap_minutes_min = 10

            [profile]
            trip_days_max = 3
            ",
        )
        .unwrap();

        assert!(!config.inject_anomalies);
        assert_eq!(config.sample_gap_minutes_min, 10);
        assert_eq!(config.sample_gap_minutes_max, 30);
        assert_eq!(config.profile.trip_days_max, 3);
        assert_eq!(config.profile.age_min, 18);
        assert!(!config.destinations.is_empty());
    }
}
