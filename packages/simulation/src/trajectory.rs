//! Step-wise trajectory simulation.
//!
//! A subject walks its itinerary one step at a time. Each step perturbs the
//! position, draws device telemetry, and either emits a sample or, in
//! dropout mode, silently advances the clock. The state carried between
//! steps is the explicit [`SimState`] value.

use chrono::{Duration, NaiveDateTime};
use rand::Rng;
use rand::distributions::WeightedIndex;
use rand_distr::{Distribution as _, Normal};
use serde::{Deserialize, Serialize};
use tourist_safety_spatial::destination_point;
use tourist_safety_trajectory_models::{
    Coordinate, DeviceStatus, LocationSample, Provider, SubjectProfile,
};

use crate::{ConfigError, config::SimulationConfig};

/// Anomaly modes assigned to a subject before simulation starts. Modes are
/// independent; any combination may be active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnomalyModes {
    /// Occasional 0.5 to 2 km displacements off route.
    pub route_deviation: bool,
    /// Occasional silent gaps in reporting.
    pub sudden_dropout: bool,
    /// Occasional zero-speed fixes.
    pub prolonged_inactivity: bool,
}

impl AnomalyModes {
    /// Draws each mode independently with its configured probability.
    ///
    /// All three draws happen even when injection is disabled, so toggling
    /// [`SimulationConfig::inject_anomalies`] does not shift later draws.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `config` fails validation; nothing is
    /// drawn in that case.
    pub fn draw<R: Rng + ?Sized>(
        config: &SimulationConfig,
        rng: &mut R,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let route_deviation = rng.gen_bool(config.route_deviation_probability);
        let sudden_dropout = rng.gen_bool(config.sudden_dropout_probability);
        let prolonged_inactivity = rng.gen_bool(config.prolonged_inactivity_probability);

        if !config.inject_anomalies {
            return Ok(Self::default());
        }

        Ok(Self {
            route_deviation,
            sudden_dropout,
            prolonged_inactivity,
        })
    }

    /// Returns `true` if any mode is active.
    #[must_use]
    pub const fn any(&self) -> bool {
        self.route_deviation || self.sudden_dropout || self.prolonged_inactivity
    }
}

/// Simulator state between steps.
#[derive(Debug, Clone, PartialEq)]
pub struct SimState {
    /// Current simulated time.
    pub clock: NaiveDateTime,
    /// Position of the last emitted sample, `None` before the first.
    pub last_coordinate: Option<Coordinate>,
    /// Battery level in percent, kept fractional between steps.
    pub battery_pct: f64,
    /// Index of the waypoint currently being approached.
    pub itinerary_index: usize,
}

impl SimState {
    /// Initial state: clock at trip start, full battery, first waypoint.
    #[must_use]
    pub const fn start(profile: &SubjectProfile) -> Self {
        Self {
            clock: profile.trip_start,
            last_coordinate: None,
            battery_pct: 100.0,
            itinerary_index: 0,
        }
    }
}

/// Result of a single simulation step.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// A sample was emitted.
    Emitted(LocationSample),
    /// Reporting went silent and the clock jumped by `gap`.
    Dropout {
        /// Length of the silent gap.
        gap: Duration,
    },
    /// The trip is over or the itinerary is exhausted.
    Finished,
}

/// Drives one subject's trajectory.
#[derive(Debug, Clone)]
pub struct TrajectorySimulator<'a> {
    config: &'a SimulationConfig,
    profile: &'a SubjectProfile,
    modes: AnomalyModes,
    gps_noise: Normal<f64>,
    providers: WeightedIndex<f64>,
}

impl<'a> TrajectorySimulator<'a> {
    /// Prepares a simulator for `profile` under the given anomaly modes.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `config` fails validation.
    pub fn new(
        config: &'a SimulationConfig,
        profile: &'a SubjectProfile,
        modes: AnomalyModes,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let gps_noise = Normal::new(0.0, config.gps_noise_deg)
            .map_err(|e| ConfigError::new(format!("invalid gps_noise_deg: {e}")))?;
        let providers = WeightedIndex::new(config.provider_weights)
            .map_err(|e| ConfigError::new(format!("invalid provider_weights: {e}")))?;

        Ok(Self {
            config,
            profile,
            modes,
            gps_noise,
            providers,
        })
    }

    /// Advances the simulation by one step.
    ///
    /// The first step starts at the first waypoint. Every later step starts
    /// from the last emitted position, so the subject random-walks around
    /// its itinerary rather than travelling between waypoints.
    ///
    /// A dropout step never advances the itinerary index; after a long gap
    /// the index catches up by at most one waypoint per emitted sample.
    pub fn step<R: Rng + ?Sized>(&self, state: SimState, rng: &mut R) -> (SimState, StepOutcome) {
        let config = self.config;
        let Some(target) = self.profile.itinerary.get(state.itinerary_index) else {
            return (state, StepOutcome::Finished);
        };
        if state.clock >= self.profile.trip_end {
            return (state, StepOutcome::Finished);
        }

        let origin = state.last_coordinate.unwrap_or(target.coordinate);
        let mut coordinate = Coordinate::wrapped(
            origin.latitude() + self.gps_noise.sample(rng),
            origin.longitude() + self.gps_noise.sample(rng),
        );

        if self.modes.route_deviation && rng.gen_bool(config.deviation_step_probability) {
            let distance = rng.gen_range(config.deviation_min_m..=config.deviation_max_m);
            let bearing = rng.gen_range(0.0..std::f64::consts::TAU);
            coordinate = destination_point(&coordinate, bearing, distance);
        }

        let mut speed_m_s = rng.gen_range(config.speed_min_m_s..=config.speed_max_m_s);
        if self.modes.prolonged_inactivity && rng.gen_bool(config.inactivity_step_probability) {
            speed_m_s = 0.0;
        }

        let accuracy_m = rng.gen_range(config.accuracy_min_m..=config.accuracy_max_m);
        let provider = Provider::all()[self.providers.sample(rng)];

        let mut battery_pct = (state.battery_pct
            - rng.gen_range(config.battery_drain_min_pct..=config.battery_drain_max_pct))
        .max(0.0);
        if battery_pct < config.battery_recharge_below_pct {
            battery_pct = 100.0;
        }

        let device_status = if battery_pct < config.low_power_below_pct {
            DeviceStatus::LowPower
        } else if rng.gen_bool(config.transient_status_probability) {
            if rng.gen_bool(0.5) {
                DeviceStatus::ScreenOff
            } else {
                DeviceStatus::NoSignal
            }
        } else {
            DeviceStatus::Active
        };

        if self.modes.sudden_dropout && rng.gen_bool(config.dropout_step_probability) {
            let gap = Duration::minutes(
                rng.gen_range(config.dropout_gap_minutes_min..config.dropout_gap_minutes_max),
            );
            let next = SimState {
                clock: state.clock + gap,
                battery_pct,
                ..state
            };
            return (next, StepOutcome::Dropout { gap });
        }

        let sample = LocationSample {
            subject_id: self.profile.subject_id.clone(),
            timestamp: state.clock,
            coordinate,
            speed_m_s,
            accuracy_m,
            provider,
            battery_pct: battery_level(battery_pct),
            device_status,
        };

        let clock = state.clock
            + Duration::minutes(
                rng.gen_range(config.sample_gap_minutes_min..config.sample_gap_minutes_max),
            );
        let itinerary_index = if clock > target.planned_arrival {
            state.itinerary_index + 1
        } else {
            state.itinerary_index
        };

        let next = SimState {
            clock,
            last_coordinate: Some(coordinate),
            battery_pct,
            itinerary_index,
        };
        (next, StepOutcome::Emitted(sample))
    }

    /// Runs steps until [`StepOutcome::Finished`], collecting emitted
    /// samples in timestamp order.
    pub fn run<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<LocationSample> {
        let mut state = SimState::start(self.profile);
        let mut samples = Vec::new();
        let mut dropouts = 0_usize;

        loop {
            let (next, outcome) = self.step(state, rng);
            state = next;
            match outcome {
                StepOutcome::Emitted(sample) => samples.push(sample),
                StepOutcome::Dropout { .. } => dropouts += 1,
                StepOutcome::Finished => break,
            }
        }

        log::trace!(
            "Subject {}: {} samples, {dropouts} dropouts, reached waypoint {}/{}",
            self.profile.subject_id,
            samples.len(),
            state.itinerary_index,
            self.profile.itinerary.len()
        );

        samples
    }
}

/// Whole-percent battery level, truncated.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn battery_level(pct: f64) -> u8 {
    pct.clamp(0.0, 100.0) as u8
}
