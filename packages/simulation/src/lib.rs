#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Synthetic tourist profiles and GPS trajectories.
//!
//! Each subject gets a profile with a planned itinerary, a set of anomaly
//! modes, and a trajectory produced one explicit step at a time. All
//! randomness flows through a caller-supplied RNG; [`subject_rng`] derives
//! an independent stream per subject so runs are reproducible regardless
//! of how subjects are scheduled across threads.

pub mod config;
pub mod profile;
pub mod trajectory;

pub use config::{ProfileConfig, SimulationConfig};
pub use profile::generate_profile;
pub use trajectory::{AnomalyModes, SimState, StepOutcome, TrajectorySimulator};

use rand::Rng;
use rand::SeedableRng as _;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tourist_safety_trajectory_models::{LocationSample, ProfileError, SubjectProfile};

/// An invalid simulation parameter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid simulation configuration: {message}")]
pub struct ConfigError {
    /// Description of what went wrong.
    pub message: String,
}

impl ConfigError {
    /// Creates an error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors that can occur during simulation.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    /// Configuration failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A generated profile violated its invariants.
    #[error("generated profile is invalid: {0}")]
    Profile(#[from] ProfileError),
}

/// One simulated subject: profile, assigned anomaly modes, and the emitted
/// trajectory in timestamp order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatedSubject {
    /// The subject's profile.
    pub profile: SubjectProfile,
    /// Anomaly modes active for this subject.
    pub anomaly_modes: AnomalyModes,
    /// Emitted location samples.
    pub samples: Vec<LocationSample>,
}

/// Simulates a single subject end to end.
///
/// Draw order is fixed: profile, then anomaly modes, then trajectory steps.
///
/// # Errors
///
/// Returns [`SimulationError`] if the configuration is invalid.
pub fn simulate_subject<R: Rng + ?Sized>(
    config: &SimulationConfig,
    rng: &mut R,
) -> Result<SimulatedSubject, SimulationError> {
    let profile = generate_profile(config, rng)?;
    let anomaly_modes = AnomalyModes::draw(config, rng)?;
    let samples = TrajectorySimulator::new(config, &profile, anomaly_modes)?.run(rng);

    if anomaly_modes.any() {
        log::debug!(
            "Subject {} simulated with anomaly modes {anomaly_modes:?}",
            profile.subject_id
        );
    }

    Ok(SimulatedSubject {
        profile,
        anomaly_modes,
        samples,
    })
}

/// Independent RNG stream for the subject at `index` within a run.
///
/// The stream depends only on `(run_seed, index)`, so subjects can be
/// simulated in any order or in parallel with identical results.
#[must_use]
pub fn subject_rng(run_seed: u64, index: usize) -> StdRng {
    StdRng::seed_from_u64(run_seed ^ (index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}
