#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Synthetic training-dataset generation.
//!
//! Simulates subjects in parallel, derives their features with the
//! anchor-based area risk and synthetic incident signals, labels every
//! feature vector, and splits subjects (not rows) into train, validation,
//! and test sets. Each subject draws from its own seeded stream, so the
//! dataset depends only on the configuration.

pub mod config;
pub mod dataset;
pub mod interactive;
pub mod output;
pub mod progress;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tourist_safety_features::FeatureError;
use tourist_safety_scoring::ScoringError;
use tourist_safety_simulation::SimulationError;
use tourist_safety_spatial::SpatialError;

pub use config::{DEFAULT_CONFIG_TOML, GenerateConfig, SplitConfig};
pub use dataset::{
    AnomalyModeCounts, Dataset, DatasetSummary, GeneratedSubject, SubjectSplit, TrainingRow,
    generate_dataset, split_subjects,
};
pub use output::write_dataset;
pub use progress::{NullProgress, ProgressCallback, null_progress};

/// Errors that can occur while generating or writing a dataset.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV serialization failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The config file is malformed.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A pipeline setting is invalid.
    #[error("invalid generation configuration: {message}")]
    Config {
        /// Description of what went wrong.
        message: String,
    },

    /// Simulation failed.
    #[error(transparent)]
    Simulation(#[from] SimulationError),

    /// Feature derivation failed.
    #[error(transparent)]
    Feature(#[from] FeatureError),

    /// Labelling failed.
    #[error(transparent)]
    Scoring(#[from] ScoringError),

    /// The risk evaluator could not be built.
    #[error(transparent)]
    Spatial(#[from] SpatialError),
}

/// Default output directory: `data/generated` under the workspace root.
///
/// Resolved at compile time from `CARGO_MANIFEST_DIR`; falls back to a
/// relative `data/generated` if the root cannot be found.
#[must_use]
pub fn output_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .map_or_else(
            || PathBuf::from("data/generated"),
            |root| root.join("data/generated"),
        )
}

/// Generates a dataset and writes it to `dir`.
///
/// # Errors
///
/// Returns [`GenerateError`] if the configuration is invalid or any file
/// cannot be written.
pub fn run(
    config: &GenerateConfig,
    dir: &Path,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<DatasetSummary, GenerateError> {
    log::info!(
        "Generating {} subjects with seed {}",
        config.num_subjects,
        config.seed
    );

    let dataset = generate_dataset(config, progress)?;
    write_dataset(&dataset, dir)?;

    Ok(dataset.summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_dir_ends_in_data_generated() {
        assert!(output_dir().ends_with("data/generated"));
    }

    #[test]
    fn run_writes_and_summarizes() {
        let tmp = std::env::temp_dir().join("tourist_safety_generate_run_test");
        let _ = std::fs::remove_dir_all(&tmp);

        let config = GenerateConfig {
            num_subjects: 3,
            ..GenerateConfig::default()
        };
        let summary = run(&config, &tmp, &null_progress()).unwrap();

        assert_eq!(summary.num_subjects, 3);
        assert!(tmp.join("metadata.json").exists());
        let _ = std::fs::remove_dir_all(&tmp);
    }
}
