//! Dataset generation settings.
//!
//! [`GenerateConfig`] bundles every tunable of the pipeline. It loads from
//! TOML with all keys optional; the commented default file is embedded as
//! [`DEFAULT_CONFIG_TOML`].

use std::path::Path;

use serde::{Deserialize, Serialize};
use tourist_safety_features::SyntheticSignalConfig;
use tourist_safety_scoring::LabelConfig;
use tourist_safety_simulation::{SimulationConfig, SimulationError};
use tourist_safety_spatial::SyntheticRiskConfig;

use crate::GenerateError;

/// The default configuration file, with every key spelled out.
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../config/default.toml");

/// Fractions of subjects assigned to the training and validation splits.
/// The remainder goes to the test split.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Default `0.7`.
    pub train_fraction: f64,
    /// Default `0.15`.
    pub val_fraction: f64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            train_fraction: 0.7,
            val_fraction: 0.15,
        }
    }
}

impl SplitConfig {
    /// Checks that both fractions lie in `[0, 1]` and sum to at most `1`.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError::Config`] otherwise.
    pub fn validate(&self) -> Result<(), GenerateError> {
        let valid = (0.0..=1.0).contains(&self.train_fraction)
            && (0.0..=1.0).contains(&self.val_fraction)
            && self.train_fraction + self.val_fraction <= 1.0;
        if valid {
            Ok(())
        } else {
            Err(GenerateError::Config {
                message: format!(
                    "split fractions must lie in [0, 1] and sum to at most 1, got train {} val {}",
                    self.train_fraction, self.val_fraction
                ),
            })
        }
    }
}

/// Everything needed to reproduce a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateConfig {
    /// Number of subjects to simulate.
    pub num_subjects: usize,
    /// Run seed. Each subject's stream is derived from this and its index.
    pub seed: u64,
    /// Profile, trajectory, and anomaly-injection parameters.
    pub simulation: SimulationConfig,
    /// Noise of the anchor-based area risk used for training features.
    pub synthetic_risk: SyntheticRiskConfig,
    /// Prior-incident and SOS rates.
    pub signals: SyntheticSignalConfig,
    /// Label formula.
    pub labels: LabelConfig,
    /// Subject-level split.
    pub split: SplitConfig,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            num_subjects: 1000,
            seed: 42,
            simulation: SimulationConfig::default(),
            synthetic_risk: SyntheticRiskConfig::default(),
            signals: SyntheticSignalConfig::default(),
            labels: LabelConfig::default(),
            split: SplitConfig::default(),
        }
    }
}

impl GenerateConfig {
    /// Parses a TOML document. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError::Toml`] if the document is malformed.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, GenerateError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError::Io`] if the file cannot be read, or
    /// [`GenerateError::Toml`] if it is malformed.
    pub fn load(path: &Path) -> Result<Self, GenerateError> {
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&contents)?;
        log::debug!("Loaded generation config from {}", path.display());
        Ok(config)
    }

    /// Validates the simulation and split settings. Risk, signal, and
    /// label settings are validated when their samplers are built.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError`] naming the first invalid setting.
    pub fn validate(&self) -> Result<(), GenerateError> {
        self.simulation
            .validate()
            .map_err(SimulationError::from)?;
        self.split.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_default_matches_default() {
        let parsed = GenerateConfig::from_toml_str(DEFAULT_CONFIG_TOML).unwrap();
        assert_eq!(parsed, GenerateConfig::default());
    }

    #[test]
    fn empty_document_is_default() {
        assert_eq!(
            GenerateConfig::from_toml_str("").unwrap(),
            GenerateConfig::default()
        );
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let config = GenerateConfig::from_toml_str(
            "num_subjects = 5\n[simulation]\ninject_anomalies = false\n[split]\ntrain_fraction = 0.5\n",
        )
        .unwrap();

        assert_eq!(config.num_subjects, 5);
        assert_eq!(config.seed, 42);
        assert!(!config.simulation.inject_anomalies);
        assert!((config.simulation.route_deviation_probability - 0.15).abs() < f64::EPSILON);
        assert!((config.split.train_fraction - 0.5).abs() < f64::EPSILON);
        assert!((config.split.val_fraction - 0.15).abs() < f64::EPSILON);
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(matches!(
            GenerateConfig::from_toml_str("num_subjects = \"many\""),
            Err(GenerateError::Toml(_))
        ));
    }

    #[test]
    fn split_fractions_are_checked() {
        let config = GenerateConfig {
            split: SplitConfig {
                train_fraction: 0.9,
                val_fraction: 0.2,
            },
            ..GenerateConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(GenerateError::Config { .. })
        ));
        assert!(GenerateConfig::default().validate().is_ok());
    }

    #[test]
    fn invalid_simulation_is_reported() {
        let mut config = GenerateConfig::default();
        config.simulation.sudden_dropout_probability = 1.5;
        assert!(matches!(
            config.validate(),
            Err(GenerateError::Simulation(_))
        ));
    }

    #[test]
    fn load_reads_file() {
        let tmp = std::env::temp_dir().join("tourist_safety_generate_config_test");
        std::fs::create_dir_all(&tmp).unwrap();
        let path = tmp.join("config.toml");
        std::fs::write(&path, "seed = 7\n").unwrap();

        let config = GenerateConfig::load(&path).unwrap();
        assert_eq!(config.seed, 7);

        assert!(matches!(
            GenerateConfig::load(&tmp.join("missing.toml")),
            Err(GenerateError::Io(_))
        ));
        let _ = std::fs::remove_dir_all(&tmp);
    }
}
