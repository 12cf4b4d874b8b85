#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Safety labels, alert fusion, and inference.
//!
//! * [`label`] synthesizes noisy 0-100 training labels from feature vectors.
//! * [`rules`] and [`fusion`] turn a feature vector and two outlier-scorer
//!   outputs into a severity-tiered [`Alert`].
//! * [`inference`] scores batches of live records against externally
//!   trained scorers implementing the [`scorer`] traits.
//!
//! [`Alert`]: tourist_safety_features_models::Alert

pub mod explain;
pub mod fusion;
pub mod inference;
pub mod label;
pub mod rules;
pub mod scorer;

pub use explain::explain;
pub use fusion::{FusedSeverity, fuse, fuse_alert};
pub use inference::{BatchOutcome, InferenceEngine, RecordRejection};
pub use label::{LabelConfig, LabelSynthesizer, finalize_score, synthesize_score};
pub use rules::{AlertThresholds, RuleOutcome, evaluate_rules};
pub use scorer::{
    OUTLIER_INPUT_COLUMNS, OutlierFeatures, OutlierScorer, SafetyPrediction, SafetyScorer,
    ScorerError,
};

/// Errors that can occur while labelling or scoring.
#[derive(Debug, thiserror::Error)]
pub enum ScoringError {
    /// A configuration value is invalid.
    #[error("invalid scoring configuration: {message}")]
    Config {
        /// Description of what went wrong.
        message: String,
    },

    /// An external scorer failed.
    #[error(transparent)]
    Scorer(#[from] ScorerError),
}
