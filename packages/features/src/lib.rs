#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Feature derivation for tourist location histories.
//!
//! Turns an ordered sequence of [`LocationSample`]s plus the subject's
//! itinerary into one [`FeatureVector`] per sample, either for a whole
//! training trajectory ([`derive_features`]) or for the newest live sample
//! ([`derive_features_for_sample`]). Live reports arriving as loose JSON
//! records are handled by [`InferenceRecord`].
//!
//! [`LocationSample`]: tourist_safety_trajectory_models::LocationSample
//! [`FeatureVector`]: tourist_safety_features_models::FeatureVector

pub mod derive;
pub mod record;
pub mod signals;

pub use derive::{
    ProfileContext, TRAILING_WINDOW_SECS, derive_features, derive_features_for_sample,
    trailing_mean_speed,
};
pub use record::{InferenceRecord, parse_timestamp};
pub use signals::{IncidentSignals, SyntheticSignalConfig, SyntheticSignals};

use tourist_safety_trajectory_models::CoordinateError;

/// Errors that can occur while deriving features or parsing records.
#[derive(Debug, thiserror::Error)]
pub enum FeatureError {
    /// No samples were supplied.
    #[error("sample history is empty")]
    EmptyHistory,

    /// A sample's timestamp does not strictly follow its predecessor.
    #[error("sample {index} is not strictly after the previous sample")]
    OutOfOrder {
        /// Index of the offending sample.
        index: usize,
    },

    /// A sample belongs to a different subject.
    #[error("sample {index} belongs to subject {found}, expected {expected}")]
    SubjectMismatch {
        /// Index of the offending sample.
        index: usize,
        /// Subject the history was derived for.
        expected: String,
        /// Subject on the sample.
        found: String,
    },

    /// The record could not be deserialized.
    #[error("malformed record: {0}")]
    Json(#[from] serde_json::Error),

    /// The record's timestamp matches no supported format.
    #[error("unparseable timestamp: {value}")]
    Timestamp {
        /// The raw timestamp string.
        value: String,
    },

    /// The record's coordinate is out of range.
    #[error(transparent)]
    Coordinate(#[from] CoordinateError),

    /// A record field is out of range.
    #[error("invalid record: {message}")]
    InvalidRecord {
        /// Description of what went wrong.
        message: String,
    },

    /// A signal configuration value is invalid.
    #[error("invalid signal configuration: {message}")]
    Config {
        /// Description of what went wrong.
        message: String,
    },
}
