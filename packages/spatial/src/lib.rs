#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geodesic geometry, geofence zones, and area risk evaluation.
//!
//! Provides haversine distance and point-in-polygon tests, an
//! R-tree index over restricted and high-risk zones loaded from `GeoJSON`,
//! and the [`AreaRiskEvaluator`] that turns a coordinate into a risk score
//! and restricted-zone flag. Used by the simulator, the feature pipeline,
//! and live inference.

pub mod distance;
pub mod polygon;
pub mod registry;
pub mod risk;
pub mod zones;

pub use distance::{EARTH_RADIUS_M, destination_point, great_circle_distance};
pub use polygon::point_in_polygon;
pub use risk::{
    AreaRisk, AreaRiskEvaluator, LiveRiskConfig, LiveRiskEvaluator, RiskAnchor, RiskMode,
    SyntheticRiskConfig, SyntheticRiskEvaluator,
};
pub use zones::{Zone, ZoneIndex, ZoneKind};

use tourist_safety_trajectory_models::CoordinateError;

/// Errors that can occur while building spatial structures.
#[derive(Debug, thiserror::Error)]
pub enum SpatialError {
    /// `GeoJSON` parsing or geometry conversion failed.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// The `GeoJSON` document is not a `FeatureCollection`.
    #[error("expected a GeoJSON FeatureCollection")]
    NotFeatureCollection,

    /// A vertex lies outside the valid coordinate range.
    #[error("invalid zone vertex: {0}")]
    Coordinate(#[from] CoordinateError),

    /// An evaluator parameter is invalid.
    #[error("invalid risk configuration: {message}")]
    Config {
        /// Description of what went wrong.
        message: String,
    },
}
