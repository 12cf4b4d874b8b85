//! Live area-risk lookup for a single coordinate.

use std::path::Path;

use serde::Serialize;
use tourist_safety_spatial::{AreaRisk, LiveRiskConfig, LiveRiskEvaluator, ZoneIndex, ZoneKind};
use tourist_safety_trajectory_models::Coordinate;

/// A zone the coordinate falls in.
#[derive(Debug, Serialize)]
pub struct ZoneHit {
    /// Zone name from the zone file.
    pub name: String,
    /// Whether the zone is restricted or high-risk.
    pub kind: ZoneKind,
}

/// What `area` prints.
#[derive(Debug, Serialize)]
pub struct AreaReport {
    /// Queried latitude in degrees.
    pub latitude: f64,
    /// Queried longitude in degrees.
    pub longitude: f64,
    /// Live risk score and restricted-zone flag.
    #[serde(flatten)]
    pub risk: AreaRisk,
    /// Every zone containing the coordinate.
    pub zones: Vec<ZoneHit>,
}

/// Builds the live evaluator from a `GeoJSON` file, or the embedded zones
/// when `zones_path` is `None`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn evaluator(
    zones_path: Option<&Path>,
) -> Result<LiveRiskEvaluator, Box<dyn std::error::Error>> {
    let config = LiveRiskConfig::default();
    match zones_path {
        Some(path) => {
            let geojson = std::fs::read_to_string(path)?;
            let zones = ZoneIndex::from_geojson(&geojson)?;
            log::info!("Loaded {} zones from {}", zones.len(), path.display());
            Ok(LiveRiskEvaluator::new(zones, config))
        }
        None => Ok(LiveRiskEvaluator::with_default_zones(config)),
    }
}

/// Evaluates `(latitude, longitude)` against `evaluator`.
///
/// # Errors
///
/// Returns an error if the coordinate is out of range.
pub fn report(
    evaluator: &LiveRiskEvaluator,
    latitude: f64,
    longitude: f64,
) -> Result<AreaReport, Box<dyn std::error::Error>> {
    let coordinate = Coordinate::new(latitude, longitude)?;
    let risk = evaluator.evaluate(&coordinate);
    let zones = evaluator
        .zones()
        .zones_containing(&coordinate)
        .map(|zone| ZoneHit {
            name: zone.name.clone(),
            kind: zone.kind,
        })
        .collect();

    Ok(AreaReport {
        latitude,
        longitude,
        risk,
        zones,
    })
}

/// Evaluates a coordinate and prints the report as JSON.
///
/// # Errors
///
/// Returns an error if the zones cannot be loaded or the coordinate is
/// out of range.
pub fn run(
    latitude: f64,
    longitude: f64,
    zones_path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let evaluator = evaluator(zones_path)?;
    let report = report(&evaluator, latitude, longitude)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
