//! Compile-time registry of risk anchors and geofence zones.
//!
//! Anchor catalogs are TOML files under `anchors/` and zone sets are
//! `GeoJSON` files under `zones/`, embedded via `include_str!`.

use serde::Deserialize;

use crate::risk::RiskAnchor;
use crate::zones::ZoneIndex;

/// Number of anchors across all embedded catalogs. Enforced by a test.
#[cfg(test)]
const EXPECTED_ANCHOR_COUNT: usize = 8;

/// Number of zones across all embedded zone sets. Enforced by a test.
#[cfg(test)]
const EXPECTED_ZONE_COUNT: usize = 4;

const ANCHOR_TOMLS: &[(&str, &str)] = &[("mysuru", include_str!("../anchors/mysuru.toml"))];

const DEFAULT_ZONES_GEOJSON: &str = include_str!("../zones/default.geojson");

#[derive(Deserialize)]
struct AnchorCatalog {
    anchors: Vec<RiskAnchor>,
}

/// Returns every embedded risk anchor, in catalog order.
///
/// # Panics
///
/// Panics if any embedded TOML file fails to parse. Since these are
/// compile-time constants, parse failures indicate a development error
/// and are caught by the tests below.
#[must_use]
pub fn default_anchors() -> Vec<RiskAnchor> {
    ANCHOR_TOMLS
        .iter()
        .flat_map(|(name, toml_str)| {
            toml::de::from_str::<AnchorCatalog>(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse anchor catalog '{name}': {e}"))
                .anchors
        })
        .collect()
}

/// Returns the embedded default geofence zones.
///
/// # Panics
///
/// Panics if the embedded `GeoJSON` fails to parse.
#[must_use]
pub fn default_zones() -> ZoneIndex {
    ZoneIndex::from_geojson(DEFAULT_ZONES_GEOJSON)
        .unwrap_or_else(|e| panic!("Failed to parse default zones: {e}"))
}
