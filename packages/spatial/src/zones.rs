//! Geofence zones and an R-tree index over them.
//!
//! Zones are loaded from a `GeoJSON` `FeatureCollection` whose features
//! carry a `zone_type` property (`restricted` or `high_risk`) and an
//! optional `name`. Each polygon's exterior ring becomes one indexed zone;
//! membership is an envelope lookup followed by [`geo::Contains`].

use geo::{BoundingRect as _, Polygon};
use geojson::GeoJson;
use rstar::{AABB, RTree, RTreeObject};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use tourist_safety_trajectory_models::Coordinate;

use crate::SpatialError;
use crate::polygon::{polygon_contains, ring_polygon};

/// What a geofence zone means for a subject inside it.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ZoneKind {
    /// Entry is prohibited or requires a permit.
    Restricted,
    /// Elevated incident risk.
    HighRisk,
}

/// A named polygonal geofence.
#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    /// Human-readable zone name.
    pub name: String,
    /// Zone classification.
    pub kind: ZoneKind,
    /// Hole-free polygon in `(longitude, latitude)` order.
    pub polygon: Polygon<f64>,
}

impl Zone {
    /// Builds a zone from an ordered ring of vertices.
    #[must_use]
    pub fn from_ring(name: impl Into<String>, kind: ZoneKind, ring: &[Coordinate]) -> Self {
        Self {
            name: name.into(),
            kind,
            polygon: ring_polygon(ring),
        }
    }

    /// Returns `true` if `coordinate` is inside this zone.
    #[must_use]
    pub fn contains(&self, coordinate: &Coordinate) -> bool {
        polygon_contains(&self.polygon, coordinate)
    }
}

/// A zone stored in the R-tree with its precomputed envelope.
#[derive(Debug, Clone)]
struct ZoneEntry {
    zone: Zone,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for ZoneEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Spatial index over geofence zones.
///
/// Built once at configuration time and shared read-only by every
/// evaluation. Envelopes use `[longitude, latitude]` order.
#[derive(Debug, Clone)]
pub struct ZoneIndex {
    tree: RTree<ZoneEntry>,
}

impl Default for ZoneIndex {
    fn default() -> Self {
        Self::empty()
    }
}

impl ZoneIndex {
    /// Builds an index from the given zones.
    #[must_use]
    pub fn new(zones: Vec<Zone>) -> Self {
        let entries = zones
            .into_iter()
            .map(|zone| {
                let envelope = compute_envelope(&zone.polygon);
                ZoneEntry { zone, envelope }
            })
            .collect();

        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// An index with no zones; nothing is ever contained.
    #[must_use]
    pub fn empty() -> Self {
        Self { tree: RTree::new() }
    }

    /// Parses a `GeoJSON` `FeatureCollection` into a zone index.
    ///
    /// Features without a recognizable `zone_type` or with non-polygonal
    /// geometry are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError`] if the document is not valid `GeoJSON`, is
    /// not a `FeatureCollection`, or contains out-of-range coordinates.
    pub fn from_geojson(geojson_str: &str) -> Result<Self, SpatialError> {
        let geojson: GeoJson = geojson_str.parse()?;
        let GeoJson::FeatureCollection(collection) = geojson else {
            return Err(SpatialError::NotFeatureCollection);
        };

        let mut zones = Vec::new();
        for (i, feature) in collection.features.into_iter().enumerate() {
            let name = feature
                .property("name")
                .and_then(|v| v.as_str())
                .map_or_else(|| format!("zone-{i}"), ToString::to_string);

            let Some(kind) = feature
                .property("zone_type")
                .and_then(|v| v.as_str())
                .and_then(|s| s.parse::<ZoneKind>().ok())
            else {
                log::warn!("Skipping zone {name}: missing or unknown zone_type");
                continue;
            };

            let Some(geometry) = feature.geometry else {
                log::warn!("Skipping zone {name}: no geometry");
                continue;
            };

            let polygons = match geo::Geometry::<f64>::try_from(geometry)? {
                geo::Geometry::Polygon(p) => vec![p],
                geo::Geometry::MultiPolygon(mp) => mp.0,
                _ => {
                    log::warn!("Skipping zone {name}: geometry is not a polygon");
                    continue;
                }
            };

            for polygon in polygons {
                zones.push(Zone {
                    name: name.clone(),
                    kind,
                    polygon: exterior_polygon(polygon)?,
                });
            }
        }

        log::info!("Loaded {} geofence zones into spatial index", zones.len());
        Ok(Self::new(zones))
    }

    /// Number of indexed zones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Returns `true` if the index holds no zones.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Zones whose polygon contains `coordinate`.
    pub fn zones_containing<'a>(
        &'a self,
        coordinate: &'a Coordinate,
    ) -> impl Iterator<Item = &'a Zone> + 'a {
        let query_env = AABB::from_point([coordinate.longitude(), coordinate.latitude()]);
        self.tree
            .locate_in_envelope_intersecting(&query_env)
            .map(|entry| &entry.zone)
            .filter(move |zone| zone.contains(coordinate))
    }

    /// Returns `true` if any zone of the given kind contains `coordinate`.
    #[must_use]
    pub fn contains(&self, kind: ZoneKind, coordinate: &Coordinate) -> bool {
        self.zones_containing(coordinate).any(|z| z.kind == kind)
    }
}

/// Keeps a polygon's exterior ring after checking every vertex is a valid
/// coordinate. Interior rings are dropped.
fn exterior_polygon(polygon: Polygon<f64>) -> Result<Polygon<f64>, SpatialError> {
    for c in polygon.exterior().coords() {
        Coordinate::new(c.y, c.x)?;
    }
    let (exterior, _) = polygon.into_inner();
    Ok(Polygon::new(exterior, vec![]))
}

/// Compute the bounding box envelope for a polygon.
fn compute_envelope(polygon: &Polygon<f64>) -> AABB<[f64; 2]> {
    polygon.bounding_rect().map_or_else(
        || AABB::from_point([0.0, 0.0]),
        |rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
    )
}
