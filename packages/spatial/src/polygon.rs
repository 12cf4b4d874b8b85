//! Point-in-polygon membership.
//!
//! Membership is delegated to [`geo::Contains`] on a polygon whose x axis
//! is longitude and y axis is latitude.

use geo::{Contains as _, LineString, Polygon};
use tourist_safety_trajectory_models::Coordinate;

/// Builds a hole-free polygon from an ordered ring of vertices. The ring
/// is closed if its last vertex does not repeat the first.
#[must_use]
pub fn ring_polygon(ring: &[Coordinate]) -> Polygon<f64> {
    let exterior: LineString<f64> = ring
        .iter()
        .map(|c| (c.longitude(), c.latitude()))
        .collect::<Vec<_>>()
        .into();
    Polygon::new(exterior, vec![])
}

/// Returns `true` if `polygon` contains `point`.
///
/// Polygons whose exterior has fewer than 3 distinct vertices never
/// contain anything. Points exactly on the boundary are outside.
#[must_use]
pub fn polygon_contains(polygon: &Polygon<f64>, point: &Coordinate) -> bool {
    if polygon.exterior().0.len().saturating_sub(1) < 3 {
        return false;
    }
    polygon.contains(&geo::Point::new(point.longitude(), point.latitude()))
}

/// Returns `true` if `point` lies inside the simple polygon described by
/// `ring` (an ordered list of vertices, closing vertex optional).
///
/// Rings with fewer than 3 vertices never contain anything.
#[must_use]
pub fn point_in_polygon(point: &Coordinate, ring: &[Coordinate]) -> bool {
    if ring.len() < 3 {
        return false;
    }
    polygon_contains(&ring_polygon(ring), point)
}
