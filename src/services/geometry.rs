// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Geodesic helpers for field rings.
//!
//! Rings are implicitly cyclic: edge `i` runs from `ring[i]` to
//! `ring[(i + 1) % n]`, and the closing point is never stored twice.

use crate::models::LatLng;
use geo::{ChamberlainDuquetteArea, Distance, HaversineMeasure, LineString, Polygon};

pub const SQUARE_METERS_PER_HECTARE: f64 = 10_000.0;
pub const METERS_PER_KILOMETER: f64 = 1_000.0;

/// WGS84 equatorial radius. Chamberlain–Duquette area uses this radius, so
/// distances must too or edge lengths and area disagree.
pub const EARTH_RADIUS_METERS: f64 = 6_378_137.0;

const EARTH: HaversineMeasure = HaversineMeasure::new(EARTH_RADIUS_METERS);

/// Great-circle distance in meters.
pub fn distance_meters(a: LatLng, b: LatLng) -> f64 {
    EARTH.distance(geo::Point::from(a), geo::Point::from(b))
}

/// Unsigned area on the sphere, in hectares. Rings with fewer than three
/// points have no area.
pub fn area_hectares(ring: &[LatLng]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }
    let exterior: LineString<f64> = ring.iter().map(|p| geo::Coord::from(*p)).collect();
    Polygon::new(exterior, vec![]).chamberlain_duquette_unsigned_area() / SQUARE_METERS_PER_HECTARE
}

/// Midpoint in lat/lng space. Used to anchor edge handles and labels.
pub fn midpoint(a: LatLng, b: LatLng) -> LatLng {
    LatLng::new((a.lat + b.lat) / 2.0, (a.lng + b.lng) / 2.0)
}

/// Length label text: whole meters below 1 km, kilometers with two decimals above.
pub fn format_length(meters: f64) -> String {
    if meters < METERS_PER_KILOMETER {
        format!("{}m", meters.round() as i64)
    } else {
        format!("{:.2}km", meters / METERS_PER_KILOMETER)
    }
}

/// New position for `p2` so that the segment from `p1` measures
/// `new_length_meters`, keeping the direction from `p1` through `p2`.
///
/// The lat/lng delta is scaled linearly by `new / current`. This is an
/// approximation of moving along the bearing that holds for field-sized
/// distances; it is not a geodesic extension.
///
/// Returns `None` when `p1` and `p2` coincide or the target is not finite.
pub fn extend_segment(p1: LatLng, p2: LatLng, new_length_meters: f64) -> Option<LatLng> {
    let current = distance_meters(p1, p2);
    if current == 0.0 || !current.is_finite() || !new_length_meters.is_finite() {
        return None;
    }
    let ratio = new_length_meters / current;
    Some(LatLng::new(
        p1.lat + (p2.lat - p1.lat) * ratio,
        p1.lng + (p2.lng - p1.lng) * ratio,
    ))
}

/// Length of every edge of the ring, in edge index order.
///
/// A ring of two points has two (identical) edges, matching the edge
/// handles shown while drawing.
pub fn edge_lengths(ring: &[LatLng]) -> Vec<f64> {
    let n = ring.len();
    if n < 2 {
        return Vec::new();
    }
    (0..n)
        .map(|i| distance_meters(ring[i], ring[(i + 1) % n]))
        .collect()
}

/// Sum of all edge lengths.
pub fn perimeter_meters(ring: &[LatLng]) -> f64 {
    edge_lengths(ring).iter().sum()
}

/// Ring as a drawable path. Once there are three points the first point is
/// appended to close the outline.
pub fn closed_path(ring: &[LatLng]) -> Vec<LatLng> {
    let mut path = ring.to_vec();
    if ring.len() >= 3 {
        path.push(ring[0]);
    }
    path
}
