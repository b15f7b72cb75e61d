//! Geodesic polyline utilities.
//!
//! Distance-parameterised operations over WGS84 polylines: haversine
//! distance, cumulative distance tables, interpolation at a target
//! distance, sub-slicing, and splitting into equal-length pieces.
//! All distances are in meters.

use geo::{Intersects, LineString};

use crate::GpsPoint;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance between two points in meters.
pub fn haversine_distance(a: &GpsPoint, b: &GpsPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlng = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);

    // h can exceed 1.0 by an ulp on near-antipodal inputs
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Total length of a polyline in meters.
pub fn polyline_length(points: &[GpsPoint]) -> f64 {
    points
        .windows(2)
        .map(|w| haversine_distance(&w[0], &w[1]))
        .sum()
}

/// Cumulative distances along a polyline.
/// Returns a vector where `dist[i]` is the distance from the start to point `i`.
pub fn cumulative_distances(points: &[GpsPoint]) -> Vec<f64> {
    let mut distances = Vec::with_capacity(points.len());
    distances.push(0.0);

    for i in 1..points.len() {
        let prev = distances[i - 1];
        distances.push(prev + haversine_distance(&points[i - 1], &points[i]));
    }

    distances
}

/// Linear interpolation between two points at the given ratio.
pub fn interpolate(a: &GpsPoint, b: &GpsPoint, ratio: f64) -> GpsPoint {
    GpsPoint::new(
        a.latitude + ratio * (b.latitude - a.latitude),
        a.longitude + ratio * (b.longitude - a.longitude),
    )
}

/// Find the point at a specific distance along the polyline.
/// Interpolates between vertices when the distance falls inside an edge.
pub fn point_at_distance(points: &[GpsPoint], cumulative: &[f64], target: f64) -> GpsPoint {
    debug_assert_eq!(points.len(), cumulative.len());

    if points.is_empty() {
        return GpsPoint::new(0.0, 0.0);
    }
    if target <= 0.0 {
        return points[0];
    }
    let total = *cumulative.last().unwrap_or(&0.0);
    if target >= total {
        return *points.last().unwrap();
    }

    // First vertex at or past the target distance
    let idx = match cumulative.binary_search_by(|d| d.partial_cmp(&target).unwrap()) {
        Ok(i) => return points[i],
        Err(i) => i - 1,
    };

    let seg_len = cumulative[idx + 1] - cumulative[idx];
    if seg_len < 1e-9 {
        return points[idx];
    }

    let ratio = (target - cumulative[idx]) / seg_len;
    interpolate(&points[idx], &points[idx + 1], ratio)
}

/// Slice a polyline between two distances along it, in meters.
///
/// The result starts at the interpolated point at `start`, contains every
/// original vertex strictly between the two cut distances, and ends at the
/// interpolated point at `end`. Mirrors `turf.lineSliceAlong` semantics.
pub fn slice_along(points: &[GpsPoint], start: f64, end: f64) -> Vec<GpsPoint> {
    if points.len() < 2 || end <= start {
        return Vec::new();
    }

    let cumulative = cumulative_distances(points);
    let total = *cumulative.last().unwrap();
    let start = start.max(0.0);
    let end = end.min(total);
    if end <= start {
        return Vec::new();
    }

    let mut out = vec![point_at_distance(points, &cumulative, start)];
    for (i, &d) in cumulative.iter().enumerate() {
        if d > start && d < end {
            out.push(points[i]);
        }
    }
    out.push(point_at_distance(points, &cumulative, end));
    out
}

/// Split a polyline into exactly `n` pieces of equal length.
///
/// Each piece starts where the previous one ended; boundary points are
/// interpolated so that piece lengths match to floating-point precision.
pub fn split_into_equal_pieces(points: &[GpsPoint], n: usize) -> Vec<Vec<GpsPoint>> {
    if points.len() < 2 || n == 0 {
        return Vec::new();
    }
    if n == 1 {
        return vec![points.to_vec()];
    }

    let cumulative = cumulative_distances(points);
    let total = *cumulative.last().unwrap();
    if total <= 0.0 {
        return vec![points.to_vec()];
    }
    let piece_len = total / n as f64;

    let mut pieces = Vec::with_capacity(n);
    let mut current = vec![points[0]];
    let mut next_cut = piece_len;

    for i in 1..points.len() {
        let edge_end = cumulative[i];

        // An edge may span several cut boundaries
        while edge_end >= next_cut && pieces.len() < n - 1 {
            let boundary = point_at_distance(points, &cumulative, next_cut);
            current.push(boundary);
            pieces.push(std::mem::replace(&mut current, vec![boundary]));
            next_cut += piece_len;
        }

        if current.last() != Some(&points[i]) {
            current.push(points[i]);
        }
    }

    if current.len() >= 2 {
        pieces.push(current);
    }
    pieces
}

/// Whether two polylines touch or cross anywhere.
///
/// Shared endpoints count as touching, matching `turf.lineIntersect`
/// producing a non-empty feature set for adjacent streets.
pub fn lines_touch(a: &[GpsPoint], b: &[GpsPoint]) -> bool {
    if a.len() < 2 || b.len() < 2 {
        return false;
    }
    to_line_string(a).intersects(&to_line_string(b))
}

/// Concatenate a sequence of touching polylines into one.
///
/// A joint vertex shared between consecutive polylines is emitted once.
pub fn combine(polylines: &[&[GpsPoint]]) -> Vec<GpsPoint> {
    let mut out: Vec<GpsPoint> = Vec::new();
    for line in polylines {
        for &p in line.iter() {
            if out.last() != Some(&p) {
                out.push(p);
            }
        }
    }
    out
}

/// Convert a polyline to a `geo::LineString` (x = longitude, y = latitude).
pub fn to_line_string(points: &[GpsPoint]) -> LineString<f64> {
    LineString::from(
        points
            .iter()
            .map(|p| (p.longitude, p.latitude))
            .collect::<Vec<_>>(),
    )
}

/// Whether a chunk geometry is degenerate: fewer than two coordinates, or
/// all coordinates collapsed onto one point. Such pieces are floating-point
/// boundary artifacts and are filtered rather than surfaced as errors.
pub fn is_degenerate(points: &[GpsPoint]) -> bool {
    points.len() < 2 || points.windows(2).all(|w| w[0] == w[1])
}
