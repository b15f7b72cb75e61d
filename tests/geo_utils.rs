//! Tests for geodesic polyline utilities

use ratermatch::geo_utils::*;
use ratermatch::GpsPoint;

/// Degrees of latitude spanning the given distance in meters.
fn deg_lat(meters: f64) -> f64 {
    meters / EARTH_RADIUS_M * 180.0 / std::f64::consts::PI
}

/// A north-south polyline of the given length, split over `n` vertices.
fn meridian_line(length_m: f64, vertices: usize) -> Vec<GpsPoint> {
    (0..vertices)
        .map(|i| {
            let frac = i as f64 / (vertices - 1) as f64;
            GpsPoint::new(47.6 + deg_lat(length_m * frac), -122.33)
        })
        .collect()
}

#[test]
fn test_haversine_known_distance() {
    // 0.001 degrees of latitude is ~111 meters
    let a = GpsPoint::new(47.6, -122.33);
    let b = GpsPoint::new(47.601, -122.33);
    let d = haversine_distance(&a, &b);
    assert!((d - 111.2).abs() < 1.0, "got {d}");
}

#[test]
fn test_haversine_zero_for_same_point() {
    let p = GpsPoint::new(47.6, -122.33);
    assert_eq!(haversine_distance(&p, &p), 0.0);
}

#[test]
fn test_polyline_length_sums_edges() {
    let line = meridian_line(1000.0, 5);
    let total = polyline_length(&line);
    assert!((total - 1000.0).abs() < 0.01, "got {total}");
}

#[test]
fn test_cumulative_distances_monotonic() {
    let line = meridian_line(1000.0, 5);
    let cumulative = cumulative_distances(&line);
    assert_eq!(cumulative.len(), line.len());
    assert_eq!(cumulative[0], 0.0);
    for w in cumulative.windows(2) {
        assert!(w[1] > w[0]);
    }
}

#[test]
fn test_point_at_distance_interpolates() {
    let line = meridian_line(1000.0, 2);
    let cumulative = cumulative_distances(&line);

    let midpoint = point_at_distance(&line, &cumulative, 500.0);
    let expected_lat = 47.6 + deg_lat(500.0);
    assert!((midpoint.latitude - expected_lat).abs() < 1e-7);
    assert_eq!(midpoint.longitude, -122.33);
}

#[test]
fn test_point_at_distance_clamps_to_ends() {
    let line = meridian_line(1000.0, 3);
    let cumulative = cumulative_distances(&line);

    assert_eq!(point_at_distance(&line, &cumulative, -5.0), line[0]);
    assert_eq!(point_at_distance(&line, &cumulative, 5000.0), line[2]);
}

#[test]
fn test_slice_along_length() {
    let line = meridian_line(1000.0, 11);
    let slice = slice_along(&line, 250.0, 750.0);
    let len = polyline_length(&slice);
    assert!((len - 500.0).abs() < 0.01, "got {len}");
}

#[test]
fn test_slice_along_keeps_interior_vertices() {
    let line = meridian_line(1000.0, 11);
    // vertices every 100 m; interior vertices at 300..700 survive
    let slice = slice_along(&line, 250.0, 750.0);
    assert_eq!(slice.len(), 2 + 5);
}

#[test]
fn test_slice_along_empty_for_inverted_range() {
    let line = meridian_line(1000.0, 3);
    assert!(slice_along(&line, 700.0, 300.0).is_empty());
}

#[test]
fn test_split_into_equal_pieces_count_and_lengths() {
    let line = meridian_line(900.0, 4);
    let pieces = split_into_equal_pieces(&line, 3);
    assert_eq!(pieces.len(), 3);

    let total: f64 = pieces.iter().map(|p| polyline_length(p)).sum();
    assert!((total - 900.0).abs() < 0.01, "got {total}");

    for piece in &pieces {
        let len = polyline_length(piece);
        assert!((len - 300.0).abs() < 0.5, "piece length {len}");
    }
}

#[test]
fn test_split_single_piece_returns_whole_line() {
    let line = meridian_line(500.0, 3);
    let pieces = split_into_equal_pieces(&line, 1);
    assert_eq!(pieces.len(), 1);
    assert_eq!(pieces[0], line);
}

#[test]
fn test_split_pieces_share_boundaries() {
    let line = meridian_line(1000.0, 2);
    let pieces = split_into_equal_pieces(&line, 4);
    assert_eq!(pieces.len(), 4);
    for w in pieces.windows(2) {
        assert_eq!(w[0].last(), w[1].first());
    }
}

#[test]
fn test_lines_touch_at_shared_endpoint() {
    let a = meridian_line(200.0, 2);
    let b = vec![*a.last().unwrap(), GpsPoint::new(47.7, -122.33)];
    assert!(lines_touch(&a, &b));
}

#[test]
fn test_lines_touch_false_for_disjoint() {
    let a = meridian_line(200.0, 2);
    let b = vec![GpsPoint::new(40.0, -74.0), GpsPoint::new(40.01, -74.0)];
    assert!(!lines_touch(&a, &b));
}

#[test]
fn test_combine_dedups_joint_vertex() {
    let a = meridian_line(200.0, 3);
    let b = vec![*a.last().unwrap(), GpsPoint::new(47.7, -122.33)];
    let combined = combine(&[a.as_slice(), b.as_slice()]);
    assert_eq!(combined.len(), a.len() + b.len() - 1);
}

#[test]
fn test_is_degenerate() {
    let p = GpsPoint::new(47.6, -122.33);
    assert!(is_degenerate(&[]));
    assert!(is_degenerate(&[p]));
    assert!(is_degenerate(&[p, p]));
    assert!(!is_degenerate(&meridian_line(100.0, 2)));
}
