//! Tests for nearest-segment selection

use ratermatch::geo_utils::EARTH_RADIUS_M;
use ratermatch::{GpsPoint, SegmentLocator, StreetSegment};

fn deg_lat(meters: f64) -> f64 {
    meters / EARTH_RADIUS_M * 180.0 / std::f64::consts::PI
}

/// A short north-south segment at the given longitude.
fn segment_at(lng: f64) -> StreetSegment {
    StreetSegment::new(
        1,
        1,
        vec![
            GpsPoint::new(47.6, lng),
            GpsPoint::new(47.6 + deg_lat(100.0), lng),
        ],
    )
}

#[test]
fn test_nearest_picks_closer_segment() {
    let segments = vec![segment_at(-122.33), segment_at(-122.32)];
    let locator = SegmentLocator::new(&segments);

    let near_first = GpsPoint::new(47.6004, -122.3299);
    let near_second = GpsPoint::new(47.6004, -122.3201);
    assert_eq!(locator.nearest(&near_first), Some(0));
    assert_eq!(locator.nearest(&near_second), Some(1));
}

#[test]
fn test_nearest_tie_goes_to_lowest_index() {
    // identical geometry at both indices; the first must win
    let segments = vec![segment_at(-122.33), segment_at(-122.33)];
    let locator = SegmentLocator::new(&segments);

    let query = GpsPoint::new(47.6004, -122.3295);
    assert_eq!(locator.nearest(&query), Some(0));
}

#[test]
fn test_nearest_with_distance() {
    let segments = vec![segment_at(-122.33)];
    let locator = SegmentLocator::new(&segments);

    // ~75 m east of the segment at this latitude
    let query = GpsPoint::new(47.6004, -122.329);
    let (idx, dist) = locator.nearest_with_distance(&query).unwrap();
    assert_eq!(idx, 0);
    assert!((dist - 75.0).abs() < 2.0, "distance {dist}");
}

#[test]
fn test_distance_uses_projection_not_endpoints() {
    // a point beside the middle of a long segment is near the segment
    // even though both endpoints are far away
    let long = StreetSegment::new(
        1,
        1,
        vec![
            GpsPoint::new(47.6, -122.33),
            GpsPoint::new(47.6 + deg_lat(2_000.0), -122.33),
        ],
    );
    let locator = SegmentLocator::new(&[long]);

    let beside_middle = GpsPoint::new(47.6 + deg_lat(1_000.0), -122.3299);
    let (_, dist) = locator.nearest_with_distance(&beside_middle).unwrap();
    assert!(dist < 10.0, "distance {dist}");
}

#[test]
fn test_empty_locator() {
    let locator = SegmentLocator::new(&[]);
    assert!(locator.is_empty());
    assert_eq!(locator.nearest(&GpsPoint::new(47.6, -122.33)), None);
}

#[test]
fn test_rtree_path_matches_expected_segments() {
    // 400 segments forces the R-tree strategy; nearest must still be the
    // analytically obvious segment
    let segments: Vec<StreetSegment> = (0..400)
        .map(|i| segment_at(-122.33 + i as f64 * 0.001))
        .collect();
    let locator = SegmentLocator::new(&segments);
    assert_eq!(locator.len(), 400);

    for &i in &[0usize, 17, 211, 399] {
        let lng = -122.33 + i as f64 * 0.001 + 0.0001;
        let query = GpsPoint::new(47.6004, lng);
        assert_eq!(locator.nearest(&query), Some(i), "query near segment {i}");
    }
}

#[test]
fn test_rtree_tie_goes_to_lowest_index() {
    // duplicate geometry far apart in index order, large enough for the
    // R-tree path; a query on that geometry must return the lower index
    let mut segments: Vec<StreetSegment> = (0..300)
        .map(|i| segment_at(-122.33 + i as f64 * 0.001))
        .collect();
    segments.push(segment_at(-122.33 + 50.0 * 0.001)); // duplicate of index 50

    let locator = SegmentLocator::new(&segments);
    let query = GpsPoint::new(47.6004, -122.33 + 50.0 * 0.001);
    assert_eq!(locator.nearest(&query), Some(50));
}
