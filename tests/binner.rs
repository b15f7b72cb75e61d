//! Tests for cluster-aware label binning

use ratermatch::geo_utils::EARTH_RADIUS_M;
use ratermatch::{
    bin, CountCategory, EvalConfig, EvalError, GpsPoint, Label, LabelType, StreetSegment,
};

fn deg_lat(meters: f64) -> f64 {
    meters / EARTH_RADIUS_M * 180.0 / std::f64::consts::PI
}

/// Two parallel 200 m streets, 1 km apart east-west.
fn two_streets() -> Vec<StreetSegment> {
    vec![
        StreetSegment::new(
            1,
            1,
            vec![
                GpsPoint::new(47.6, -122.33),
                GpsPoint::new(47.6 + deg_lat(200.0), -122.33),
            ],
        ),
        StreetSegment::new(
            1,
            2,
            vec![
                GpsPoint::new(47.6, -122.32),
                GpsPoint::new(47.6 + deg_lat(200.0), -122.32),
            ],
        ),
    ]
}

fn label_near(lng: f64, cluster: i64, label_type: LabelType) -> Label {
    Label::new(label_type, 1, 1, GpsPoint::new(47.6005, lng)).with_cluster(cluster)
}

fn config() -> EvalConfig {
    EvalConfig::default()
}

#[test]
fn test_cluster_assigned_to_nearest_segment() {
    let segments = two_streets();
    let gt = vec![label_near(-122.3301, 1, LabelType::Obstacle)];
    let crowd = vec![label_near(-122.3201, 1, LabelType::Obstacle)];

    let table = bin(&segments, &gt, &crowd, &config()).unwrap();
    let counts = table.counts(CountCategory::Problem).unwrap();

    assert_eq!(counts[0].ground_truth, 1);
    assert_eq!(counts[0].crowd, 0);
    assert_eq!(counts[1].ground_truth, 0);
    assert_eq!(counts[1].crowd, 1);
}

#[test]
fn test_additive_mode_counts_members() {
    let segments = two_streets();
    // one crowd cluster with three raters
    let crowd = vec![
        label_near(-122.3301, 7, LabelType::Obstacle),
        label_near(-122.3302, 7, LabelType::Obstacle),
        label_near(-122.3300, 7, LabelType::Obstacle),
    ];

    let table = bin(&segments, &[], &crowd, &config()).unwrap();
    let counts = table.counts(CountCategory::Problem).unwrap();
    assert_eq!(counts[0].crowd, 3);
    assert_eq!(counts[1].crowd, 0);
}

#[test]
fn test_saturating_mode_caps_at_one() {
    let segments = two_streets();
    let crowd = vec![
        label_near(-122.3301, 7, LabelType::Obstacle),
        label_near(-122.3302, 7, LabelType::Obstacle),
        label_near(-122.3300, 8, LabelType::Obstacle),
    ];

    let cfg = EvalConfig {
        saturating_counts: true,
        ..config()
    };
    let table = bin(&segments, &[], &crowd, &cfg).unwrap();
    let counts = table.counts(CountCategory::Problem).unwrap();
    // two clusters on the same segment still record presence, not count
    assert_eq!(counts[0].crowd, 1);
}

#[test]
fn test_count_conservation_per_label_clusters() {
    // with one cluster per label, the additive sum equals the label count
    let segments = two_streets();
    let gt: Vec<Label> = (0..6)
        .map(|i| label_near(-122.3301 - 0.00001 * i as f64, i, LabelType::CurbRamp))
        .collect();

    let table = bin(&segments, &gt, &[], &config()).unwrap();
    let counts = table.counts(CountCategory::Problem).unwrap();
    let total: u32 = counts.iter().map(|c| c.ground_truth).sum();
    assert_eq!(total, 6);
}

#[test]
fn test_per_type_categories() {
    let segments = two_streets();
    let gt = vec![
        label_near(-122.3301, 1, LabelType::CurbRamp),
        label_near(-122.3302, 2, LabelType::Obstacle),
    ];

    let cfg = EvalConfig {
        merge_problem_categories: false,
        ..config()
    };
    let table = bin(&segments, &gt, &[], &cfg).unwrap();

    let ramps = table.counts(CountCategory::Type(LabelType::CurbRamp)).unwrap();
    let obstacles = table.counts(CountCategory::Type(LabelType::Obstacle)).unwrap();
    assert_eq!(ramps[0].ground_truth, 1);
    assert_eq!(obstacles[0].ground_truth, 1);
    assert!(table.counts(CountCategory::Problem).is_none());
}

#[test]
fn test_representative_is_member_nearest_centroid() {
    let segments = two_streets();
    // two members sit by segment 0, one outlier by segment 1; the
    // centroid leans toward segment 0, so the representative does too
    let crowd = vec![
        label_near(-122.3301, 3, LabelType::Obstacle),
        label_near(-122.3302, 3, LabelType::Obstacle),
        label_near(-122.3201, 3, LabelType::Obstacle),
    ];

    let table = bin(&segments, &[], &crowd, &config()).unwrap();
    let counts = table.counts(CountCategory::Problem).unwrap();
    assert_eq!(counts[0].crowd, 3);
    assert_eq!(counts[1].crowd, 0);
}

#[test]
fn test_low_severity_filter_drops_temporary_members() {
    let segments = two_streets();
    let crowd = vec![
        label_near(-122.3301, 1, LabelType::Obstacle).with_temporary(true),
        label_near(-122.3302, 1, LabelType::Obstacle).with_temporary(false),
    ];

    let cfg = EvalConfig {
        filter_low_severity: true,
        ..config()
    };
    let table = bin(&segments, &[], &crowd, &cfg).unwrap();
    let counts = table.counts(CountCategory::Problem).unwrap();
    assert_eq!(counts[0].crowd, 1);
}

#[test]
fn test_low_severity_filter_can_empty_a_cluster() {
    let segments = two_streets();
    let crowd = vec![
        label_near(-122.3301, 1, LabelType::SurfaceProblem).with_temporary(true),
        label_near(-122.3302, 1, LabelType::SurfaceProblem).with_temporary(true),
    ];

    let cfg = EvalConfig {
        filter_low_severity: true,
        ..config()
    };
    let table = bin(&segments, &[], &crowd, &cfg).unwrap();
    let counts = table.counts(CountCategory::Problem).unwrap();
    assert_eq!(counts[0].crowd, 0);
    assert_eq!(counts[1].crowd, 0);
}

#[test]
fn test_filter_ignores_types_outside_low_severity_set() {
    let segments = two_streets();
    let crowd = vec![label_near(-122.3301, 1, LabelType::CurbRamp).with_temporary(true)];

    let cfg = EvalConfig {
        filter_low_severity: true,
        ..config()
    };
    let table = bin(&segments, &[], &crowd, &cfg).unwrap();
    let counts = table.counts(CountCategory::Problem).unwrap();
    assert_eq!(counts[0].crowd, 1);
}

#[test]
fn test_missing_cluster_id_is_an_error() {
    let segments = two_streets();
    let crowd = vec![Label::new(
        LabelType::Obstacle,
        1,
        1,
        GpsPoint::new(47.6005, -122.3301),
    )];

    let result = bin(&segments, &[], &crowd, &config());
    assert!(matches!(
        result,
        Err(EvalError::MissingClusterId { source: "crowd", .. })
    ));
}

#[test]
fn test_empty_segment_set_yields_empty_table() {
    let gt = vec![label_near(-122.3301, 1, LabelType::Obstacle)];
    let table = bin(&[], &gt, &[], &config()).unwrap();
    assert_eq!(table.segment_count(), 0);
    assert!(table.counts(CountCategory::Problem).unwrap().is_empty());
}

#[test]
fn test_segment_without_labels_keeps_zero_counts() {
    let segments = two_streets();
    let gt = vec![label_near(-122.3301, 1, LabelType::Obstacle)];

    let table = bin(&segments, &gt, &[], &config()).unwrap();
    let counts = table.counts(CountCategory::Problem).unwrap();
    assert_eq!(counts[1].ground_truth, 0);
    assert_eq!(counts[1].crowd, 0);
}
