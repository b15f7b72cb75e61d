//! Tests for the synthetic dataset generator

use ratermatch::synthetic::SyntheticScenario;

#[test]
fn test_generation_is_deterministic() {
    let scenario = SyntheticScenario::default();
    let a = scenario.generate();
    let b = scenario.generate();

    assert_eq!(a.streets, b.streets);
    assert_eq!(a.ground_truth, b.ground_truth);
    assert_eq!(a.crowd, b.crowd);
}

#[test]
fn test_generated_counts_match_scenario() {
    let scenario = SyntheticScenario {
        condition_count: 2,
        routes_per_condition: 3,
        streets_per_route: 4,
        occurrences_per_route: 5,
        ..SyntheticScenario::default()
    };
    let dataset = scenario.generate();

    assert_eq!(dataset.streets.len(), 2 * 3 * 4);
    assert_eq!(dataset.ground_truth.len(), 2 * 3 * 5);
}

#[test]
fn test_streets_form_contiguous_routes() {
    let dataset = SyntheticScenario::default().generate();

    // consecutive streets of the same route share an endpoint
    for pair in dataset.streets.windows(2) {
        if pair[0].route_id == pair[1].route_id {
            assert_eq!(pair[0].points.last(), pair[1].points.first());
        }
    }
}

#[test]
fn test_crowd_labels_are_clustered() {
    let dataset = SyntheticScenario::default().generate();
    assert!(dataset.crowd.iter().all(|l| l.cluster_id.is_some()));
}

#[test]
fn test_different_seeds_differ() {
    let a = SyntheticScenario::default().generate();
    let b = SyntheticScenario {
        seed: 7,
        ..SyntheticScenario::default()
    }
    .generate();

    assert_ne!(a.ground_truth, b.ground_truth);
}
