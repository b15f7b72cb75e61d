//! Synthetic street network and label generator.
//!
//! Generates a street network with known ground-truth/crowd agreement
//! characteristics, for demos and validation of the evaluation pipeline.
//! Generation is fully deterministic under a fixed seed.
//!
//! # Example
//!
//! ```rust
//! use ratermatch::synthetic::SyntheticScenario;
//!
//! let dataset = SyntheticScenario::default().generate();
//! assert!(!dataset.streets.is_empty());
//! assert!(!dataset.ground_truth.is_empty());
//! ```

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

use crate::{GpsPoint, Label, LabelType, StreetSegment};

// ============================================================================
// Coordinate Helpers
// ============================================================================

/// Meters per degree of latitude (approximately constant).
const METERS_PER_DEG_LAT: f64 = 111_320.0;

/// Convert meters to degrees of latitude.
fn meters_to_deg_lat(meters: f64) -> f64 {
    meters / METERS_PER_DEG_LAT
}

/// Convert meters to degrees of longitude at a given latitude.
fn meters_to_deg_lng(meters: f64, latitude: f64) -> f64 {
    meters / (METERS_PER_DEG_LAT * latitude.to_radians().cos())
}

/// Standard normal sample via Box-Muller.
fn gauss(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(1e-12);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

// ============================================================================
// Types
// ============================================================================

/// Scenario configuration for generating synthetic data.
#[derive(Debug, Clone)]
pub struct SyntheticScenario {
    /// Origin point for all generated data.
    pub origin: GpsPoint,
    /// Number of experimental conditions.
    pub condition_count: usize,
    /// Routes per condition.
    pub routes_per_condition: usize,
    /// Consecutive streets per route (each touching the next).
    pub streets_per_route: usize,
    /// Length of each street in meters.
    pub street_length_m: f64,
    /// Ground-truth occurrences per route.
    pub occurrences_per_route: usize,
    /// Crowd labels generated per detected occurrence.
    pub crowd_raters: usize,
    /// GPS scatter of crowd labels around an occurrence, in meters.
    pub crowd_noise_sigma_m: f64,
    /// Fraction of occurrences the crowd misses entirely (0.0-1.0).
    pub miss_rate: f64,
    /// Spurious crowd occurrences per route.
    pub false_positives_per_route: usize,
    /// RNG seed for deterministic reproduction.
    pub seed: u64,
}

impl Default for SyntheticScenario {
    fn default() -> Self {
        Self {
            origin: GpsPoint::new(47.6062, -122.3321),
            condition_count: 2,
            routes_per_condition: 3,
            streets_per_route: 4,
            street_length_m: 120.0,
            occurrences_per_route: 5,
            crowd_raters: 3,
            crowd_noise_sigma_m: 4.0,
            miss_rate: 0.2,
            false_positives_per_route: 1,
            seed: 42,
        }
    }
}

/// A complete synthetic dataset.
pub struct SyntheticDataset {
    /// Street network, ordered along each route's traversal path.
    pub streets: Vec<StreetSegment>,
    /// Ground-truth labels, one per occurrence, unclustered.
    pub ground_truth: Vec<Label>,
    /// Crowd labels, clustered per occurrence via `cluster_id`.
    pub crowd: Vec<Label>,
}

// ============================================================================
// Generation
// ============================================================================

impl SyntheticScenario {
    /// Generate the street network and both label collections.
    pub fn generate(&self) -> SyntheticDataset {
        let mut rng = StdRng::seed_from_u64(self.seed);

        let mut streets = Vec::new();
        let mut ground_truth = Vec::new();
        let mut crowd = Vec::new();

        let mut route_id = 0i64;
        let mut street_edge_id = 0i64;
        let mut crowd_cluster_id = 0i64;

        for condition_idx in 0..self.condition_count {
            let condition_id = condition_idx as i64 + 1;
            // each condition occupies its own east-west corridor
            let base_lat =
                self.origin.latitude + meters_to_deg_lat(condition_idx as f64 * 2_000.0);

            for route_idx in 0..self.routes_per_condition {
                route_id += 1;
                let route_lat = base_lat + meters_to_deg_lat(route_idx as f64 * 400.0);
                let route_len = self.street_length_m * self.streets_per_route as f64;

                // consecutive streets sharing endpoints, heading east
                let mut offset = 0.0;
                for _ in 0..self.streets_per_route {
                    street_edge_id += 1;
                    let start_lng = self.origin.longitude
                        + meters_to_deg_lng(offset, route_lat);
                    let end_lng = self.origin.longitude
                        + meters_to_deg_lng(offset + self.street_length_m, route_lat);
                    streets.push(StreetSegment::new(
                        route_id,
                        street_edge_id,
                        vec![
                            GpsPoint::new(route_lat, start_lng),
                            GpsPoint::new(route_lat, end_lng),
                        ],
                    ));
                    offset += self.street_length_m;
                }

                for _ in 0..self.occurrences_per_route {
                    let along = rng.gen_range(0.0..route_len);
                    let label_type = random_label_type(&mut rng);
                    let occurrence = GpsPoint::new(
                        route_lat + meters_to_deg_lat(gauss(&mut rng) * 2.0),
                        self.origin.longitude + meters_to_deg_lng(along, route_lat),
                    );

                    ground_truth.push(Label::new(
                        label_type,
                        condition_id,
                        route_id,
                        occurrence,
                    ));

                    // the crowd sees most occurrences, with GPS scatter
                    if rng.gen::<f64>() >= self.miss_rate {
                        crowd_cluster_id += 1;
                        for _ in 0..self.crowd_raters {
                            let scattered = GpsPoint::new(
                                occurrence.latitude
                                    + meters_to_deg_lat(gauss(&mut rng) * self.crowd_noise_sigma_m),
                                occurrence.longitude
                                    + meters_to_deg_lng(
                                        gauss(&mut rng) * self.crowd_noise_sigma_m,
                                        route_lat,
                                    ),
                            );
                            crowd.push(
                                Label::new(label_type, condition_id, route_id, scattered)
                                    .with_cluster(crowd_cluster_id),
                            );
                        }
                    }
                }

                for _ in 0..self.false_positives_per_route {
                    crowd_cluster_id += 1;
                    let along = rng.gen_range(0.0..route_len);
                    let spurious = GpsPoint::new(
                        route_lat + meters_to_deg_lat(gauss(&mut rng) * 3.0),
                        self.origin.longitude + meters_to_deg_lng(along, route_lat),
                    );
                    crowd.push(
                        Label::new(random_label_type(&mut rng), condition_id, route_id, spurious)
                            .with_cluster(crowd_cluster_id),
                    );
                }
            }
        }

        SyntheticDataset {
            streets,
            ground_truth,
            crowd,
        }
    }
}

fn random_label_type(rng: &mut StdRng) -> LabelType {
    let analyzed = LabelType::analyzed();
    analyzed[rng.gen_range(0..analyzed.len())]
}
