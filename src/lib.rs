//! # ratermatch
//!
//! Inter-rater reliability engine for geotagged street-level annotations.
//!
//! Two collections of point labels — a ground-truth set and a crowd set —
//! are binned onto a common set of street segments, and per-segment
//! agreement is summarised as a confusion matrix with precision, recall,
//! specificity and F1.
//!
//! This library provides:
//! - Deterministic chunking of a street network into equal-length
//!   comparison units at multiple granularities
//! - Route clipping to official audited distances
//! - Clustering-aware assignment of point labels to their nearest segment
//! - Confusion-matrix accuracy computation over the resulting counts
//!
//! ## Features
//!
//! - **`parallel`** - Evaluate experimental conditions in parallel with rayon
//!
//! ## Quick Start
//!
//! ```rust
//! use ratermatch::{EvalConfig, EvaluationEngine, GpsPoint, Label, LabelType, StreetSegment};
//!
//! let streets = vec![StreetSegment::new(
//!     1,
//!     10,
//!     vec![GpsPoint::new(47.6062, -122.3321), GpsPoint::new(47.6072, -122.3321)],
//! )];
//! let gt = vec![Label::new(LabelType::CurbRamp, 1, 1, GpsPoint::new(47.6065, -122.3320))];
//! let crowd = vec![Label::new(LabelType::CurbRamp, 1, 1, GpsPoint::new(47.6066, -122.3322))];
//!
//! let engine = EvaluationEngine::new(EvalConfig::default()).unwrap();
//! let tables = engine.run(&streets, &gt, &crowd).unwrap();
//! let summary = engine.summarize(&tables);
//! assert!(!summary.is_empty());
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{EvalError, Result};

// Geodesic polyline utilities (distance, slicing, splitting)
pub mod geo_utils;

// Street chunking into equal-length comparison units
pub mod chunker;
pub use chunker::chunk;

// Route clipping to official audited distances
pub mod clipper;
pub use clipper::clip;

// Cluster-aware label-to-segment binning
pub mod binner;
pub use binner::bin;

// Confusion-matrix accuracy computation
pub mod accuracy;
pub use accuracy::{evaluate, ConfusionStats};

// Nearest-segment selection (linear scan with R-tree acceleration)
pub mod segment_index;
pub use segment_index::SegmentLocator;

// Evaluation orchestrator
pub mod engine;
pub use engine::EvaluationEngine;

// Deterministic synthetic street network / label generator
pub mod synthetic;

// ============================================================================
// Core Types
// ============================================================================

/// A WGS84 coordinate with latitude and longitude.
///
/// # Example
/// ```
/// use ratermatch::GpsPoint;
/// let point = GpsPoint::new(47.6062, -122.3321); // Seattle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// An ordered street polyline.
///
/// Streets loaded from the network carry their route and street-edge
/// identity. Chunks produced by [`chunker::chunk`] are sub-pieces of a
/// contiguous run and lose street identity: they carry the sentinel ids
/// and are identified only by their position in the chunk sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreetSegment {
    pub route_id: i64,
    pub street_edge_id: i64,
    pub points: Vec<GpsPoint>,
}

impl StreetSegment {
    /// Create a street segment belonging to a route.
    pub fn new(route_id: i64, street_edge_id: i64, points: Vec<GpsPoint>) -> Self {
        Self {
            route_id,
            street_edge_id,
            points,
        }
    }

    /// Create an anonymous chunk piece (no street identity).
    pub fn chunk_piece(points: Vec<GpsPoint>) -> Self {
        Self {
            route_id: -1,
            street_edge_id: -1,
            points,
        }
    }

    /// Total length of the segment in meters.
    pub fn length_m(&self) -> f64 {
        geo_utils::polyline_length(&self.points)
    }
}

/// Category of a street-level annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LabelType {
    CurbRamp,
    NoCurbRamp,
    NoSidewalk,
    Obstacle,
    Occlusion,
    SurfaceProblem,
    Other,
}

impl LabelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LabelType::CurbRamp => "CurbRamp",
            LabelType::NoCurbRamp => "NoCurbRamp",
            LabelType::NoSidewalk => "NoSidewalk",
            LabelType::Obstacle => "Obstacle",
            LabelType::Occlusion => "Occlusion",
            LabelType::SurfaceProblem => "SurfaceProblem",
            LabelType::Other => "Other",
        }
    }

    /// The label types included in accuracy analysis by default.
    /// `Other` is excluded: it has no ground-truth counterpart.
    pub fn analyzed() -> Vec<LabelType> {
        vec![
            LabelType::CurbRamp,
            LabelType::NoCurbRamp,
            LabelType::NoSidewalk,
            LabelType::Obstacle,
            LabelType::Occlusion,
            LabelType::SurfaceProblem,
        ]
    }
}

impl fmt::Display for LabelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LabelType {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "CurbRamp" => Ok(LabelType::CurbRamp),
            "NoCurbRamp" => Ok(LabelType::NoCurbRamp),
            "NoSidewalk" => Ok(LabelType::NoSidewalk),
            "Obstacle" => Ok(LabelType::Obstacle),
            "Occlusion" => Ok(LabelType::Occlusion),
            "SurfaceProblem" => Ok(LabelType::SurfaceProblem),
            "Other" => Ok(LabelType::Other),
            _ => Err(EvalError::UnknownLabelType {
                name: s.to_string(),
            }),
        }
    }
}

/// Which collection a label came from.
///
/// Source membership is determined by the input collection, not by a
/// field on the label itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelSource {
    GroundTruth,
    Crowd,
}

impl LabelSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            LabelSource::GroundTruth => "gt",
            LabelSource::Crowd => "crowd",
        }
    }
}

impl fmt::Display for LabelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A geotagged point annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    pub label_type: LabelType,
    /// Cluster of labels referring to the same physical occurrence,
    /// pre-identified by an upstream process. `None` until the engine
    /// normalises unclustered collections.
    pub cluster_id: Option<i64>,
    pub condition_id: i64,
    pub route_id: i64,
    /// Marks a transient problem; used by the optional low-severity filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temporary: Option<bool>,
    /// Rater-assigned severity, 1 (minor) to 5 (severe).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<u8>,
    pub point: GpsPoint,
}

impl Label {
    /// Create a label with no cluster id and no severity data.
    pub fn new(label_type: LabelType, condition_id: i64, route_id: i64, point: GpsPoint) -> Self {
        Self {
            label_type,
            cluster_id: None,
            condition_id,
            route_id,
            temporary: None,
            severity: None,
            point,
        }
    }

    /// Set the cluster id.
    pub fn with_cluster(mut self, cluster_id: i64) -> Self {
        self.cluster_id = Some(cluster_id);
        self
    }

    /// Set the temporary flag.
    pub fn with_temporary(mut self, temporary: bool) -> Self {
        self.temporary = Some(temporary);
        self
    }
}

/// Category bucket that counts are tracked under.
///
/// Depending on configuration, all problem types are merged into a single
/// `Problem` bucket, or each label type is tracked independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CountCategory {
    Problem,
    Type(LabelType),
}

impl fmt::Display for CountCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CountCategory::Problem => f.write_str("Problem"),
            CountCategory::Type(t) => f.write_str(t.as_str()),
        }
    }
}

/// Per-segment label counts for the two sources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairCounts {
    pub ground_truth: u32,
    pub crowd: u32,
}

impl PairCounts {
    /// Count for the given source.
    pub fn get(&self, source: LabelSource) -> u32 {
        match source {
            LabelSource::GroundTruth => self.ground_truth,
            LabelSource::Crowd => self.crowd,
        }
    }

    fn get_mut(&mut self, source: LabelSource) -> &mut u32 {
        match source {
            LabelSource::GroundTruth => &mut self.ground_truth,
            LabelSource::Crowd => &mut self.crowd,
        }
    }
}

/// Per-category, per-segment count table for one granularity.
///
/// Each category maps to an ordered sequence of [`PairCounts`], one per
/// segment, insertion order = segment order. Built fresh per (condition,
/// granularity) pair; merged tables concatenate their per-segment
/// sequences in condition order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentCountTable {
    categories: BTreeMap<CountCategory, Vec<PairCounts>>,
    segment_count: usize,
}

impl SegmentCountTable {
    /// Create a table with zeroed counts for every (category, segment) cell.
    pub fn new(categories: &[CountCategory], segment_count: usize) -> Self {
        let categories = categories
            .iter()
            .map(|&c| (c, vec![PairCounts::default(); segment_count]))
            .collect();
        Self {
            categories,
            segment_count,
        }
    }

    /// Number of segments covered by this table.
    pub fn segment_count(&self) -> usize {
        self.segment_count
    }

    /// The count sequence for a category, in segment order.
    pub fn counts(&self, category: CountCategory) -> Option<&[PairCounts]> {
        self.categories.get(&category).map(Vec::as_slice)
    }

    /// Iterate categories and their count sequences.
    pub fn iter(&self) -> impl Iterator<Item = (CountCategory, &[PairCounts])> {
        self.categories.iter().map(|(&c, v)| (c, v.as_slice()))
    }

    /// Add `amount` to a cell.
    pub fn add(
        &mut self,
        category: CountCategory,
        segment: usize,
        source: LabelSource,
        amount: u32,
    ) {
        if let Some(cell) = self
            .categories
            .get_mut(&category)
            .and_then(|v| v.get_mut(segment))
        {
            *cell.get_mut(source) += amount;
        }
    }

    /// Saturating presence mark: the cell becomes `max(current, min(amount, 1))`.
    pub fn mark_present(
        &mut self,
        category: CountCategory,
        segment: usize,
        source: LabelSource,
        amount: u32,
    ) {
        if let Some(cell) = self
            .categories
            .get_mut(&category)
            .and_then(|v| v.get_mut(segment))
        {
            let slot = cell.get_mut(source);
            *slot = (*slot).max(amount.min(1));
        }
    }

    /// Append another table's per-segment sequences after this table's.
    pub fn concat(&mut self, other: &SegmentCountTable) {
        for (&category, rows) in &other.categories {
            self.categories
                .entry(category)
                .or_insert_with(|| vec![PairCounts::default(); self.segment_count])
                .extend_from_slice(rows);
        }
        self.segment_count += other.segment_count;
    }
}

/// Spatial resolution at which label counts are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    /// Native street segments, as clipped.
    Street,
    /// Fixed-length chunks at the given spacing in whole meters.
    ChunkMeters(u32),
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Granularity::Street => f.write_str("street"),
            Granularity::ChunkMeters(m) => write!(f, "{m}_meter"),
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for an evaluation run.
///
/// Threaded explicitly into every call; never module-level state, so
/// multiple runs can execute concurrently with different settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvalConfig {
    /// Merge all label types into a single "Problem" bucket instead of
    /// tracking each type independently.
    pub merge_problem_categories: bool,

    /// Record a 0/1 presence flag per (segment, category, source) instead
    /// of additive raw counts.
    pub saturating_counts: bool,

    /// Drop cluster members flagged temporary when the cluster's type is
    /// in `low_severity_types`.
    pub filter_low_severity: bool,

    /// Label types subject to the low-severity filter.
    pub low_severity_types: Vec<LabelType>,

    /// Label types included in the analysis; labels of other types are
    /// dropped before any computation.
    pub analyzed_types: Vec<LabelType>,

    /// Chunk spacings in meters; one chunked granularity per entry.
    pub chunk_spacings_m: Vec<f64>,

    /// Audited distance budget in meters by route position within a
    /// condition. The last entry repeats for all further positions.
    pub route_budgets_m: Vec<f64>,

    /// Whether the ground-truth collection arrives with cluster ids
    /// already assigned. When false, each label becomes its own cluster.
    pub ground_truth_pre_clustered: bool,

    /// Whether the crowd collection arrives with cluster ids already
    /// assigned. When false, each label becomes its own cluster.
    pub crowd_pre_clustered: bool,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            merge_problem_categories: true,
            saturating_counts: false,
            filter_low_severity: false,
            low_severity_types: vec![LabelType::Obstacle, LabelType::SurfaceProblem],
            analyzed_types: LabelType::analyzed(),
            chunk_spacings_m: vec![5.0, 10.0],
            route_budgets_m: vec![304.8, 304.8, 609.6], // 1000ft, 1000ft, 2000ft
            ground_truth_pre_clustered: false,
            crowd_pre_clustered: false,
        }
    }
}

impl EvalConfig {
    /// Validate the configuration.
    ///
    /// Invalid configuration is a fatal precondition violation reported
    /// before any computation begins, never a partial run.
    pub fn validate(&self) -> Result<()> {
        if self.analyzed_types.is_empty() {
            return Err(EvalError::EmptyAnalyzedTypes);
        }
        if self.route_budgets_m.is_empty() {
            return Err(EvalError::EmptyRouteBudgets);
        }
        for &budget in &self.route_budgets_m {
            if !budget.is_finite() || budget <= 0.0 {
                return Err(EvalError::InvalidRouteBudget { budget });
            }
        }
        let mut seen = std::collections::BTreeSet::new();
        for &spacing in &self.chunk_spacings_m {
            if !spacing.is_finite() || spacing <= 0.0 {
                return Err(EvalError::InvalidChunkSpacing { spacing });
            }
            let meters = spacing.round() as u32;
            if !seen.insert(meters) {
                return Err(EvalError::DuplicateChunkSpacing { meters });
            }
        }
        Ok(())
    }

    /// The category buckets tracked under this configuration.
    pub fn categories(&self) -> Vec<CountCategory> {
        if self.merge_problem_categories {
            vec![CountCategory::Problem]
        } else {
            self.analyzed_types
                .iter()
                .map(|&t| CountCategory::Type(t))
                .collect()
        }
    }

    /// The bucket a cluster of the given type counts under.
    pub fn category_for(&self, label_type: LabelType) -> CountCategory {
        if self.merge_problem_categories {
            CountCategory::Problem
        } else {
            CountCategory::Type(label_type)
        }
    }
}
