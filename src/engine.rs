//! Evaluation orchestrator.
//!
//! Drives clipping, chunking and binning across experimental conditions
//! and spatial granularities, then merges the per-condition count tables
//! into one table per granularity.
//!
//! Each condition's processing is independent and side-effect-free on
//! shared input, so with the `parallel` feature conditions are evaluated
//! on a rayon pool; the merge step always concatenates in condition
//! order, keeping output reproducible.

use std::collections::{BTreeMap, HashSet};

use log::{debug, info};
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::accuracy::{evaluate, ConfusionStats};
use crate::error::{EvalError, Result};
use crate::{
    bin, chunk, clip, CountCategory, EvalConfig, Granularity, Label, LabelSource, LabelType,
    SegmentCountTable, StreetSegment,
};

/// Orchestrates a full evaluation run.
///
/// Owns the configuration and the lifetime of all count tables produced
/// for a run; the binner and calculator operate on borrowed references.
pub struct EvaluationEngine {
    config: EvalConfig,
}

impl EvaluationEngine {
    /// Create an engine, validating the configuration up front.
    pub fn new(config: EvalConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The engine's configuration.
    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    /// Evaluate both label collections against the street network.
    ///
    /// Returns one merged count table per granularity: the native street
    /// level plus one chunked level per configured spacing. Per-condition
    /// tables are concatenated in condition order (first appearance in
    /// the crowd collection).
    pub fn run(
        &self,
        streets: &[StreetSegment],
        ground_truth: &[Label],
        crowd: &[Label],
    ) -> Result<BTreeMap<Granularity, SegmentCountTable>> {
        validate_streets(streets)?;

        let gt_labels = self.prepare_labels(
            ground_truth,
            LabelSource::GroundTruth,
            self.config.ground_truth_pre_clustered,
        )?;
        let crowd_labels =
            self.prepare_labels(crowd, LabelSource::Crowd, self.config.crowd_pre_clustered)?;

        log_type_counts(LabelSource::GroundTruth, &gt_labels);
        log_type_counts(LabelSource::Crowd, &crowd_labels);

        let conditions = distinct_ids(crowd_labels.iter().map(|l| l.condition_id));
        info!(
            "evaluating {} conditions at {} granularities over {} streets",
            conditions.len(),
            1 + self.config.chunk_spacings_m.len(),
            streets.len()
        );

        #[cfg(feature = "parallel")]
        let per_condition: Vec<BTreeMap<Granularity, SegmentCountTable>> = conditions
            .par_iter()
            .map(|&condition| self.run_condition(streets, &gt_labels, &crowd_labels, condition))
            .collect::<Result<_>>()?;

        #[cfg(not(feature = "parallel"))]
        let per_condition: Vec<BTreeMap<Granularity, SegmentCountTable>> = conditions
            .iter()
            .map(|&condition| self.run_condition(streets, &gt_labels, &crowd_labels, condition))
            .collect::<Result<_>>()?;

        let mut merged: BTreeMap<Granularity, SegmentCountTable> = BTreeMap::new();
        for tables in per_condition {
            for (granularity, table) in tables {
                match merged.get_mut(&granularity) {
                    Some(existing) => existing.concat(&table),
                    None => {
                        merged.insert(granularity, table);
                    }
                }
            }
        }
        Ok(merged)
    }

    /// Derive confusion stats for every granularity and category.
    pub fn summarize(
        &self,
        tables: &BTreeMap<Granularity, SegmentCountTable>,
    ) -> BTreeMap<Granularity, BTreeMap<CountCategory, ConfusionStats>> {
        tables
            .iter()
            .map(|(&granularity, table)| (granularity, evaluate(table)))
            .collect()
    }

    /// Evaluate one condition at every granularity.
    fn run_condition(
        &self,
        streets: &[StreetSegment],
        gt_labels: &[Label],
        crowd_labels: &[Label],
        condition: i64,
    ) -> Result<BTreeMap<Granularity, SegmentCountTable>> {
        let gt: Vec<Label> = gt_labels
            .iter()
            .filter(|l| l.condition_id == condition)
            .cloned()
            .collect();
        let crowd: Vec<Label> = crowd_labels
            .iter()
            .filter(|l| l.condition_id == condition)
            .cloned()
            .collect();

        // The condition's route set comes from its ground-truth labels
        let routes = distinct_ids(gt.iter().map(|l| l.route_id));
        let clipped = clip(streets, &routes, &self.config.route_budgets_m);
        debug!(
            "condition {condition}: {} routes, {} clipped streets, {} gt / {} crowd labels",
            routes.len(),
            clipped.len(),
            gt.len(),
            crowd.len()
        );

        let mut tables = BTreeMap::new();
        tables.insert(Granularity::Street, bin(&clipped, &gt, &crowd, &self.config)?);

        for &spacing in &self.config.chunk_spacings_m {
            let chunks = chunk(&clipped, spacing)?;
            tables.insert(
                Granularity::ChunkMeters(spacing.round() as u32),
                bin(&chunks, &gt, &crowd, &self.config)?,
            );
        }
        Ok(tables)
    }

    /// Filter a collection to the analyzed types and normalise cluster ids.
    ///
    /// When the collection is not pre-clustered, each label becomes its
    /// own cluster. When it is, every label must already carry a cluster
    /// id; a missing id is a caller contract violation.
    fn prepare_labels(
        &self,
        labels: &[Label],
        source: LabelSource,
        pre_clustered: bool,
    ) -> Result<Vec<Label>> {
        let mut prepared: Vec<Label> = labels
            .iter()
            .filter(|l| self.config.analyzed_types.contains(&l.label_type))
            .cloned()
            .collect();

        if pre_clustered {
            for (index, label) in prepared.iter().enumerate() {
                if label.cluster_id.is_none() {
                    return Err(EvalError::MissingClusterId {
                        source: source.as_str(),
                        index,
                    });
                }
            }
        } else {
            for (index, label) in prepared.iter_mut().enumerate() {
                label.cluster_id = Some(index as i64);
            }
        }

        Ok(prepared)
    }
}

/// Distinct ids in first-appearance order.
fn distinct_ids<I: IntoIterator<Item = i64>>(ids: I) -> Vec<i64> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for id in ids {
        if seen.insert(id) {
            out.push(id);
        }
    }
    out
}

/// Reject streets with malformed geometry before any computation.
fn validate_streets(streets: &[StreetSegment]) -> Result<()> {
    for street in streets {
        if street.points.len() < 2 {
            return Err(EvalError::MalformedStreet {
                street_edge_id: street.street_edge_id,
                point_count: street.points.len(),
            });
        }
    }
    Ok(())
}

/// Per-type label tallies, logged at debug level.
fn log_type_counts(source: LabelSource, labels: &[Label]) {
    let mut counts: BTreeMap<LabelType, usize> = BTreeMap::new();
    for label in labels {
        *counts.entry(label.label_type).or_insert(0) += 1;
    }
    for (label_type, count) in counts {
        debug!("{source}: {count} {label_type} labels");
    }
}
