//! Confusion-matrix accuracy computation over per-segment count tables.
//!
//! Per category, the aligned ground-truth/crowd counts on each segment
//! are folded into true/false positive/negative totals, from which
//! precision, recall, specificity and F1 are derived. Ratios with a zero
//! denominator are reported as NaN rather than coerced to 0 or 1, so a
//! consumer can distinguish "no evaluable data" from "zero agreement".

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{CountCategory, PairCounts, SegmentCountTable};

/// Confusion-matrix counts and derived ratios for one category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfusionStats {
    pub true_positive: u32,
    pub false_positive: u32,
    pub false_negative: u32,
    pub true_negative: u32,
    pub precision: f64,
    pub recall: f64,
    pub specificity: f64,
    pub f1: f64,
}

impl ConfusionStats {
    /// Derive stats from raw confusion counts.
    pub fn from_counts(
        true_positive: u32,
        false_positive: u32,
        false_negative: u32,
        true_negative: u32,
    ) -> Self {
        let tp = true_positive as f64;
        let fp = false_positive as f64;
        let fn_ = false_negative as f64;
        let tn = true_negative as f64;

        let precision = tp / (tp + fp);
        let recall = tp / (tp + fn_);
        let specificity = tn / (tn + fp);
        let f1 = 2.0 * precision * recall / (precision + recall);

        Self {
            true_positive,
            false_positive,
            false_negative,
            true_negative,
            precision,
            recall,
            specificity,
            f1,
        }
    }

    /// Whether any segment carried a label in either source.
    pub fn has_data(&self) -> bool {
        self.true_positive + self.false_positive + self.false_negative > 0
    }
}

/// Accumulate one segment's count pair into running confusion totals.
fn accumulate(counts: &PairCounts, tp: &mut u32, fp: &mut u32, fn_: &mut u32, tn: &mut u32) {
    let gt = counts.ground_truth;
    let crowd = counts.crowd;

    *tp += gt.min(crowd);
    *fp += crowd.saturating_sub(gt);
    *fn_ += gt.saturating_sub(crowd);
    if gt.max(crowd) == 0 {
        *tn += 1;
    }
}

/// Derive per-category confusion stats from a count table.
pub fn evaluate(table: &SegmentCountTable) -> BTreeMap<CountCategory, ConfusionStats> {
    table
        .iter()
        .map(|(category, rows)| {
            let mut tp = 0;
            let mut fp = 0;
            let mut fn_ = 0;
            let mut tn = 0;
            for counts in rows {
                accumulate(counts, &mut tp, &mut fp, &mut fn_, &mut tn);
            }
            (category, ConfusionStats::from_counts(tp, fp, fn_, tn))
        })
        .collect()
}
