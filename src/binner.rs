//! Cluster-aware assignment of point labels to street segments.
//!
//! Labels are grouped by cluster id, one representative point is chosen
//! per cluster (the member nearest the cluster centroid), the
//! representative is assigned to its nearest segment, and per-segment
//! counts are accumulated for each label source independently.
//!
//! Complexity is O(clusters × segments) with the linear-scan locator;
//! segment counts are small (tens to low hundreds) so no spatial index
//! is required at this scale, though [`SegmentLocator`] switches to an
//! R-tree automatically above its threshold.

use std::collections::HashMap;

use geo::{Centroid, MultiPoint, Point};
use log::{debug, warn};

use crate::error::{EvalError, Result};
use crate::geo_utils::haversine_distance;
use crate::segment_index::SegmentLocator;
use crate::{EvalConfig, GpsPoint, Label, LabelSource, SegmentCountTable, StreetSegment};

/// Bin both label collections onto `segments` and return the count table.
///
/// Every non-empty, non-filtered cluster contributes to exactly one
/// (segment, category, source) cell; segments with no assigned clusters
/// keep their initialized zero counts. An empty segment set yields a
/// table with zero-length sequences rather than an error.
pub fn bin(
    segments: &[StreetSegment],
    ground_truth: &[Label],
    crowd: &[Label],
    config: &EvalConfig,
) -> Result<SegmentCountTable> {
    let categories = config.categories();
    let mut table = SegmentCountTable::new(&categories, segments.len());

    if segments.is_empty() {
        warn!("binning against an empty segment set; all counts stay zero");
        return Ok(table);
    }

    let locator = SegmentLocator::new(segments);
    bin_source(&mut table, &locator, ground_truth, LabelSource::GroundTruth, config)?;
    bin_source(&mut table, &locator, crowd, LabelSource::Crowd, config)?;
    Ok(table)
}

/// Bin one source's labels into the table.
fn bin_source(
    table: &mut SegmentCountTable,
    locator: &SegmentLocator,
    labels: &[Label],
    source: LabelSource,
    config: &EvalConfig,
) -> Result<()> {
    let clusters = group_by_cluster(labels, source)?;
    debug!(
        "{source}: {} labels in {} clusters over {} segments",
        labels.len(),
        clusters.len(),
        locator.len()
    );

    for mut members in clusters {
        // Optionally drop transient members of low-priority cluster types
        if config.filter_low_severity
            && config.low_severity_types.contains(&members[0].label_type)
        {
            members.retain(|label| label.temporary != Some(true));
        }
        if members.is_empty() {
            continue;
        }

        let representative = select_representative(&members);
        let category = config.category_for(representative.label_type);

        let Some(segment_idx) = locator.nearest(&representative.point) else {
            continue;
        };

        let member_count = members.len() as u32;
        if config.saturating_counts {
            table.mark_present(category, segment_idx, source, member_count);
        } else {
            table.add(category, segment_idx, source, member_count);
        }
    }

    Ok(())
}

/// Group labels by cluster id, preserving first-appearance order of
/// cluster ids and label order within a cluster.
fn group_by_cluster<'a>(labels: &'a [Label], source: LabelSource) -> Result<Vec<Vec<&'a Label>>> {
    let mut slots: HashMap<i64, usize> = HashMap::new();
    let mut groups: Vec<Vec<&Label>> = Vec::new();

    for (index, label) in labels.iter().enumerate() {
        let cluster_id = label.cluster_id.ok_or(EvalError::MissingClusterId {
            source: source.as_str(),
            index,
        })?;
        let slot = *slots.entry(cluster_id).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(label);
    }

    Ok(groups)
}

/// The cluster member nearest the cluster centroid.
///
/// Ties keep the earliest member, so representative selection is
/// deterministic for identical inputs.
fn select_representative<'a>(members: &[&'a Label]) -> &'a Label {
    if members.len() == 1 {
        return members[0];
    }

    let center = cluster_centroid(members);
    let mut best = members[0];
    let mut best_dist = haversine_distance(&best.point, &center);
    for &member in &members[1..] {
        let dist = haversine_distance(&member.point, &center);
        if dist < best_dist {
            best = member;
            best_dist = dist;
        }
    }
    best
}

/// Centroid of the cluster members' points.
fn cluster_centroid(members: &[&Label]) -> GpsPoint {
    let multipoint: MultiPoint<f64> = members
        .iter()
        .map(|label| Point::new(label.point.longitude, label.point.latitude))
        .collect();

    match multipoint.centroid() {
        Some(c) => GpsPoint::new(c.y(), c.x()),
        None => members[0].point,
    }
}
