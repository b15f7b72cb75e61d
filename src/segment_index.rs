//! Nearest-segment selection.
//!
//! Assigning a cluster representative to a segment minimises the
//! projected point-to-polyline distance over all segments, ties resolved
//! by lowest segment index. Small segment sets use a linear scan; larger
//! sets are indexed with an R-tree over per-segment bounding boxes.
//! Both paths share the same distance function and tie-break, so the
//! chosen segment is identical regardless of strategy.
//!
//! Distances are computed in a local equirectangular projection centered
//! on the segment set, in meters. The R-tree envelopes live in the same
//! projected space, which keeps rstar's pruning bound valid: a segment's
//! polyline never lies outside its own envelope.

use rstar::{PointDistance, RTree, RTreeObject, AABB};

use crate::geo_utils::EARTH_RADIUS_M;
use crate::{GpsPoint, StreetSegment};

/// Segment count above which an R-tree is built instead of scanning.
const RTREE_THRESHOLD: usize = 256;

/// Equirectangular projection centered on a reference point.
///
/// Accurate to well under a meter at the scale of a street network
/// (a few kilometers), which is all the binner needs: relative order
/// of distances, not absolute geodesics.
#[derive(Debug, Clone, Copy)]
pub struct LocalProjection {
    origin_lat: f64,
    origin_lng: f64,
    cos_lat: f64,
}

impl LocalProjection {
    /// Build a projection centered on the centroid of all segment vertices.
    pub fn from_segments(segments: &[StreetSegment]) -> Self {
        let mut lat_sum = 0.0;
        let mut lng_sum = 0.0;
        let mut n = 0usize;
        for segment in segments {
            for p in &segment.points {
                lat_sum += p.latitude;
                lng_sum += p.longitude;
                n += 1;
            }
        }
        let (origin_lat, origin_lng) = if n > 0 {
            (lat_sum / n as f64, lng_sum / n as f64)
        } else {
            (0.0, 0.0)
        };
        Self {
            origin_lat,
            origin_lng,
            cos_lat: origin_lat.to_radians().cos(),
        }
    }

    /// Project a point to local meters, x east, y north.
    pub fn project(&self, p: &GpsPoint) -> [f64; 2] {
        [
            (p.longitude - self.origin_lng).to_radians() * self.cos_lat * EARTH_RADIUS_M,
            (p.latitude - self.origin_lat).to_radians() * EARTH_RADIUS_M,
        ]
    }
}

/// Squared distance from a point to the edge `a`-`b` in projected meters.
fn point_to_edge_distance_sq(p: [f64; 2], a: [f64; 2], b: [f64; 2]) -> f64 {
    let abx = b[0] - a[0];
    let aby = b[1] - a[1];
    let apx = p[0] - a[0];
    let apy = p[1] - a[1];

    let len_sq = abx * abx + aby * aby;
    let t = if len_sq > 0.0 {
        ((apx * abx + apy * aby) / len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let dx = apx - t * abx;
    let dy = apy - t * aby;
    dx * dx + dy * dy
}

/// Squared distance from a point to a projected polyline.
fn point_to_polyline_distance_sq(p: [f64; 2], line: &[[f64; 2]]) -> f64 {
    match line.len() {
        0 => f64::INFINITY,
        1 => {
            let dx = p[0] - line[0][0];
            let dy = p[1] - line[0][1];
            dx * dx + dy * dy
        }
        _ => line
            .windows(2)
            .map(|w| point_to_edge_distance_sq(p, w[0], w[1]))
            .fold(f64::INFINITY, f64::min),
    }
}

/// A projected segment polyline with its index, for R-tree queries.
struct IndexedSegment {
    idx: usize,
    line: Vec<[f64; 2]>,
}

impl RTreeObject for IndexedSegment {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        let mut min = [f64::MAX, f64::MAX];
        let mut max = [f64::MIN, f64::MIN];
        for p in &self.line {
            min[0] = min[0].min(p[0]);
            min[1] = min[1].min(p[1]);
            max[0] = max[0].max(p[0]);
            max[1] = max[1].max(p[1]);
        }
        AABB::from_corners(min, max)
    }
}

impl PointDistance for IndexedSegment {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        point_to_polyline_distance_sq(*point, &self.line)
    }
}

/// Nearest-segment locator over a fixed segment set.
///
/// Built once per (condition, granularity) segment sequence, then queried
/// once per cluster representative.
pub struct SegmentLocator {
    projection: LocalProjection,
    lines: Vec<Vec<[f64; 2]>>,
    tree: Option<RTree<IndexedSegment>>,
}

impl SegmentLocator {
    /// Build a locator for the given segments, in order.
    pub fn new(segments: &[StreetSegment]) -> Self {
        let projection = LocalProjection::from_segments(segments);
        let lines: Vec<Vec<[f64; 2]>> = segments
            .iter()
            .map(|s| s.points.iter().map(|p| projection.project(p)).collect())
            .collect();

        let tree = if lines.len() > RTREE_THRESHOLD {
            let indexed: Vec<IndexedSegment> = lines
                .iter()
                .enumerate()
                .filter(|(_, line)| !line.is_empty())
                .map(|(idx, line)| IndexedSegment {
                    idx,
                    line: line.clone(),
                })
                .collect();
            Some(RTree::bulk_load(indexed))
        } else {
            None
        };

        Self {
            projection,
            lines,
            tree,
        }
    }

    /// Number of segments covered by this locator.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the locator covers no segments.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Index of the segment nearest the point; ties go to the lowest index.
    pub fn nearest(&self, point: &GpsPoint) -> Option<usize> {
        self.nearest_with_distance(point).map(|(idx, _)| idx)
    }

    /// Nearest segment index and its distance in meters.
    pub fn nearest_with_distance(&self, point: &GpsPoint) -> Option<(usize, f64)> {
        let q = self.projection.project(point);

        if let Some(tree) = &self.tree {
            let mut iter = tree.nearest_neighbor_iter_with_distance_2(&q);
            let (first, best_d2) = iter.next()?;
            let mut best_idx = first.idx;
            // The iterator yields in increasing distance order; consume
            // exact ties so the lowest index wins, as in the linear scan.
            for (obj, d2) in iter {
                if d2 > best_d2 {
                    break;
                }
                if obj.idx < best_idx {
                    best_idx = obj.idx;
                }
            }
            return Some((best_idx, best_d2.sqrt()));
        }

        let mut best: Option<(usize, f64)> = None;
        for (idx, line) in self.lines.iter().enumerate() {
            let d2 = point_to_polyline_distance_sq(q, line);
            if d2.is_finite() && best.map_or(true, |(_, b)| d2 < b) {
                best = Some((idx, d2));
            }
        }
        best.map(|(idx, d2)| (idx, d2.sqrt()))
    }
}
