//! Street chunking into equal-length comparison units.
//!
//! Splits an ordered street sequence into maximal contiguous runs (by
//! touching/intersecting adjacency) and re-splits each run into pieces of
//! near-equal length at a target spacing. Input order must already follow
//! the traversal path: the scan only tests adjacency between consecutive
//! streets and starts a new run whenever it fails. No general-graph
//! adjacency discovery is attempted.

use log::debug;

use crate::error::{EvalError, Result};
use crate::geo_utils::{
    combine, is_degenerate, lines_touch, polyline_length, split_into_equal_pieces,
};
use crate::{GpsPoint, StreetSegment};

/// Split streets into chunks of near-equal length at `spacing_m` meters.
///
/// Each maximal contiguous run of touching streets is merged into one
/// polyline of length `L` and split into exactly `round(L / spacing_m)`
/// (minimum 1) pieces of equal length, so there is no short remainder
/// piece. Runs are emitted in input order, pieces in order within a run.
///
/// Degenerate zero-length pieces produced by floating-point boundary
/// effects are silently dropped.
pub fn chunk(streets: &[StreetSegment], spacing_m: f64) -> Result<Vec<StreetSegment>> {
    if !spacing_m.is_finite() || spacing_m <= 0.0 {
        return Err(EvalError::InvalidChunkSpacing { spacing: spacing_m });
    }

    let mut chunks = Vec::new();
    let mut run_start = 0;

    while run_start < streets.len() {
        // Extend the run while consecutive streets touch
        let mut run_end = run_start + 1;
        while run_end < streets.len()
            && lines_touch(&streets[run_end - 1].points, &streets[run_end].points)
        {
            run_end += 1;
        }

        let member_lines: Vec<&[GpsPoint]> = streets[run_start..run_end]
            .iter()
            .map(|s| s.points.as_slice())
            .collect();
        let merged = combine(&member_lines);
        let total = polyline_length(&merged);

        let n = (total / spacing_m).round().max(1.0) as usize;
        debug!(
            "run of {} streets: {:.1} m into {} pieces",
            run_end - run_start,
            total,
            n
        );

        chunks.extend(
            split_into_equal_pieces(&merged, n)
                .into_iter()
                .filter(|piece| !is_degenerate(piece))
                .map(StreetSegment::chunk_piece),
        );

        run_start = run_end;
    }

    Ok(chunks)
}
