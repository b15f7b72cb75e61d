//! Route clipping to official audited distances.
//!
//! A route's streets are walked in stored order, accumulating length
//! against a per-route budget. The street that crosses the budget is
//! sliced at the exact remaining distance; everything after it is
//! dropped. Street ordering within a route is assumed to follow the
//! traversal path, a documented precondition inherited from the audit
//! task design.

use log::debug;

use crate::geo_utils::{is_degenerate, slice_along};
use crate::StreetSegment;

/// Slices shorter than this are floating-point artifacts of a budget
/// landing on a street boundary, not audited geometry.
const MIN_SLICE_M: f64 = 1e-6;

/// Restrict `streets` to the given routes, each trimmed to its budget.
///
/// `budgets_m` is indexed by route position in `route_ids`; the last
/// entry repeats for all further positions. Routes are emitted in
/// `route_ids` order, streets within a route in stored order. A route id
/// with no matching streets yields zero segments, not an error.
///
/// Operates on clones; caller-supplied collections are never mutated.
pub fn clip(streets: &[StreetSegment], route_ids: &[i64], budgets_m: &[f64]) -> Vec<StreetSegment> {
    let mut out: Vec<StreetSegment> = Vec::new();
    if budgets_m.is_empty() {
        // rejected by config validation; an empty budget list clips everything
        return out;
    }

    for (position, &route_id) in route_ids.iter().enumerate() {
        let budget = budgets_m[position.min(budgets_m.len() - 1)];

        let mut accumulated = 0.0;
        let mut kept = 0usize;
        for street in streets.iter().filter(|s| s.route_id == route_id) {
            if accumulated >= budget {
                // budget exhausted exactly at a street boundary or earlier;
                // everything further along the route is unaudited
                break;
            }

            let len = street.length_m();
            accumulated += len;
            if accumulated > budget {
                // slice the crossing street at the exact remaining distance
                let remaining = budget - (accumulated - len);
                if remaining > MIN_SLICE_M {
                    let head = slice_along(&street.points, 0.0, remaining);
                    if !is_degenerate(&head) {
                        out.push(StreetSegment::new(
                            street.route_id,
                            street.street_edge_id,
                            head,
                        ));
                        kept += 1;
                    }
                }
                accumulated = budget;
            } else {
                out.push(street.clone());
                kept += 1;
            }
        }

        debug!("route {route_id}: kept {kept} streets within {budget:.1} m");
    }

    out
}
