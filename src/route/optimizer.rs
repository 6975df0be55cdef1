//! Local Route Ordering Heuristics
//!
//! Nearest-neighbor construction followed by a bounded 2-opt improvement
//! pass. Used both as the default ordering and as the fallback when the
//! external provider is unavailable, so route creation always succeeds.
//!
//! Determinism: distance ties break on `created_at`, then on visit id, so the
//! same input always yields the same order regardless of map iteration or
//! float noise.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::EngineError;
use crate::geo;
use crate::types::{GeoPoint, TargetVisit};

/// A stop candidate: geometry plus the deterministic tie-break keys.
#[derive(Debug, Clone, Copy)]
struct Stop {
    point: GeoPoint,
    created_at: DateTime<Utc>,
    id: Uuid,
}

/// Order `visits` for a single-vehicle run starting at `origin`.
///
/// Returns indices into `visits`. Runs nearest-neighbor always, then 2-opt
/// when the stop count is at most `two_opt_cutoff` (2-opt is quadratic per
/// sweep, so it is capped rather than letting large inputs stall creation).
pub fn plan_order(
    origin: GeoPoint,
    visits: &[&TargetVisit],
    two_opt_cutoff: usize,
) -> Result<Vec<usize>, EngineError> {
    let stops: Vec<Stop> = visits
        .iter()
        .map(|v| Stop {
            point: v.location.point,
            created_at: v.created_at,
            id: v.id,
        })
        .collect();

    let mut order = nearest_neighbor(origin, &stops)?;
    if stops.len() >= 3 && stops.len() <= two_opt_cutoff {
        two_opt(origin, &stops, &mut order)?;
    }
    Ok(order)
}

/// Total path length of `order` (indices into `visits`) starting at `origin`,
/// meters. Open path: no return leg.
pub fn path_length_m(
    origin: GeoPoint,
    visits: &[&TargetVisit],
    order: &[usize],
) -> Result<f64, EngineError> {
    let mut total = 0.0;
    let mut prev = origin;
    for &i in order {
        let next = visits[i].location.point;
        total += geo::haversine_meters(prev, next)?;
        prev = next;
    }
    Ok(total)
}

fn nearest_neighbor(origin: GeoPoint, stops: &[Stop]) -> Result<Vec<usize>, EngineError> {
    let mut remaining: Vec<usize> = (0..stops.len()).collect();
    let mut order = Vec::with_capacity(stops.len());
    let mut cursor = origin;

    while !remaining.is_empty() {
        let mut best_slot = 0;
        let mut best_key: Option<(f64, DateTime<Utc>, Uuid)> = None;

        for (slot, &idx) in remaining.iter().enumerate() {
            let stop = stops[idx];
            let d = geo::haversine_meters(cursor, stop.point)?;
            let key = (d, stop.created_at, stop.id);
            let better = match best_key {
                None => true,
                Some(best) => {
                    key.0 < best.0
                        || (key.0 == best.0
                            && (key.1, key.2) < (best.1, best.2))
                }
            };
            if better {
                best_key = Some(key);
                best_slot = slot;
            }
        }

        let chosen = remaining.swap_remove(best_slot);
        cursor = stops[chosen].point;
        order.push(chosen);
    }
    Ok(order)
}

/// Classic 2-opt: reverse any segment whose reversal shortens the path, until
/// a full sweep finds no improvement.
fn two_opt(origin: GeoPoint, stops: &[Stop], order: &mut [usize]) -> Result<(), EngineError> {
    let n = order.len();
    let point = |order: &[usize], i: isize| -> GeoPoint {
        if i < 0 {
            origin
        } else {
            stops[order[i as usize]].point
        }
    };

    let mut improved = true;
    while improved {
        improved = false;
        for i in 0..n - 1 {
            for j in i + 1..n {
                // Edges (i-1, i) and (j, j+1); the last stop has no outgoing
                // edge on an open path.
                let a = point(order, i as isize - 1);
                let b = point(order, i as isize);
                let c = point(order, j as isize);

                let removed;
                let added;
                if j + 1 < n {
                    let d = point(order, j as isize + 1);
                    removed = geo::haversine_meters(a, b)? + geo::haversine_meters(c, d)?;
                    added = geo::haversine_meters(a, c)? + geo::haversine_meters(b, d)?;
                } else {
                    removed = geo::haversine_meters(a, b)?;
                    added = geo::haversine_meters(a, c)?;
                }

                if added + 1e-9 < removed {
                    order[i..=j].reverse();
                    improved = true;
                }
            }
        }
    }
    Ok(())
}
