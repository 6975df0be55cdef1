//! Route Optimization & Lifecycle
//!
//! Turns a set of pending visits into an `OptimizedRoute` and drives that
//! route through its lifecycle:
//!
//! ```text
//! Planning ──start──► Active ◄──resume── Paused
//!                       │  └───pause──────┘
//!                       ├── all waypoints terminal ──► Completed
//!                       └── cancel ──► Cancelled   (also from Planning/Paused)
//! ```
//!
//! Ordering comes from the external provider when one is configured and
//! reachable; otherwise the local nearest-neighbor/2-opt heuristic runs and
//! the route is marked `degraded`. Waypoint order is frozen once assembled —
//! re-optimizing means creating a new route that supersedes this one.

pub mod optimizer;
pub mod provider;

use chrono::{Duration, Utc};
use tracing::info;
use uuid::Uuid;

use crate::config::RoutingConfig;
use crate::error::EngineError;
use crate::geo;
use crate::types::{
    GeoPoint, OptimizedRoute, RouteStatus, RouteWaypoint, TargetVisit, VisitStatus, WaypointStatus,
};

use provider::{ProviderLeg, ProviderPlan};

/// Which local ordering pass to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderingAlgorithm {
    /// Greedy nearest-neighbor only.
    NearestNeighbor,
    /// Nearest-neighbor followed by the bounded 2-opt improvement pass.
    #[default]
    NearestNeighborTwoOpt,
}

/// Per-request knobs for route creation. Defaults follow the engine config.
#[derive(Debug, Clone, Default)]
pub struct RouteOptions {
    pub algorithm: OrderingAlgorithm,
    /// Append a closing leg from the last stop back to the origin.
    pub return_to_origin: bool,
    /// Overrides the configured waypoint cap when set.
    pub max_waypoints: Option<usize>,
}

/// Ordering plus leg metrics, either provider-sourced or heuristic.
#[derive(Debug, Clone)]
pub struct RoutePlan {
    pub order: Vec<usize>,
    pub legs: Vec<ProviderLeg>,
    /// Closing leg back to the origin, when requested.
    pub return_leg: Option<ProviderLeg>,
    /// True when leg metrics are straight-line estimates.
    pub degraded: bool,
}

impl RoutePlan {
    pub fn from_provider(plan: ProviderPlan, return_leg: Option<ProviderLeg>) -> Self {
        Self {
            order: plan.order,
            legs: plan.legs,
            return_leg,
            degraded: false,
        }
    }
}

fn effective_cutoff(algorithm: OrderingAlgorithm, cfg: &RoutingConfig) -> usize {
    match algorithm {
        OrderingAlgorithm::NearestNeighbor => 0,
        OrderingAlgorithm::NearestNeighborTwoOpt => cfg.two_opt_cutoff,
    }
}

/// Straight-line estimate for the closing leg from the last stop back to the
/// origin, at the configured fallback speed.
pub fn estimated_return_leg(
    last_stop: GeoPoint,
    origin: GeoPoint,
    cfg: &RoutingConfig,
) -> Result<ProviderLeg, EngineError> {
    let distance_m = geo::haversine_meters(last_stop, origin)?;
    Ok(ProviderLeg {
        distance_m,
        duration_s: geo::eta_seconds(distance_m, cfg.fallback_speed_kmh),
    })
}

/// Order stops locally and estimate legs with straight-line distance at the
/// configured fallback speed. Never fails for valid coordinates.
pub fn heuristic_plan(
    origin: GeoPoint,
    visits: &[&TargetVisit],
    cfg: &RoutingConfig,
    opts: &RouteOptions,
) -> Result<RoutePlan, EngineError> {
    let order = optimizer::plan_order(origin, visits, effective_cutoff(opts.algorithm, cfg))?;

    let mut legs = Vec::with_capacity(order.len());
    let mut prev = origin;
    for &i in &order {
        let next = visits[i].location.point;
        let distance_m = geo::haversine_meters(prev, next)?;
        legs.push(ProviderLeg {
            distance_m,
            duration_s: geo::eta_seconds(distance_m, cfg.fallback_speed_kmh),
        });
        prev = next;
    }

    let return_leg = match (opts.return_to_origin, order.last()) {
        (true, Some(&last)) => Some(estimated_return_leg(
            visits[last].location.point,
            origin,
            cfg,
        )?),
        _ => None,
    };

    Ok(RoutePlan {
        order,
        legs,
        return_leg,
        degraded: true,
    })
}

/// Assemble a `Planning` route from a plan over `visits`.
///
/// ETAs are cumulative leg durations from now. The plan's `order`/`legs` must
/// cover `visits` exactly; this is guaranteed by both plan constructors.
pub fn assemble_route(
    agent_id: &str,
    company_id: &str,
    origin: GeoPoint,
    visits: &[&TargetVisit],
    plan: RoutePlan,
) -> OptimizedRoute {
    let now = Utc::now();
    let mut elapsed_s = 0.0;
    let mut total_distance_m = 0.0;

    let waypoints = plan
        .order
        .iter()
        .zip(&plan.legs)
        .enumerate()
        .map(|(seq, (&visit_idx, leg))| {
            elapsed_s += leg.duration_s;
            total_distance_m += leg.distance_m;
            let visit = visits[visit_idx];
            RouteWaypoint {
                id: Uuid::new_v4(),
                visit_id: visit.id,
                target_name: visit.target_name.clone(),
                location: visit.location.point,
                sequence_index: seq,
                distance_from_previous_m: leg.distance_m,
                duration_from_previous_s: leg.duration_s,
                estimated_arrival: now + Duration::seconds(elapsed_s as i64),
                visit_status: WaypointStatus::Pending,
            }
        })
        .collect();

    if let Some(leg) = &plan.return_leg {
        total_distance_m += leg.distance_m;
        elapsed_s += leg.duration_s;
    }

    OptimizedRoute {
        id: Uuid::new_v4(),
        agent_id: agent_id.to_string(),
        company_id: company_id.to_string(),
        origin,
        waypoints,
        status: RouteStatus::Planning,
        degraded: plan.degraded,
        return_to_origin: plan.return_leg.is_some(),
        total_distance_m,
        total_duration_s: elapsed_s,
        created_at: now,
    }
}

// ============================================================================
// Lifecycle
// ============================================================================

/// `Planning → Active`. The first waypoint becomes `Current`.
pub fn start(route: &mut OptimizedRoute) -> Result<(), EngineError> {
    if route.status != RouteStatus::Planning {
        return Err(EngineError::InvalidRouteTransition {
            from: route.status,
            action: "start",
        });
    }
    route.status = RouteStatus::Active;
    promote_next(route);
    info!(route_id = %route.id, "route started");
    Ok(())
}

/// `Active → Paused`.
pub fn pause(route: &mut OptimizedRoute) -> Result<(), EngineError> {
    if route.status != RouteStatus::Active {
        return Err(EngineError::InvalidRouteTransition {
            from: route.status,
            action: "pause",
        });
    }
    route.status = RouteStatus::Paused;
    Ok(())
}

/// `Paused → Active`.
pub fn resume(route: &mut OptimizedRoute) -> Result<(), EngineError> {
    if route.status != RouteStatus::Paused {
        return Err(EngineError::InvalidRouteTransition {
            from: route.status,
            action: "resume",
        });
    }
    route.status = RouteStatus::Active;
    Ok(())
}

/// Any live status `→ Cancelled`.
pub fn cancel(route: &mut OptimizedRoute) -> Result<(), EngineError> {
    if !route.status.is_live() {
        return Err(EngineError::InvalidRouteTransition {
            from: route.status,
            action: "cancel",
        });
    }
    route.status = RouteStatus::Cancelled;
    info!(route_id = %route.id, "route cancelled");
    Ok(())
}

/// Mark the `Current` waypoint `Visited` and advance.
///
/// Only the current waypoint can be completed; the route's stop order is a
/// commitment, not a suggestion. Returns the visit id of the completed stop
/// so the caller can sync the visit record.
pub fn complete_waypoint(
    route: &mut OptimizedRoute,
    waypoint_id: Uuid,
) -> Result<Uuid, EngineError> {
    advance(route, waypoint_id, WaypointStatus::Visited, "complete_waypoint")
}

/// Mark the `Current` waypoint `Skipped` and advance.
pub fn skip_waypoint(route: &mut OptimizedRoute, waypoint_id: Uuid) -> Result<Uuid, EngineError> {
    advance(route, waypoint_id, WaypointStatus::Skipped, "skip_waypoint")
}

/// Validate that `waypoint_id` may advance on this route, without mutating
/// anything. Returns the waypoint's visit id.
///
/// A waypoint that already reached a terminal status is an invalid repeat
/// (`InvalidTransition`); a still-pending waypoint means the caller is trying
/// to jump the queue, which reads as a lost race (`ConcurrentModification`).
pub fn check_advance(
    route: &OptimizedRoute,
    waypoint_id: Uuid,
    action: &'static str,
) -> Result<Uuid, EngineError> {
    if route.status != RouteStatus::Active {
        return Err(EngineError::InvalidRouteTransition {
            from: route.status,
            action,
        });
    }

    let wp = route
        .waypoints
        .iter()
        .find(|wp| wp.id == waypoint_id)
        .ok_or(EngineError::WaypointNotFound {
            route_id: route.id,
            waypoint_id,
        })?;
    match wp.visit_status {
        WaypointStatus::Current => Ok(wp.visit_id),
        WaypointStatus::Visited => Err(EngineError::InvalidTransition {
            from: VisitStatus::Completed,
            action,
        }),
        WaypointStatus::Skipped => Err(EngineError::InvalidTransition {
            from: VisitStatus::Skipped,
            action,
        }),
        WaypointStatus::Pending => Err(EngineError::ConcurrentModification(format!(
            "waypoint {} is {}, not CURRENT",
            wp.id, wp.visit_status
        ))),
    }
}

fn advance(
    route: &mut OptimizedRoute,
    waypoint_id: Uuid,
    terminal: WaypointStatus,
    action: &'static str,
) -> Result<Uuid, EngineError> {
    let visit_id = check_advance(route, waypoint_id, action)?;

    if let Some(wp) = route.waypoints.iter_mut().find(|wp| wp.id == waypoint_id) {
        wp.visit_status = terminal;
    }
    if !promote_next(route) {
        route.status = RouteStatus::Completed;
        info!(route_id = %route.id, "route completed");
    }
    Ok(visit_id)
}

/// Reflect a visit that was completed or skipped directly (outside the
/// waypoint API) onto the live route. The visit's open waypoint takes the
/// terminal status, the next pending stop is promoted, and the route
/// completes when no stop remains. Returns true when the route changed.
pub fn sync_visit_terminal(
    route: &mut OptimizedRoute,
    visit_id: Uuid,
    terminal: WaypointStatus,
) -> bool {
    if !route.status.is_live() {
        return false;
    }
    let Some(wp) = route.waypoints.iter_mut().find(|wp| {
        wp.visit_id == visit_id
            && matches!(
                wp.visit_status,
                WaypointStatus::Pending | WaypointStatus::Current
            )
    }) else {
        return false;
    };
    wp.visit_status = terminal;
    info!(route_id = %route.id, visit_id = %visit_id, "waypoint synced to visit");

    // A route still in planning has no current stop to maintain.
    if route.status != RouteStatus::Planning && !promote_next(route) {
        route.status = RouteStatus::Completed;
        info!(route_id = %route.id, "route completed");
    }
    true
}

/// Promote the first `Pending` waypoint to `Current`. Returns false when no
/// waypoint remains.
fn promote_next(route: &mut OptimizedRoute) -> bool {
    if route.current_index().is_some() {
        return true;
    }
    match route
        .waypoints
        .iter_mut()
        .find(|wp| wp.visit_status == WaypointStatus::Pending)
    {
        Some(wp) => {
            wp.visit_status = WaypointStatus::Current;
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Target, TargetLocation, TargetOrigin};

    fn visit_at(lat: f64) -> TargetVisit {
        let target = Target {
            id: format!("t-{lat}"),
            name: format!("Target {lat}"),
            location: TargetLocation {
                point: GeoPoint::new(lat, 0.0),
                address: None,
            },
            created_by: "admin".to_string(),
            origin: TargetOrigin::SelfAssigned,
            archived: false,
            created_at: Utc::now(),
        };
        TargetVisit::new("agent-1".to_string(), "acme".to_string(), &target)
    }

    fn make_route(n: usize) -> OptimizedRoute {
        make_route_with(n, &RouteOptions::default())
    }

    fn make_route_with(n: usize, opts: &RouteOptions) -> OptimizedRoute {
        let visits_owned: Vec<TargetVisit> =
            (1..=n).map(|i| visit_at(0.01 * i as f64)).collect();
        let visits: Vec<&TargetVisit> = visits_owned.iter().collect();
        let cfg = RoutingConfig::default();
        let plan = heuristic_plan(GeoPoint::new(0.0, 0.0), &visits, &cfg, opts).unwrap();
        assemble_route("agent-1", "acme", GeoPoint::new(0.0, 0.0), &visits, plan)
    }

    #[test]
    fn heuristic_route_totals_match_leg_sums() {
        let route = make_route(3);
        assert!(route.degraded);
        assert_eq!(route.status, RouteStatus::Planning);
        assert_eq!(route.waypoints.len(), 3);

        let leg_sum: f64 = route
            .waypoints
            .iter()
            .map(|wp| wp.distance_from_previous_m)
            .sum();
        assert!((route.total_distance_m - leg_sum).abs() < 1e-9);

        // Sequence indices are dense and in order.
        for (i, wp) in route.waypoints.iter().enumerate() {
            assert_eq!(wp.sequence_index, i);
        }
        // ETAs are non-decreasing along the route.
        let etas: Vec<_> = route.waypoints.iter().map(|wp| wp.estimated_arrival).collect();
        assert!(etas.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn start_promotes_first_waypoint() {
        let mut route = make_route(3);
        start(&mut route).unwrap();
        assert_eq!(route.status, RouteStatus::Active);
        assert_eq!(route.current_index(), Some(0));

        // Starting twice is rejected.
        assert!(matches!(
            start(&mut route),
            Err(EngineError::InvalidRouteTransition { .. })
        ));
    }

    #[test]
    fn completing_all_waypoints_completes_the_route() {
        let mut route = make_route(2);
        start(&mut route).unwrap();

        let first = route.waypoints[0].id;
        complete_waypoint(&mut route, first).unwrap();
        assert_eq!(route.waypoints[0].visit_status, WaypointStatus::Visited);
        assert_eq!(route.current_index(), Some(1));

        let second = route.waypoints[1].id;
        complete_waypoint(&mut route, second).unwrap();
        assert_eq!(route.status, RouteStatus::Completed);
    }

    #[test]
    fn only_the_current_waypoint_can_advance() {
        let mut route = make_route(3);
        start(&mut route).unwrap();

        let last = route.waypoints[2].id;
        let err = complete_waypoint(&mut route, last).unwrap_err();
        assert!(matches!(err, EngineError::ConcurrentModification(_)));
        assert_eq!(route.current_index(), Some(0));
    }

    #[test]
    fn completing_a_visited_waypoint_again_is_invalid() {
        let mut route = make_route(2);
        start(&mut route).unwrap();

        let first = route.waypoints[0].id;
        complete_waypoint(&mut route, first).unwrap();

        // The repeat is an invalid transition on a settled stop, not a race.
        let err = complete_waypoint(&mut route, first).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidTransition {
                from: VisitStatus::Completed,
                ..
            }
        ));
        assert_eq!(route.waypoints[0].visit_status, WaypointStatus::Visited);
        assert_eq!(route.current_index(), Some(1));

        let err = skip_waypoint(&mut route, first).unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition { .. }));
    }

    #[test]
    fn sync_marks_waypoint_and_promotes_next() {
        let mut route = make_route(3);
        start(&mut route).unwrap();

        let current_visit = route.waypoints[0].visit_id;
        assert!(sync_visit_terminal(&mut route, current_visit, WaypointStatus::Visited));
        assert_eq!(route.waypoints[0].visit_status, WaypointStatus::Visited);
        assert_eq!(route.current_index(), Some(1));

        // Syncing an unknown or already-settled visit changes nothing.
        assert!(!sync_visit_terminal(&mut route, current_visit, WaypointStatus::Visited));
        assert!(!sync_visit_terminal(&mut route, Uuid::new_v4(), WaypointStatus::Skipped));
    }

    #[test]
    fn sync_of_last_open_stop_completes_the_route() {
        let mut route = make_route(2);
        start(&mut route).unwrap();

        let first = route.waypoints[0].visit_id;
        let second = route.waypoints[1].visit_id;
        assert!(sync_visit_terminal(&mut route, second, WaypointStatus::Skipped));
        assert!(sync_visit_terminal(&mut route, first, WaypointStatus::Visited));
        assert_eq!(route.status, RouteStatus::Completed);
    }

    #[test]
    fn return_to_origin_adds_the_closing_leg() {
        let open = make_route(3);
        let closed = make_route_with(
            3,
            &RouteOptions {
                return_to_origin: true,
                ..RouteOptions::default()
            },
        );

        assert!(!open.return_to_origin);
        assert!(closed.return_to_origin);
        assert_eq!(open.waypoints.len(), closed.waypoints.len());
        assert!(closed.total_distance_m > open.total_distance_m);
        assert!(closed.total_duration_s > open.total_duration_s);
    }

    #[test]
    fn nearest_neighbor_option_still_orders_greedily() {
        let visits_owned = vec![visit_at(0.03), visit_at(0.01), visit_at(0.02)];
        let visits: Vec<&TargetVisit> = visits_owned.iter().collect();
        let cfg = RoutingConfig::default();
        let origin = GeoPoint::new(0.0, 0.0);

        let nn = heuristic_plan(
            origin,
            &visits,
            &cfg,
            &RouteOptions {
                algorithm: OrderingAlgorithm::NearestNeighbor,
                ..RouteOptions::default()
            },
        )
        .unwrap();
        let improved = heuristic_plan(origin, &visits, &cfg, &RouteOptions::default()).unwrap();

        // Greedy order from the origin is nearest-first; the improvement pass
        // can only shorten the tour, never lengthen it.
        assert_eq!(nn.order, vec![1, 2, 0]);
        let total = |plan: &RoutePlan| plan.legs.iter().map(|l| l.distance_m).sum::<f64>();
        assert!(total(&improved) <= total(&nn));
    }

    #[test]
    fn skip_advances_like_complete() {
        let mut route = make_route(2);
        start(&mut route).unwrap();

        let first = route.waypoints[0].id;
        skip_waypoint(&mut route, first).unwrap();
        assert_eq!(route.waypoints[0].visit_status, WaypointStatus::Skipped);
        assert_eq!(route.current_index(), Some(1));
    }

    #[test]
    fn pause_resume_cycle() {
        let mut route = make_route(2);
        start(&mut route).unwrap();
        pause(&mut route).unwrap();
        assert_eq!(route.status, RouteStatus::Paused);

        // No waypoint progress while paused.
        let first = route.waypoints[0].id;
        assert!(complete_waypoint(&mut route, first).is_err());

        resume(&mut route).unwrap();
        assert_eq!(route.status, RouteStatus::Active);
        complete_waypoint(&mut route, first).unwrap();
    }

    #[test]
    fn cancel_from_any_live_state_but_not_terminal() {
        let mut route = make_route(1);
        cancel(&mut route).unwrap();
        assert_eq!(route.status, RouteStatus::Cancelled);
        assert!(matches!(
            cancel(&mut route),
            Err(EngineError::InvalidRouteTransition { .. })
        ));
    }
}
