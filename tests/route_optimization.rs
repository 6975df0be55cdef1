//! Route creation and lifecycle through the engine facade: stop ordering,
//! provider fallback, waypoint caps, supersession and waypoint/visit sync.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use fieldtrack::route::provider::{ProviderLeg, ProviderPlan};
use fieldtrack::{
    Archive, EngineConfig, EngineError, FieldEngine, GeoPoint, OrderingAlgorithm, RouteOptions,
    RouteProvider, RouteStatus, Target, TargetLocation, TargetOrigin, VisitStatus, WaypointStatus,
};

const AGENT: &str = "agent-1";
const COMPANY: &str = "acme";

fn engine_with(cfg: EngineConfig) -> FieldEngine {
    let e = FieldEngine::new(cfg, Archive::temp().unwrap());
    e.register_agent(AGENT, COMPANY);
    e
}

fn engine() -> FieldEngine {
    engine_with(EngineConfig::default())
}

fn target(id: &str, lat: f64, lon: f64) -> Target {
    Target {
        id: id.to_string(),
        name: format!("Target {id}"),
        location: TargetLocation {
            point: GeoPoint::new(lat, lon),
            address: None,
        },
        created_by: "admin".to_string(),
        origin: TargetOrigin::SelfAssigned,
        archived: false,
        created_at: Utc::now(),
    }
}

/// ~1 km north per 0.009 degrees of latitude.
fn km_north(km: f64) -> f64 {
    km / 111.195
}

async fn assign_line(engine: &FieldEngine, kms: &[f64]) {
    for (i, &km) in kms.iter().enumerate() {
        engine
            .assign_visit(AGENT, COMPANY, &target(&format!("t{i}"), km_north(km), 0.0))
            .await
            .unwrap();
    }
}

// ============================================================================
// Ordering
// ============================================================================

#[tokio::test]
async fn nearest_neighbor_orders_stops_by_distance() {
    let engine = engine();
    // Assigned far-first; the route must come back near-first.
    assign_line(&engine, &[8.0, 2.0, 5.0]).await;

    let creation = engine
        .create_optimized_route(AGENT, Some(GeoPoint::new(0.0, 0.0)), RouteOptions::default())
        .await
        .unwrap();

    let names: Vec<&str> = creation
        .route
        .waypoints
        .iter()
        .map(|wp| wp.target_name.as_str())
        .collect();
    assert_eq!(names, vec!["Target t1", "Target t2", "Target t0"]);
    assert!(creation.route.degraded);
    assert!(creation.unrouted_visit_ids.is_empty());

    // Total is the sum of the 2 + 3 + 3 km legs.
    assert!((creation.route.total_distance_m - 8_000.0).abs() < 200.0);
}

#[tokio::test]
async fn route_creation_is_deterministic() {
    for _ in 0..3 {
        let engine = engine();
        assign_line(&engine, &[4.0, 1.0, 3.0, 2.0]).await;
        let creation = engine
            .create_optimized_route(AGENT, Some(GeoPoint::new(0.0, 0.0)), RouteOptions::default())
            .await
            .unwrap();
        let order: Vec<&str> = creation
            .route
            .waypoints
            .iter()
            .map(|wp| wp.target_name.as_str())
            .collect();
        assert_eq!(order, vec!["Target t1", "Target t3", "Target t2", "Target t0"]);
    }
}

// ============================================================================
// Provider integration
// ============================================================================

/// Echoes the submitted order back with fixed road metrics.
struct EchoProvider {
    calls: AtomicU32,
}

#[async_trait]
impl RouteProvider for EchoProvider {
    async fn plan(
        &self,
        _origin: GeoPoint,
        stops: &[GeoPoint],
    ) -> Result<ProviderPlan, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ProviderPlan {
            order: (0..stops.len()).collect(),
            legs: vec![
                ProviderLeg {
                    distance_m: 2_500.0,
                    duration_s: 300.0
                };
                stops.len()
            ],
        })
    }
}

struct FailingProvider;

#[async_trait]
impl RouteProvider for FailingProvider {
    async fn plan(
        &self,
        _origin: GeoPoint,
        _stops: &[GeoPoint],
    ) -> Result<ProviderPlan, EngineError> {
        Err(EngineError::ProviderUnavailable("down".to_string()))
    }
}

#[tokio::test]
async fn provider_metrics_flow_into_the_route() {
    let provider = Arc::new(EchoProvider {
        calls: AtomicU32::new(0),
    });
    let engine = engine_with(EngineConfig::default()).with_provider(provider.clone());
    assign_line(&engine, &[2.0, 5.0]).await;

    let creation = engine
        .create_optimized_route(AGENT, Some(GeoPoint::new(0.0, 0.0)), RouteOptions::default())
        .await
        .unwrap();
    assert!(!creation.route.degraded);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    assert_eq!(creation.route.total_distance_m, 5_000.0);
    assert_eq!(creation.route.total_duration_s, 600.0);
}

#[tokio::test]
async fn provider_failure_degrades_to_local_heuristic() {
    let engine = engine_with(EngineConfig::default()).with_provider(Arc::new(FailingProvider));
    assign_line(&engine, &[5.0, 2.0]).await;

    let creation = engine
        .create_optimized_route(AGENT, Some(GeoPoint::new(0.0, 0.0)), RouteOptions::default())
        .await
        .unwrap();

    // Route creation still succeeds, marked degraded, nearest-first.
    assert!(creation.route.degraded);
    let names: Vec<&str> = creation
        .route
        .waypoints
        .iter()
        .map(|wp| wp.target_name.as_str())
        .collect();
    assert_eq!(names, vec!["Target t1", "Target t0"]);
}

// ============================================================================
// Caps and supersession
// ============================================================================

#[tokio::test]
async fn waypoint_cap_reports_unrouted_visits() {
    let mut cfg = EngineConfig::default();
    cfg.routing.max_waypoints = 3;
    let engine = engine_with(cfg);
    assign_line(&engine, &[1.0, 2.0, 3.0, 4.0, 5.0]).await;

    let creation = engine
        .create_optimized_route(AGENT, Some(GeoPoint::new(0.0, 0.0)), RouteOptions::default())
        .await
        .unwrap();
    assert_eq!(creation.route.waypoints.len(), 3);
    assert_eq!(creation.unrouted_visit_ids.len(), 2);

    // Unrouted visits stay pending.
    for visit_id in &creation.unrouted_visit_ids {
        let visit = engine.visit(AGENT, *visit_id).await.unwrap();
        assert_eq!(visit.status, VisitStatus::Pending);
    }
}

#[tokio::test]
async fn new_route_supersedes_the_live_one() {
    let engine = engine();
    assign_line(&engine, &[2.0, 5.0]).await;

    let first = engine
        .create_optimized_route(AGENT, Some(GeoPoint::new(0.0, 0.0)), RouteOptions::default())
        .await
        .unwrap();
    engine.start_route(AGENT).await.unwrap();

    let second = engine
        .create_optimized_route(AGENT, Some(GeoPoint::new(0.0, 0.0)), RouteOptions::default())
        .await
        .unwrap();
    assert_ne!(first.route.id, second.route.id);

    let live = engine.active_route(AGENT).await.unwrap().unwrap();
    assert_eq!(live.id, second.route.id);
    assert_eq!(live.status, RouteStatus::Planning);
}

#[tokio::test]
async fn per_call_cap_overrides_the_configured_one() {
    let engine = engine();
    assign_line(&engine, &[1.0, 2.0, 3.0, 4.0]).await;

    let creation = engine
        .create_optimized_route(
            AGENT,
            Some(GeoPoint::new(0.0, 0.0)),
            RouteOptions {
                max_waypoints: Some(2),
                ..RouteOptions::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(creation.route.waypoints.len(), 2);
    assert_eq!(creation.unrouted_visit_ids.len(), 2);
}

#[tokio::test]
async fn return_to_origin_extends_the_totals() {
    let engine = engine();
    assign_line(&engine, &[2.0, 5.0]).await;
    let open = engine
        .create_optimized_route(AGENT, Some(GeoPoint::new(0.0, 0.0)), RouteOptions::default())
        .await
        .unwrap();

    let engine = self::engine();
    assign_line(&engine, &[2.0, 5.0]).await;
    let closed = engine
        .create_optimized_route(
            AGENT,
            Some(GeoPoint::new(0.0, 0.0)),
            RouteOptions {
                return_to_origin: true,
                ..RouteOptions::default()
            },
        )
        .await
        .unwrap();

    assert!(closed.route.return_to_origin);
    assert_eq!(open.route.waypoints.len(), closed.route.waypoints.len());
    // The closing leg is the 5 km from the far stop back to the origin.
    let extra = closed.route.total_distance_m - open.route.total_distance_m;
    assert!((extra - 5_000.0).abs() < 100.0);
    assert!(closed.route.total_duration_s > open.route.total_duration_s);
}

#[tokio::test]
async fn ordering_algorithm_option_is_honored() {
    let engine = engine();
    assign_line(&engine, &[8.0, 2.0, 5.0]).await;

    let creation = engine
        .create_optimized_route(
            AGENT,
            Some(GeoPoint::new(0.0, 0.0)),
            RouteOptions {
                algorithm: OrderingAlgorithm::NearestNeighbor,
                ..RouteOptions::default()
            },
        )
        .await
        .unwrap();

    // Pure greedy from the origin still orders this line nearest-first.
    let names: Vec<&str> = creation
        .route
        .waypoints
        .iter()
        .map(|wp| wp.target_name.as_str())
        .collect();
    assert_eq!(names, vec!["Target t1", "Target t2", "Target t0"]);
}

#[tokio::test]
async fn empty_pending_set_is_an_error() {
    let engine = engine();
    let err = engine
        .create_optimized_route(AGENT, Some(GeoPoint::new(0.0, 0.0)), RouteOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NoPendingVisits { .. }));
}

// ============================================================================
// Waypoint progression
// ============================================================================

#[tokio::test]
async fn completing_waypoints_advances_and_syncs_visits() {
    let engine = engine();
    assign_line(&engine, &[2.0, 5.0]).await;

    let creation = engine
        .create_optimized_route(AGENT, Some(GeoPoint::new(0.0, 0.0)), RouteOptions::default())
        .await
        .unwrap();
    engine.start_route(AGENT).await.unwrap();

    let route = engine.active_route(AGENT).await.unwrap().unwrap();
    assert_eq!(route.waypoints[0].visit_status, WaypointStatus::Current);

    // Completing a non-current waypoint is rejected.
    let last = route.waypoints[1].id;
    let err = engine
        .complete_route_waypoint(AGENT, last, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ConcurrentModification(_)));

    // Completing the current one syncs the visit and promotes the next.
    let first = route.waypoints[0].id;
    let updated = engine
        .complete_route_waypoint(AGENT, first, Some("signed".to_string()))
        .await
        .unwrap();
    assert_eq!(updated.waypoints[0].visit_status, WaypointStatus::Visited);
    assert_eq!(updated.waypoints[1].visit_status, WaypointStatus::Current);

    let visit = engine
        .visit(AGENT, route.waypoints[0].visit_id)
        .await
        .unwrap();
    assert_eq!(visit.status, VisitStatus::Completed);
    assert_eq!(visit.outcome.as_deref(), Some("signed"));

    // Skipping the final stop completes the route.
    let updated = engine
        .skip_route_waypoint(AGENT, last, Some("closed".to_string()))
        .await
        .unwrap();
    assert_eq!(updated.status, RouteStatus::Completed);
    let skipped = engine
        .visit(AGENT, route.waypoints[1].visit_id)
        .await
        .unwrap();
    assert_eq!(skipped.status, VisitStatus::Skipped);

    let summary = engine.route_summary(AGENT).await.unwrap().unwrap();
    assert_eq!(summary.visited_stops, 1);
    assert_eq!(summary.skipped_stops, 1);
    assert_eq!(summary.remaining_stops, 0);
    assert!(summary.next_stop.is_none());
}

#[tokio::test]
async fn repeating_a_settled_waypoint_is_an_invalid_transition() {
    let engine = engine();
    assign_line(&engine, &[2.0, 5.0]).await;
    engine
        .create_optimized_route(AGENT, Some(GeoPoint::new(0.0, 0.0)), RouteOptions::default())
        .await
        .unwrap();
    engine.start_route(AGENT).await.unwrap();

    let route = engine.active_route(AGENT).await.unwrap().unwrap();
    let first = route.waypoints[0].id;
    engine
        .complete_route_waypoint(AGENT, first, Some("signed".to_string()))
        .await
        .unwrap();

    // A settled stop rejects the repeat as an invalid transition, and the
    // failed call leaves both route and visit record untouched.
    let err = engine
        .complete_route_waypoint(AGENT, first, Some("again".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::InvalidTransition {
            from: VisitStatus::Completed,
            ..
        }
    ));

    let after = engine.active_route(AGENT).await.unwrap().unwrap();
    assert_eq!(after.waypoints[0].visit_status, WaypointStatus::Visited);
    assert_eq!(after.waypoints[1].visit_status, WaypointStatus::Current);
    let visit = engine
        .visit(AGENT, route.waypoints[0].visit_id)
        .await
        .unwrap();
    assert_eq!(visit.outcome.as_deref(), Some("signed"));
}

#[tokio::test]
async fn direct_visit_completion_syncs_the_live_route() {
    let engine = engine();
    assign_line(&engine, &[2.0, 5.0]).await;
    engine
        .create_optimized_route(AGENT, Some(GeoPoint::new(0.0, 0.0)), RouteOptions::default())
        .await
        .unwrap();
    engine.start_route(AGENT).await.unwrap();

    // Complete the current stop's visit through the visit API, not the
    // waypoint API. The route must not keep pointing at a finished visit.
    let route = engine.active_route(AGENT).await.unwrap().unwrap();
    let current_visit = route.waypoints[0].visit_id;
    engine.start_visit(AGENT, current_visit).await.unwrap();
    engine
        .complete_visit(AGENT, current_visit, Some("done on site".to_string()))
        .await
        .unwrap();

    let synced = engine.active_route(AGENT).await.unwrap().unwrap();
    assert_eq!(synced.waypoints[0].visit_status, WaypointStatus::Visited);
    assert_eq!(synced.waypoints[1].visit_status, WaypointStatus::Current);

    // Skipping the remaining visit directly finishes the route.
    engine
        .skip_visit(AGENT, route.waypoints[1].visit_id, Some("closed".to_string()))
        .await
        .unwrap();
    let finished = engine.active_route(AGENT).await.unwrap().unwrap();
    assert_eq!(finished.waypoints[1].visit_status, WaypointStatus::Skipped);
    assert_eq!(finished.status, RouteStatus::Completed);
}

#[tokio::test]
async fn route_ops_without_a_route_report_no_active_route() {
    let engine = engine();
    let err = engine.start_route(AGENT).await.unwrap_err();
    assert!(matches!(err, EngineError::NoActiveRoute { .. }));
    let err = engine.cancel_route(AGENT).await.unwrap_err();
    assert!(matches!(err, EngineError::NoActiveRoute { .. }));
}

#[tokio::test]
async fn pause_blocks_progress_until_resume() {
    let engine = engine();
    assign_line(&engine, &[2.0]).await;

    engine
        .create_optimized_route(AGENT, Some(GeoPoint::new(0.0, 0.0)), RouteOptions::default())
        .await
        .unwrap();
    engine.start_route(AGENT).await.unwrap();
    engine.pause_route(AGENT).await.unwrap();

    let route = engine.active_route(AGENT).await.unwrap().unwrap();
    let wp = route.waypoints[0].id;
    assert!(engine
        .complete_route_waypoint(AGENT, wp, None)
        .await
        .is_err());

    engine.resume_route(AGENT).await.unwrap();
    let done = engine
        .complete_route_waypoint(AGENT, wp, None)
        .await
        .unwrap();
    assert_eq!(done.status, RouteStatus::Completed);
}

#[tokio::test]
async fn route_feed_publishes_lifecycle_snapshots() {
    let engine = engine();
    assign_line(&engine, &[2.0]).await;
    let mut feed = engine.subscribe_active_route(AGENT);

    engine
        .create_optimized_route(AGENT, Some(GeoPoint::new(0.0, 0.0)), RouteOptions::default())
        .await
        .unwrap();
    let planned = feed.recv().await.unwrap().unwrap();
    assert_eq!(planned.status, RouteStatus::Planning);

    engine.start_route(AGENT).await.unwrap();
    let active = feed.recv().await.unwrap().unwrap();
    assert_eq!(active.status, RouteStatus::Active);

    engine.cancel_route(AGENT).await.unwrap();
    let cancelled = feed.recv().await.unwrap().unwrap();
    assert_eq!(cancelled.status, RouteStatus::Cancelled);
}
