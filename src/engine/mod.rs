//! Field Engine Facade
//!
//! The single entry point callers interact with. State is partitioned per
//! agent: every partition holds that agent's position log, visit book,
//! geofence state, live route and navigation session behind one async mutex,
//! so all mutations for an agent are serialized while different agents never
//! contend.
//!
//! Route creation is the only operation that talks to the network. The
//! partition lock is released for the provider call and re-acquired to
//! install the result; if the visit set changed in between, the route is
//! rejected with `ConcurrentModification` instead of installing a stale plan.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::Utc;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::feed::{FeedHub, RouteSnapshot, VisitSnapshot};
use crate::geofence::{GeofenceEvaluator, GeofenceEvent};
use crate::ingest::PositionLog;
use crate::navigation::NavigationSession;
use crate::route::{self, provider::RouteProvider, RouteOptions, RoutePlan};
use crate::storage::Archive;
use crate::types::{
    AgentId, AgentPosition, GeoPoint, NavigationDaySummary, NavigationTrackingEntry,
    OptimizedRoute, RouteStatus, RouteSummary, Target, TargetVisit, VisitStatus, WaypointStatus,
};
use crate::visits::VisitBook;

/// Result of feeding one position sample through the pipeline.
#[derive(Debug, Default)]
pub struct PositionOutcome {
    /// False when the sample was dropped by a quality rule.
    pub accepted: bool,
    pub geofence_events: Vec<GeofenceEvent>,
    /// Distance added to the live navigation session, km.
    pub navigation_added_km: f64,
}

/// Result of route creation: the installed route plus any pending visits that
/// did not fit under the waypoint cap.
#[derive(Debug)]
pub struct RouteCreation {
    pub route: OptimizedRoute,
    pub unrouted_visit_ids: Vec<Uuid>,
}

struct AgentPartition {
    agent_id: AgentId,
    company_id: String,
    state: Mutex<PartitionState>,
}

struct PartitionState {
    positions: PositionLog,
    visits: VisitBook,
    geofence: GeofenceEvaluator,
    route: Option<OptimizedRoute>,
    navigation: Option<NavigationSession>,
}

pub struct FieldEngine {
    cfg: EngineConfig,
    feed: FeedHub,
    archive: Archive,
    provider: Option<Arc<dyn RouteProvider>>,
    partitions: RwLock<HashMap<AgentId, Arc<AgentPartition>>>,
}

impl FieldEngine {
    pub fn new(cfg: EngineConfig, archive: Archive) -> Self {
        let feed = FeedHub::new(cfg.feed.channel_capacity);
        Self {
            cfg,
            feed,
            archive,
            provider: None,
            partitions: RwLock::new(HashMap::new()),
        }
    }

    /// Attach an external routing provider. Without one every route uses the
    /// local heuristic and is marked degraded.
    pub fn with_provider(mut self, provider: Arc<dyn RouteProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Register an agent, creating its partition if needed.
    pub fn register_agent(&self, agent_id: &str, company_id: &str) {
        let mut partitions = self.partitions.write().unwrap_or_else(|e| e.into_inner());
        partitions
            .entry(agent_id.to_string())
            .or_insert_with(|| {
                info!(agent_id, company_id, "agent registered");
                Arc::new(AgentPartition {
                    agent_id: agent_id.to_string(),
                    company_id: company_id.to_string(),
                    state: Mutex::new(PartitionState {
                        positions: PositionLog::new(self.cfg.ingest.clone()),
                        visits: VisitBook::new(),
                        geofence: GeofenceEvaluator::new(self.cfg.geofence.clone()),
                        route: None,
                        navigation: None,
                    }),
                })
            });
    }

    fn partition(&self, agent_id: &str) -> Result<Arc<AgentPartition>, EngineError> {
        let partitions = self.partitions.read().unwrap_or_else(|e| e.into_inner());
        partitions
            .get(agent_id)
            .cloned()
            .ok_or_else(|| EngineError::UnknownAgent {
                agent_id: agent_id.to_string(),
            })
    }

    // ========================================================================
    // Position ingestion
    // ========================================================================

    /// Feed one live GPS sample through validation, geofencing and navigation
    /// tracking. Quality rejections are logged and reported as
    /// `accepted: false`, never returned as errors.
    pub async fn report_position(
        &self,
        sample: AgentPosition,
    ) -> Result<PositionOutcome, EngineError> {
        let partition = self.partition(&sample.agent_id)?;
        let mut state = partition.state.lock().await;
        let outcome = Self::apply_sample(&partition, &mut state, sample, &self.feed)?;
        Ok(outcome)
    }

    /// Replay a backlog of samples buffered while the device was offline.
    /// Returns the number of samples accepted.
    pub async fn report_backlog(
        &self,
        agent_id: &str,
        mut samples: Vec<AgentPosition>,
    ) -> Result<usize, EngineError> {
        let partition = self.partition(agent_id)?;
        let mut state = partition.state.lock().await;

        samples.sort_by_key(|s| s.captured_at);
        let mut accepted = 0;
        for sample in samples {
            match Self::apply_sample(&partition, &mut state, sample, &self.feed) {
                Ok(outcome) if outcome.accepted => accepted += 1,
                Ok(_) => {}
                Err(e) => return Err(e),
            }
        }
        debug!(agent_id, accepted, "backlog replayed");
        Ok(accepted)
    }

    fn apply_sample(
        partition: &AgentPartition,
        state: &mut PartitionState,
        sample: AgentPosition,
        feed: &FeedHub,
    ) -> Result<PositionOutcome, EngineError> {
        let point = sample.point;
        match state.positions.accept(sample.clone()) {
            Ok(()) => {}
            Err(e) if e.is_sample_quality() => {
                debug!(agent_id = %partition.agent_id, error = %e, "sample dropped");
                return Ok(PositionOutcome::default());
            }
            Err(e) => return Err(e),
        }

        // With a live route only the current stop (plus anything already in
        // progress) is fenced, so a future stop's zone cannot consume its
        // arrival edge before the route reaches it. Without a route every
        // active visit is a candidate.
        let candidates: Vec<&TargetVisit> = match &state.route {
            Some(route) if route.status.is_live() => {
                let current_visit = route
                    .current_index()
                    .map(|i| route.waypoints[i].visit_id);
                state
                    .visits
                    .active()
                    .into_iter()
                    .filter(|v| {
                        v.status == VisitStatus::InProgress || Some(v.id) == current_visit
                    })
                    .collect()
            }
            _ => state.visits.active(),
        };
        let geofence_events = state.geofence.evaluate(point, &candidates)?;

        // Arrival starts the visit's timer automatically.
        let mut visits_changed = false;
        for event in &geofence_events {
            let GeofenceEvent::Arrival { visit_id, .. } = event else {
                continue;
            };
            let pending = state
                .visits
                .get(*visit_id)
                .map(|v| v.status == VisitStatus::Pending)
                .unwrap_or(false);
            if pending {
                state.visits.start(*visit_id)?;
                visits_changed = true;
            }
        }
        if visits_changed {
            feed.publish_visits(&partition.agent_id, state.visits.active_snapshot());
        }

        let navigation_added_km = match state.navigation.as_mut() {
            Some(session) => session.record(point)?,
            None => 0.0,
        };

        feed.publish_position(&partition.company_id, sample);
        Ok(PositionOutcome {
            accepted: true,
            geofence_events,
            navigation_added_km,
        })
    }

    pub async fn current_position(&self, agent_id: &str) -> Result<Option<AgentPosition>, EngineError> {
        let partition = self.partition(agent_id)?;
        let state = partition.state.lock().await;
        Ok(state.positions.current().cloned())
    }

    pub async fn position_history(&self, agent_id: &str) -> Result<Vec<AgentPosition>, EngineError> {
        let partition = self.partition(agent_id)?;
        let state = partition.state.lock().await;
        Ok(state.positions.history().cloned().collect())
    }

    // ========================================================================
    // Visits
    // ========================================================================

    /// Assign a target to an agent, creating the agent partition on first
    /// contact. Returns the (possibly pre-existing) open visit id.
    pub async fn assign_visit(
        &self,
        agent_id: &str,
        company_id: &str,
        target: &Target,
    ) -> Result<Uuid, EngineError> {
        self.register_agent(agent_id, company_id);
        let partition = self.partition(agent_id)?;
        let mut state = partition.state.lock().await;
        let visit_id = state.visits.assign(agent_id, company_id, target);
        self.feed
            .publish_visits(agent_id, state.visits.active_snapshot());
        Ok(visit_id)
    }

    pub async fn start_visit(&self, agent_id: &str, visit_id: Uuid) -> Result<TargetVisit, EngineError> {
        let partition = self.partition(agent_id)?;
        let mut state = partition.state.lock().await;
        let visit = state.visits.start(visit_id)?.clone();
        self.feed
            .publish_visits(agent_id, state.visits.active_snapshot());
        Ok(visit)
    }

    /// Complete an in-progress visit, recording the outcome note and the
    /// agent's current position. The terminal record goes to the archive.
    pub async fn complete_visit(
        &self,
        agent_id: &str,
        visit_id: Uuid,
        outcome: Option<String>,
    ) -> Result<TargetVisit, EngineError> {
        let partition = self.partition(agent_id)?;
        let mut state = partition.state.lock().await;
        let position = state.positions.current().map(|p| p.point);
        let visit = state.visits.complete(visit_id, outcome, position)?.clone();
        self.archive.archive_visit(&visit)?;
        Self::sync_route_to_visit(&mut state, agent_id, visit_id, WaypointStatus::Visited, &self.feed);
        self.feed
            .publish_visits(agent_id, state.visits.active_snapshot());
        Ok(visit)
    }

    pub async fn skip_visit(
        &self,
        agent_id: &str,
        visit_id: Uuid,
        reason: Option<String>,
    ) -> Result<TargetVisit, EngineError> {
        let partition = self.partition(agent_id)?;
        let mut state = partition.state.lock().await;
        let visit = state.visits.skip(visit_id, reason)?.clone();
        self.archive.archive_visit(&visit)?;
        Self::sync_route_to_visit(&mut state, agent_id, visit_id, WaypointStatus::Skipped, &self.feed);
        self.feed
            .publish_visits(agent_id, state.visits.active_snapshot());
        Ok(visit)
    }

    /// A visit completed or skipped directly also settles its stop on the
    /// live route, so the route cannot sit on a terminal visit.
    fn sync_route_to_visit(
        state: &mut PartitionState,
        agent_id: &str,
        visit_id: Uuid,
        terminal: WaypointStatus,
        feed: &FeedHub,
    ) {
        let Some(route) = state.route.as_mut() else {
            return;
        };
        if route::sync_visit_terminal(route, visit_id, terminal) {
            feed.publish_route(agent_id, Some(route.clone()));
        }
    }

    pub async fn active_visits(&self, agent_id: &str) -> Result<Vec<TargetVisit>, EngineError> {
        let partition = self.partition(agent_id)?;
        let state = partition.state.lock().await;
        Ok(state.visits.active_snapshot())
    }

    pub async fn visit(&self, agent_id: &str, visit_id: Uuid) -> Result<TargetVisit, EngineError> {
        let partition = self.partition(agent_id)?;
        let state = partition.state.lock().await;
        state
            .visits
            .get(visit_id)
            .cloned()
            .ok_or(EngineError::VisitNotFound {
                agent_id: agent_id.to_string(),
                visit_id,
            })
    }

    // ========================================================================
    // Routes
    // ========================================================================

    /// Build and install an optimized route over the agent's pending visits.
    ///
    /// `origin` defaults to the agent's current position. At most
    /// `max_waypoints` visits are routed (oldest first); the rest come back
    /// in `unrouted_visit_ids`. `options` tunes the ordering pass, the
    /// waypoint cap and whether a closing leg back to the origin is added.
    /// An existing live route is cancelled and superseded by the new one.
    pub async fn create_optimized_route(
        &self,
        agent_id: &str,
        origin: Option<GeoPoint>,
        options: RouteOptions,
    ) -> Result<RouteCreation, EngineError> {
        let partition = self.partition(agent_id)?;

        // Snapshot under the lock.
        let (origin, selected, unrouted_visit_ids) = {
            let state = partition.state.lock().await;
            let origin = origin
                .or_else(|| state.positions.current().map(|p| p.point))
                .ok_or_else(|| EngineError::NoKnownPosition {
                    agent_id: agent_id.to_string(),
                })?;

            let pending = state.visits.pending();
            let cap = options
                .max_waypoints
                .unwrap_or(self.cfg.routing.max_waypoints);
            let selected: Vec<TargetVisit> =
                pending.iter().take(cap).map(|v| (*v).clone()).collect();
            let unrouted: Vec<Uuid> = pending.iter().skip(cap).map(|v| v.id).collect();
            (origin, selected, unrouted)
        };

        if selected.is_empty() {
            return Err(EngineError::NoPendingVisits {
                agent_id: agent_id.to_string(),
            });
        }

        // Provider call happens with the partition unlocked.
        let visit_refs: Vec<&TargetVisit> = selected.iter().collect();
        let plan = self.plan_route(origin, &visit_refs, &options).await?;
        let route = route::assemble_route(
            agent_id,
            &partition.company_id,
            origin,
            &visit_refs,
            plan,
        );

        // Re-acquire and verify the snapshot is still valid before installing.
        let mut state = partition.state.lock().await;
        for visit in &selected {
            let still_pending = state
                .visits
                .get(visit.id)
                .map(|v| v.status == VisitStatus::Pending)
                .unwrap_or(false);
            if !still_pending {
                return Err(EngineError::ConcurrentModification(format!(
                    "visit {} changed state during route planning",
                    visit.id
                )));
            }
        }

        if let Some(old) = state.route.as_mut() {
            if old.status.is_live() {
                route::cancel(old)?;
                info!(agent_id, old_route = %old.id, new_route = %route.id, "route superseded");
            }
        }
        state.route = Some(route.clone());
        self.feed.publish_route(agent_id, Some(route.clone()));

        Ok(RouteCreation {
            route,
            unrouted_visit_ids,
        })
    }

    async fn plan_route(
        &self,
        origin: GeoPoint,
        visits: &[&TargetVisit],
        options: &RouteOptions,
    ) -> Result<RoutePlan, EngineError> {
        if let Some(provider) = &self.provider {
            // Submit in the heuristic's order so a provider that preserves
            // input order still gets a sensible plan.
            let pre_plan = route::heuristic_plan(origin, visits, &self.cfg.routing, options)?;
            let pre_order = pre_plan.order;
            let ordered: Vec<&TargetVisit> = pre_order.iter().map(|&i| visits[i]).collect();
            let stops: Vec<GeoPoint> = ordered.iter().map(|v| v.location.point).collect();

            match route::provider::plan_with_retry(provider.as_ref(), origin, &stops, &self.cfg.routing)
                .await
            {
                Ok(plan) => {
                    // Map the provider's order over `ordered` back to indices
                    // into the caller's `visits`. The closing leg stays a
                    // straight-line estimate; providers only plan the stops.
                    let order: Vec<usize> = plan.order.iter().map(|&i| pre_order[i]).collect();
                    let return_leg = match (options.return_to_origin, order.last()) {
                        (true, Some(&last)) => Some(route::estimated_return_leg(
                            visits[last].location.point,
                            origin,
                            &self.cfg.routing,
                        )?),
                        _ => None,
                    };
                    return Ok(RoutePlan {
                        order,
                        legs: plan.legs,
                        return_leg,
                        degraded: false,
                    });
                }
                Err(e) => {
                    warn!(error = %e, "provider routing failed, using local heuristic");
                }
            }
        }
        route::heuristic_plan(origin, visits, &self.cfg.routing, options)
    }

    pub async fn start_route(&self, agent_id: &str) -> Result<OptimizedRoute, EngineError> {
        self.mutate_route(agent_id, route::start).await
    }

    pub async fn pause_route(&self, agent_id: &str) -> Result<OptimizedRoute, EngineError> {
        self.mutate_route(agent_id, route::pause).await
    }

    pub async fn resume_route(&self, agent_id: &str) -> Result<OptimizedRoute, EngineError> {
        self.mutate_route(agent_id, route::resume).await
    }

    /// Cancel the agent's route and cascade its unfinished stops to skipped
    /// visits. Cancelling an already-cancelled route is a no-op.
    pub async fn cancel_route(&self, agent_id: &str) -> Result<OptimizedRoute, EngineError> {
        let partition = self.partition(agent_id)?;
        let mut state = partition.state.lock().await;
        let route = state
            .route
            .as_mut()
            .ok_or(EngineError::NoActiveRoute {
                agent_id: agent_id.to_string(),
            })?;
        if route.status == RouteStatus::Cancelled {
            return Ok(route.clone());
        }
        route::cancel(route)?;

        // Cascade: stops that never happened become skipped visits.
        let open_visit_ids: Vec<Uuid> = route
            .waypoints
            .iter()
            .filter(|wp| {
                matches!(
                    wp.visit_status,
                    WaypointStatus::Pending | WaypointStatus::Current
                )
            })
            .map(|wp| wp.visit_id)
            .collect();
        let snapshot = route.clone();

        for visit_id in open_visit_ids {
            let still_open = state
                .visits
                .get(visit_id)
                .map(|v| !v.status.is_terminal())
                .unwrap_or(false);
            if still_open {
                let visit = state
                    .visits
                    .skip(visit_id, Some("route cancelled".to_string()))?
                    .clone();
                self.archive.archive_visit(&visit)?;
            }
        }

        self.feed
            .publish_visits(agent_id, state.visits.active_snapshot());
        self.feed.publish_route(agent_id, Some(snapshot.clone()));
        Ok(snapshot)
    }

    async fn mutate_route(
        &self,
        agent_id: &str,
        op: impl FnOnce(&mut OptimizedRoute) -> Result<(), EngineError>,
    ) -> Result<OptimizedRoute, EngineError> {
        let partition = self.partition(agent_id)?;
        let mut state = partition.state.lock().await;
        let route = state
            .route
            .as_mut()
            .ok_or(EngineError::NoActiveRoute {
                agent_id: agent_id.to_string(),
            })?;
        op(route)?;
        let snapshot = route.clone();
        self.feed.publish_route(agent_id, Some(snapshot.clone()));
        Ok(snapshot)
    }

    /// Mark the current waypoint visited and complete its visit in one step.
    /// A pending visit is started implicitly so its record carries a timer.
    ///
    /// Both transitions are validated before either mutates, so a rejected
    /// call leaves route and visit untouched.
    pub async fn complete_route_waypoint(
        &self,
        agent_id: &str,
        waypoint_id: Uuid,
        outcome: Option<String>,
    ) -> Result<OptimizedRoute, EngineError> {
        let partition = self.partition(agent_id)?;
        let mut state = partition.state.lock().await;
        let route = state
            .route
            .as_ref()
            .ok_or(EngineError::NoActiveRoute {
                agent_id: agent_id.to_string(),
            })?;
        let visit_id = route::check_advance(route, waypoint_id, "complete_waypoint")?;

        let position = state.positions.current().map(|p| p.point);
        if state
            .visits
            .get(visit_id)
            .map(|v| v.status == VisitStatus::Pending)
            .unwrap_or(false)
        {
            state.visits.start(visit_id)?;
        }
        let visit = state.visits.complete(visit_id, outcome, position)?.clone();
        self.archive.archive_visit(&visit)?;

        // Validated above; the route mutation cannot fail now.
        let route = state.route.as_mut().ok_or_else(|| {
            EngineError::ConcurrentModification("route removed mid-operation".to_string())
        })?;
        route::complete_waypoint(route, waypoint_id)?;
        let snapshot = route.clone();

        self.feed
            .publish_visits(agent_id, state.visits.active_snapshot());
        self.feed.publish_route(agent_id, Some(snapshot.clone()));
        Ok(snapshot)
    }

    /// Mark the current waypoint skipped and skip its visit.
    pub async fn skip_route_waypoint(
        &self,
        agent_id: &str,
        waypoint_id: Uuid,
        reason: Option<String>,
    ) -> Result<OptimizedRoute, EngineError> {
        let partition = self.partition(agent_id)?;
        let mut state = partition.state.lock().await;
        let route = state
            .route
            .as_ref()
            .ok_or(EngineError::NoActiveRoute {
                agent_id: agent_id.to_string(),
            })?;
        let visit_id = route::check_advance(route, waypoint_id, "skip_waypoint")?;

        let visit = state.visits.skip(visit_id, reason)?.clone();
        self.archive.archive_visit(&visit)?;

        let route = state.route.as_mut().ok_or_else(|| {
            EngineError::ConcurrentModification("route removed mid-operation".to_string())
        })?;
        route::skip_waypoint(route, waypoint_id)?;
        let snapshot = route.clone();

        self.feed
            .publish_visits(agent_id, state.visits.active_snapshot());
        self.feed.publish_route(agent_id, Some(snapshot.clone()));
        Ok(snapshot)
    }

    pub async fn active_route(&self, agent_id: &str) -> Result<Option<OptimizedRoute>, EngineError> {
        let partition = self.partition(agent_id)?;
        let state = partition.state.lock().await;
        Ok(state.route.clone())
    }

    pub async fn route_summary(&self, agent_id: &str) -> Result<Option<RouteSummary>, EngineError> {
        let partition = self.partition(agent_id)?;
        let state = partition.state.lock().await;
        Ok(state.route.as_ref().map(RouteSummary::of))
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    /// Open a navigation session toward a visit's target, anchored at
    /// `start`. At most one session per agent may be in progress.
    pub async fn start_navigation(
        &self,
        agent_id: &str,
        visit_id: Uuid,
        start: GeoPoint,
    ) -> Result<Uuid, EngineError> {
        let partition = self.partition(agent_id)?;
        let mut state = partition.state.lock().await;
        if state.navigation.is_some() {
            return Err(EngineError::AlreadyNavigating {
                agent_id: agent_id.to_string(),
            });
        }
        let visit = state
            .visits
            .get(visit_id)
            .ok_or(EngineError::VisitNotFound {
                agent_id: agent_id.to_string(),
                visit_id,
            })?;
        if visit.status.is_terminal() {
            return Err(EngineError::InvalidTransition {
                from: visit.status,
                action: "start_navigation",
            });
        }
        let session = NavigationSession::begin(self.cfg.navigation.clone(), visit, start)?;
        let id = session.entry().id;
        state.navigation = Some(session);
        Ok(id)
    }

    /// Close the agent's navigation session. The traveled distance is written
    /// onto the visit record and the session is archived. Stopping when no
    /// session is running returns `None` rather than failing, so a double
    /// cancel from a flaky client is harmless.
    pub async fn stop_navigation(
        &self,
        agent_id: &str,
        completed: bool,
    ) -> Result<Option<NavigationTrackingEntry>, EngineError> {
        let partition = self.partition(agent_id)?;
        let mut state = partition.state.lock().await;
        let Some(session) = state.navigation.take() else {
            return Ok(None);
        };
        let entry = session.finish(completed);
        state
            .visits
            .record_navigation_distance(entry.visit_id, entry.total_distance_km)?;
        self.archive.archive_navigation(&entry)?;
        self.feed
            .publish_visits(agent_id, state.visits.active_snapshot());
        Ok(Some(entry))
    }

    /// Total distance navigated today (UTC): archived sessions completed
    /// since midnight plus the live session, if any.
    pub async fn today_navigation_distance(
        &self,
        agent_id: &str,
    ) -> Result<NavigationDaySummary, EngineError> {
        let partition = self.partition(agent_id)?;
        let state = partition.state.lock().await;

        let midnight = Utc::now()
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc())
            .unwrap_or_else(Utc::now);
        let completed = self.archive.navigation_completed_since(agent_id, midnight)?;

        let mut summary = NavigationDaySummary {
            total_km: completed.iter().map(|e| e.total_distance_km).sum(),
            navigation_count: completed.len(),
        };
        if let Some(session) = &state.navigation {
            summary.total_km += session.total_distance_km();
            summary.navigation_count += 1;
        }
        Ok(summary)
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    pub fn subscribe_active_visits(&self, agent_id: &str) -> broadcast::Receiver<VisitSnapshot> {
        self.feed.subscribe_visits(agent_id)
    }

    pub fn subscribe_active_route(&self, agent_id: &str) -> broadcast::Receiver<RouteSnapshot> {
        self.feed.subscribe_route(agent_id)
    }

    pub fn subscribe_positions(&self, company_id: &str) -> broadcast::Receiver<AgentPosition> {
        self.feed.subscribe_positions(company_id)
    }
}
