//! Shared data structures for the field visit tracking engine
//!
//! The types here flow through the whole pipeline:
//! - `AgentPosition` — validated GPS samples from the ingestion path
//! - `Target` / `TargetVisit` — assigned destinations and their visit records
//! - `OptimizedRoute` / `RouteWaypoint` — ordered multi-stop plans
//! - `NavigationTrackingEntry` — per-agent point-to-point distance tracking

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Agent identifier, issued by the surrounding user-management system.
pub type AgentId = String;

/// Company identifier used to scope map/dashboard subscriptions.
pub type CompanyId = String;

// ============================================================================
// Geography
// ============================================================================

/// A WGS-84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lon)
    }
}

/// A named place with an optional street address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetLocation {
    pub point: GeoPoint,
    #[serde(default)]
    pub address: Option<String>,
}

// ============================================================================
// Position ingestion
// ============================================================================

/// One GPS sample reported by an agent device.
///
/// Ephemeral: each new accepted sample supersedes the previous one as the
/// agent's "current position". Accepted samples are also appended to a bounded
/// per-day history for trail reconstruction — they are discrete historical
/// facts and are never merged or averaged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentPosition {
    pub agent_id: AgentId,
    pub point: GeoPoint,
    /// Reported horizontal accuracy radius (meters). Samples above the
    /// configured ceiling are rejected to avoid geofence flapping.
    pub accuracy_m: f64,
    pub captured_at: DateTime<Utc>,
}

// ============================================================================
// Targets
// ============================================================================

/// How a target ended up on an agent's list.
///
/// Admin-assigned and self-logged targets carry the same payload; downstream
/// code matches on this enum instead of probing optional fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum TargetOrigin {
    AdminAssigned { assigned_by: String },
    SelfAssigned,
}

/// A named destination an agent can be sent to.
///
/// Immutable once visits reference it, except for administrative edits.
/// Deletion is soft (`archived`) so visit history stays intact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub id: String,
    pub name: String,
    pub location: TargetLocation,
    pub created_by: String,
    pub origin: TargetOrigin,
    #[serde(default)]
    pub archived: bool,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Visits
// ============================================================================

/// Lifecycle state of a target visit.
///
/// Status only moves forward: `Pending → InProgress → Completed`, with
/// `Skipped` reachable from either non-terminal state. Terminal states accept
/// no further transitions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Hash)]
#[serde(rename_all = "snake_case")]
pub enum VisitStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Skipped,
}

impl VisitStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, VisitStatus::Completed | VisitStatus::Skipped)
    }
}

impl std::fmt::Display for VisitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VisitStatus::Pending => write!(f, "PENDING"),
            VisitStatus::InProgress => write!(f, "IN_PROGRESS"),
            VisitStatus::Completed => write!(f, "COMPLETED"),
            VisitStatus::Skipped => write!(f, "SKIPPED"),
        }
    }
}

/// The work unit: one agent's visit to one target.
///
/// Invariant: at most one visit per (agent, target) is non-terminal at a time.
/// Mutated only by the visit state machine; archived, never deleted, once
/// terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetVisit {
    pub id: Uuid,
    pub agent_id: AgentId,
    pub company_id: CompanyId,
    pub target_id: String,
    pub target_name: String,
    pub location: TargetLocation,
    pub status: VisitStatus,
    pub created_at: DateTime<Utc>,
    /// Set on the `Pending → InProgress` transition.
    #[serde(default)]
    pub timer_started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Agent position captured at completion time.
    #[serde(default)]
    pub reached_location: Option<GeoPoint>,
    /// Free-form outcome note recorded on completion.
    #[serde(default)]
    pub outcome: Option<String>,
    #[serde(default)]
    pub skipped_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub skip_reason: Option<String>,
    /// `completed_at - timer_started_at`, whole minutes.
    #[serde(default)]
    pub duration_minutes: Option<i64>,
    /// Total distance of the navigation session that led here, if one ran.
    #[serde(default)]
    pub navigation_distance_km: Option<f64>,
}

impl TargetVisit {
    /// Create a fresh `Pending` visit for a target assignment.
    pub fn new(agent_id: AgentId, company_id: CompanyId, target: &Target) -> Self {
        Self {
            id: Uuid::new_v4(),
            agent_id,
            company_id,
            target_id: target.id.clone(),
            target_name: target.name.clone(),
            location: target.location.clone(),
            status: VisitStatus::Pending,
            created_at: Utc::now(),
            timer_started_at: None,
            completed_at: None,
            reached_location: None,
            outcome: None,
            skipped_at: None,
            skip_reason: None,
            duration_minutes: None,
            navigation_distance_km: None,
        }
    }
}

// ============================================================================
// Routes
// ============================================================================

/// Lifecycle state of an optimized route.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RouteStatus {
    Planning,
    Active,
    Paused,
    Completed,
    Cancelled,
}

impl RouteStatus {
    /// A live route blocks creation of another one for the same agent
    /// (creating a new route supersedes it instead).
    pub fn is_live(self) -> bool {
        matches!(
            self,
            RouteStatus::Planning | RouteStatus::Active | RouteStatus::Paused
        )
    }
}

impl std::fmt::Display for RouteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouteStatus::Planning => write!(f, "PLANNING"),
            RouteStatus::Active => write!(f, "ACTIVE"),
            RouteStatus::Paused => write!(f, "PAUSED"),
            RouteStatus::Completed => write!(f, "COMPLETED"),
            RouteStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// Visit progress of a single waypoint, kept consistent with the referenced
/// `TargetVisit` by the engine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WaypointStatus {
    Pending,
    Current,
    Visited,
    Skipped,
}

impl std::fmt::Display for WaypointStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WaypointStatus::Pending => write!(f, "PENDING"),
            WaypointStatus::Current => write!(f, "CURRENT"),
            WaypointStatus::Visited => write!(f, "VISITED"),
            WaypointStatus::Skipped => write!(f, "SKIPPED"),
        }
    }
}

/// One stop in an ordered route, wrapping a visit with sequencing and ETA
/// metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteWaypoint {
    pub id: Uuid,
    pub visit_id: Uuid,
    pub target_name: String,
    pub location: GeoPoint,
    /// 0-based, strictly increasing along the route. Fixed once the route is
    /// active — recalculation creates a new route.
    pub sequence_index: usize,
    /// Leg distance from the previous stop (or origin), meters.
    pub distance_from_previous_m: f64,
    /// Leg duration from the previous stop (or origin), seconds.
    pub duration_from_previous_s: f64,
    pub estimated_arrival: DateTime<Utc>,
    pub visit_status: WaypointStatus,
}

/// An ordered multi-stop plan for one agent.
///
/// Invariant: exactly one route with a live status per agent. Waypoint order
/// is fixed once the route leaves `Planning`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizedRoute {
    pub id: Uuid,
    pub agent_id: AgentId,
    pub company_id: CompanyId,
    pub origin: GeoPoint,
    pub waypoints: Vec<RouteWaypoint>,
    pub status: RouteStatus,
    /// True when the external provider failed and leg distances/ETAs come
    /// from the straight-line fallback model.
    pub degraded: bool,
    /// True when the totals include a closing leg back to the origin.
    #[serde(default)]
    pub return_to_origin: bool,
    pub total_distance_m: f64,
    pub total_duration_s: f64,
    pub created_at: DateTime<Utc>,
}

impl OptimizedRoute {
    /// Index of the waypoint currently marked `Current`, if any.
    pub fn current_index(&self) -> Option<usize> {
        self.waypoints
            .iter()
            .position(|wp| wp.visit_status == WaypointStatus::Current)
    }

    pub fn waypoint_by_id(&self, waypoint_id: Uuid) -> Option<&RouteWaypoint> {
        self.waypoints.iter().find(|wp| wp.id == waypoint_id)
    }
}

/// Aggregated route progress for dashboards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSummary {
    pub total_stops: usize,
    pub visited_stops: usize,
    pub skipped_stops: usize,
    pub remaining_stops: usize,
    /// 0-100, visited stops over total stops.
    pub progress_percent: u8,
    pub total_distance_m: f64,
    pub total_duration_s: f64,
    pub next_stop: Option<NextStop>,
}

/// The next unvisited stop on a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextStop {
    pub target_name: String,
    pub estimated_arrival: DateTime<Utc>,
    pub distance_from_previous_m: f64,
}

impl RouteSummary {
    pub fn of(route: &OptimizedRoute) -> Self {
        let total_stops = route.waypoints.len();
        let visited_stops = route
            .waypoints
            .iter()
            .filter(|wp| wp.visit_status == WaypointStatus::Visited)
            .count();
        let skipped_stops = route
            .waypoints
            .iter()
            .filter(|wp| wp.visit_status == WaypointStatus::Skipped)
            .count();
        let remaining_stops = total_stops - visited_stops - skipped_stops;
        let progress_percent = if total_stops > 0 {
            (visited_stops * 100 / total_stops) as u8
        } else {
            0
        };
        let next_stop = route
            .waypoints
            .iter()
            .find(|wp| {
                matches!(
                    wp.visit_status,
                    WaypointStatus::Current | WaypointStatus::Pending
                )
            })
            .map(|wp| NextStop {
                target_name: wp.target_name.clone(),
                estimated_arrival: wp.estimated_arrival,
                distance_from_previous_m: wp.distance_from_previous_m,
            });

        Self {
            total_stops,
            visited_stops,
            skipped_stops,
            remaining_stops,
            progress_percent,
            total_distance_m: route.total_distance_m,
            total_duration_s: route.total_duration_s,
            next_stop,
        }
    }
}

// ============================================================================
// Navigation tracking
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NavigationStatus {
    InProgress,
    Completed,
    Cancelled,
}

impl std::fmt::Display for NavigationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NavigationStatus::InProgress => write!(f, "IN_PROGRESS"),
            NavigationStatus::Completed => write!(f, "COMPLETED"),
            NavigationStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// A timestamped point along a navigation trail.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoutePoint {
    pub point: GeoPoint,
    pub captured_at: DateTime<Utc>,
}

/// One active point-to-point navigation episode.
///
/// Invariant: at most one entry with status `InProgress` per agent.
/// `total_distance_km` is the sum of consecutive haversine legs over
/// `route_points` and is monotonically non-decreasing while in progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationTrackingEntry {
    pub id: Uuid,
    pub agent_id: AgentId,
    pub company_id: CompanyId,
    pub visit_id: Uuid,
    pub target_id: String,
    pub target_name: String,
    pub target_location: GeoPoint,
    pub route_points: Vec<RoutePoint>,
    pub total_distance_km: f64,
    pub status: NavigationStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Per-day navigation totals for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct NavigationDaySummary {
    pub total_km: f64,
    pub navigation_count: usize,
}
