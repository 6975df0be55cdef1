//! Engine error taxonomy
//!
//! Propagation policy:
//! - Sample-quality errors (`LowAccuracySample`, `StaleSample`) are logged by
//!   the ingestion path and never surfaced to callers — the last good position
//!   simply stays in place.
//! - Provider errors (`ProviderTimeout`, `ProviderUnavailable`) trigger the
//!   local heuristic fallback and a `degraded` flag on the resulting route.
//! - State-machine and concurrency errors (`InvalidTransition`,
//!   `ConcurrentModification`) are returned to the caller so the UI can
//!   re-sync from the latest snapshot. They are never retried automatically.
//! - `InvalidCoordinate` is the only fatal input error: it fails immediately
//!   rather than attempting a best-effort interpretation.

use thiserror::Error;
use uuid::Uuid;

use crate::types::{RouteStatus, VisitStatus};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid coordinate: lat={lat}, lon={lon}")]
    InvalidCoordinate { lat: f64, lon: f64 },

    #[error("sample accuracy {accuracy_m:.1} m exceeds ceiling {ceiling_m:.1} m")]
    LowAccuracySample { accuracy_m: f64, ceiling_m: f64 },

    #[error("sample captured at {captured_at} is not newer than last accepted sample")]
    StaleSample { captured_at: chrono::DateTime<chrono::Utc> },

    #[error("invalid visit transition: {from} does not accept `{action}`")]
    InvalidTransition { from: VisitStatus, action: &'static str },

    #[error("invalid route transition: {from} does not accept `{action}`")]
    InvalidRouteTransition {
        from: RouteStatus,
        action: &'static str,
    },

    #[error("agent {agent_id} already has an in-progress navigation session")]
    AlreadyNavigating { agent_id: String },

    #[error("agent {agent_id} is not registered with the engine")]
    UnknownAgent { agent_id: String },

    #[error("agent {agent_id} has no known position")]
    NoKnownPosition { agent_id: String },

    #[error("routing provider timed out after {timeout_secs} s")]
    ProviderTimeout { timeout_secs: u64 },

    #[error("routing provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("route {route_id} not found for agent {agent_id}")]
    RouteNotFound { agent_id: String, route_id: Uuid },

    #[error("agent {agent_id} has no route")]
    NoActiveRoute { agent_id: String },

    #[error("waypoint {waypoint_id} not on route {route_id}")]
    WaypointNotFound { route_id: Uuid, waypoint_id: Uuid },

    #[error("visit {visit_id} not found for agent {agent_id}")]
    VisitNotFound { agent_id: String, visit_id: Uuid },

    #[error("agent {agent_id} has no pending visits to route")]
    NoPendingVisits { agent_id: String },

    #[error("concurrent modification: {0}")]
    ConcurrentModification(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl EngineError {
    /// Sample-quality errors are dropped by the ingestion path instead of
    /// being propagated to callers.
    pub fn is_sample_quality(&self) -> bool {
        matches!(
            self,
            EngineError::LowAccuracySample { .. } | EngineError::StaleSample { .. }
        )
    }
}

impl From<sled::Error> for EngineError {
    fn from(err: sled::Error) -> Self {
        EngineError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Storage(err.to_string())
    }
}
