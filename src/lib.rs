//! Fieldtrack: Field Visit Tracking & Route Optimization
//!
//! Streaming engine for field sales/service teams: ingests agent GPS
//! positions, detects arrival and departure at assigned targets, drives visit
//! records through their lifecycle, plans multi-stop routes and measures the
//! distance actually traveled per navigation session.
//!
//! ## Architecture
//!
//! - **Ingest**: per-agent position validation and daily trail
//! - **Geofence**: edge-triggered arrival/departure with hysteresis
//! - **Visits**: forward-only visit state machine
//! - **Route**: nearest-neighbor/2-opt ordering with provider fallback
//! - **Navigation**: point-to-point traveled-distance tracking
//! - **Engine**: per-agent-partitioned facade tying it all together

pub mod config;
pub mod engine;
pub mod error;
pub mod feed;
pub mod geo;
pub mod geofence;
pub mod ingest;
pub mod navigation;
pub mod route;
pub mod storage;
pub mod types;
pub mod visits;

// Re-export engine configuration
pub use config::EngineConfig;

// Re-export the facade and its result types
pub use engine::{FieldEngine, PositionOutcome, RouteCreation};

// Re-export commonly used types
pub use types::{
    AgentPosition, GeoPoint, NavigationDaySummary, NavigationStatus, NavigationTrackingEntry,
    OptimizedRoute, RouteStatus, RouteSummary, RouteWaypoint, Target, TargetLocation,
    TargetOrigin, TargetVisit, VisitStatus, WaypointStatus,
};

// Re-export errors and events
pub use error::EngineError;
pub use geofence::GeofenceEvent;

// Re-export storage and provider seams
pub use route::provider::{HttpRouteProvider, RouteProvider};
pub use route::{OrderingAlgorithm, RouteOptions};
pub use storage::Archive;
