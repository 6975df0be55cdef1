//! Navigation Distance Tracking
//!
//! One session per agent at a time, measuring the distance actually traveled
//! toward a visit target as the sum of consecutive haversine legs over the
//! recorded trail. Samples that move less than the configured minimum are
//! dropped so GPS jitter at a standstill does not inflate the total; the
//! accumulated distance therefore never decreases while a session runs.

use chrono::Utc;
use tracing::{debug, info};

use crate::config::NavigationConfig;
use crate::error::EngineError;
use crate::geo;
use crate::types::{
    GeoPoint, NavigationStatus, NavigationTrackingEntry, RoutePoint, TargetVisit,
};
use uuid::Uuid;

/// An in-progress navigation episode for one agent.
#[derive(Debug)]
pub struct NavigationSession {
    cfg: NavigationConfig,
    entry: NavigationTrackingEntry,
}

impl NavigationSession {
    /// Open a session toward `visit`'s target, anchored at `start`.
    pub fn begin(
        cfg: NavigationConfig,
        visit: &TargetVisit,
        start: GeoPoint,
    ) -> Result<Self, EngineError> {
        geo::validate(start)?;
        let now = Utc::now();
        let entry = NavigationTrackingEntry {
            id: Uuid::new_v4(),
            agent_id: visit.agent_id.clone(),
            company_id: visit.company_id.clone(),
            visit_id: visit.id,
            target_id: visit.target_id.clone(),
            target_name: visit.target_name.clone(),
            target_location: visit.location.point,
            route_points: vec![RoutePoint {
                point: start,
                captured_at: now,
            }],
            total_distance_km: 0.0,
            status: NavigationStatus::InProgress,
            started_at: now,
            completed_at: None,
        };
        info!(agent_id = %entry.agent_id, visit_id = %visit.id, "navigation started");
        Ok(Self { cfg, entry })
    }

    /// Record one accepted position sample.
    ///
    /// Returns the distance added in km (zero when the sample was within the
    /// minimum-movement radius and dropped).
    pub fn record(&mut self, point: GeoPoint) -> Result<f64, EngineError> {
        // begin() guarantees at least one trail point.
        let last = match self.entry.route_points.last() {
            Some(rp) => rp.point,
            None => {
                return Err(EngineError::ConcurrentModification(
                    "navigation trail is empty".to_string(),
                ))
            }
        };
        let moved_m = geo::haversine_meters(last, point)?;
        if moved_m < self.cfg.min_movement_m {
            debug!(moved_m, "navigation sample below movement threshold");
            return Ok(0.0);
        }

        self.entry.route_points.push(RoutePoint {
            point,
            captured_at: Utc::now(),
        });
        let added_km = moved_m / 1000.0;
        self.entry.total_distance_km += added_km;
        Ok(added_km)
    }

    /// Close the session. `completed` distinguishes reaching the target from
    /// abandoning the drive; the traveled distance is kept either way.
    pub fn finish(mut self, completed: bool) -> NavigationTrackingEntry {
        self.entry.status = if completed {
            NavigationStatus::Completed
        } else {
            NavigationStatus::Cancelled
        };
        self.entry.completed_at = Some(Utc::now());
        info!(
            agent_id = %self.entry.agent_id,
            total_km = self.entry.total_distance_km,
            status = %self.entry.status,
            "navigation finished"
        );
        self.entry
    }

    pub fn entry(&self) -> &NavigationTrackingEntry {
        &self.entry
    }

    pub fn visit_id(&self) -> Uuid {
        self.entry.visit_id
    }

    pub fn total_distance_km(&self) -> f64 {
        self.entry.total_distance_km
    }
}
