//! Geofence Evaluation
//!
//! Edge-triggered arrival/departure detection around visit targets. Each
//! accepted position sample is measured against every candidate visit; an
//! event fires only on a boundary crossing, not on every sample inside the
//! zone.
//!
//! Departure uses a wider radius than arrival (`radius_m * hysteresis_factor`)
//! so an agent hovering at the boundary does not generate an
//! arrive/depart/arrive storm.

use std::collections::HashSet;

use tracing::debug;
use uuid::Uuid;

use crate::config::GeofenceConfig;
use crate::error::EngineError;
use crate::geo;
use crate::types::{GeoPoint, TargetVisit};

/// A boundary crossing for one visit's geofence.
#[derive(Debug, Clone, PartialEq)]
pub enum GeofenceEvent {
    /// Agent entered the arrival radius of the visit's target.
    Arrival {
        visit_id: Uuid,
        distance_m: f64,
        position: GeoPoint,
    },
    /// Agent left the (wider) departure radius after having arrived.
    Departure { visit_id: Uuid, distance_m: f64 },
}

impl GeofenceEvent {
    pub fn visit_id(&self) -> Uuid {
        match self {
            GeofenceEvent::Arrival { visit_id, .. } => *visit_id,
            GeofenceEvent::Departure { visit_id, .. } => *visit_id,
        }
    }
}

/// Per-agent geofence evaluator.
///
/// Holds the set of visits the agent is currently inside; visits removed from
/// the candidate list (completed, skipped) are dropped from the set so a
/// reassigned target starts clean.
#[derive(Debug)]
pub struct GeofenceEvaluator {
    cfg: GeofenceConfig,
    inside: HashSet<Uuid>,
}

impl GeofenceEvaluator {
    pub fn new(cfg: GeofenceConfig) -> Self {
        Self {
            cfg,
            inside: HashSet::new(),
        }
    }

    /// Evaluate one position against the agent's candidate visits and return
    /// the boundary crossings it caused.
    pub fn evaluate(
        &mut self,
        position: GeoPoint,
        candidates: &[&TargetVisit],
    ) -> Result<Vec<GeofenceEvent>, EngineError> {
        // Forget zones whose visits are no longer candidates.
        let live: HashSet<Uuid> = candidates.iter().map(|v| v.id).collect();
        self.inside.retain(|id| live.contains(id));

        let mut events = Vec::new();
        for visit in candidates {
            let distance_m = geo::haversine_meters(position, visit.location.point)?;
            let was_inside = self.inside.contains(&visit.id);

            if !was_inside && distance_m < self.cfg.radius_m {
                self.inside.insert(visit.id);
                debug!(visit_id = %visit.id, distance_m, "geofence arrival");
                events.push(GeofenceEvent::Arrival {
                    visit_id: visit.id,
                    distance_m,
                    position,
                });
            } else if was_inside && distance_m > self.cfg.departure_radius_m() {
                self.inside.remove(&visit.id);
                debug!(visit_id = %visit.id, distance_m, "geofence departure");
                events.push(GeofenceEvent::Departure {
                    visit_id: visit.id,
                    distance_m,
                });
            }
        }
        Ok(events)
    }

    /// Whether the agent is currently inside the given visit's zone.
    pub fn is_inside(&self, visit_id: Uuid) -> bool {
        self.inside.contains(&visit_id)
    }
}
