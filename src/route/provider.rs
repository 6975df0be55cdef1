//! External Routing Provider
//!
//! Road-network routing lives behind the `RouteProvider` trait so the engine
//! can be tested without a network and deployments can swap services. The
//! shipped implementation speaks the OSRM HTTP API.
//!
//! `plan_with_retry` wraps any provider with the engine's timeout/retry
//! policy: each attempt is bounded, one retry by default, and the final error
//! is returned to the caller who then falls back to the local heuristic.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

use crate::config::RoutingConfig;
use crate::error::EngineError;
use crate::types::GeoPoint;

/// One leg of a provider plan, from the previous stop (or the origin for the
/// first leg) to this stop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProviderLeg {
    pub distance_m: f64,
    pub duration_s: f64,
}

/// A provider's answer: stop order plus road-network leg metrics.
///
/// `order[k]` is an index into the submitted stop list; `legs[k]` is the leg
/// ending at that stop. Both have exactly one entry per submitted stop.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderPlan {
    pub order: Vec<usize>,
    pub legs: Vec<ProviderLeg>,
}

#[async_trait]
pub trait RouteProvider: Send + Sync {
    /// Plan a single-vehicle run from `origin` through all of `stops`.
    async fn plan(&self, origin: GeoPoint, stops: &[GeoPoint]) -> Result<ProviderPlan, EngineError>;
}

/// Call the provider under the configured timeout, retrying once on failure.
pub async fn plan_with_retry(
    provider: &dyn RouteProvider,
    origin: GeoPoint,
    stops: &[GeoPoint],
    cfg: &RoutingConfig,
) -> Result<ProviderPlan, EngineError> {
    let timeout = Duration::from_secs(cfg.provider_timeout_secs);
    let attempts = cfg.provider_retries + 1;

    let mut last_err = EngineError::ProviderUnavailable("no attempts made".to_string());
    for attempt in 1..=attempts {
        match tokio::time::timeout(timeout, provider.plan(origin, stops)).await {
            Ok(Ok(plan)) => {
                if plan.order.len() == stops.len() && plan.legs.len() == stops.len() {
                    return Ok(plan);
                }
                last_err = EngineError::ProviderUnavailable(format!(
                    "plan covers {} of {} stops",
                    plan.order.len(),
                    stops.len()
                ));
            }
            Ok(Err(e)) => last_err = e,
            Err(_) => {
                last_err = EngineError::ProviderTimeout {
                    timeout_secs: cfg.provider_timeout_secs,
                }
            }
        }
        warn!(attempt, attempts, error = %last_err, "routing provider attempt failed");
    }
    Err(last_err)
}

// ============================================================================
// OSRM HTTP Implementation
// ============================================================================

/// OSRM `trip` service client.
///
/// Requests `source=first&roundtrip=false` so the trip starts at the agent's
/// position and ends at the last stop.
pub struct HttpRouteProvider {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct OsrmTripResponse {
    code: String,
    #[serde(default)]
    waypoints: Vec<OsrmWaypoint>,
    #[serde(default)]
    trips: Vec<OsrmTrip>,
}

#[derive(Debug, Deserialize)]
struct OsrmWaypoint {
    waypoint_index: usize,
}

#[derive(Debug, Deserialize)]
struct OsrmTrip {
    legs: Vec<OsrmLeg>,
}

#[derive(Debug, Deserialize)]
struct OsrmLeg {
    distance: f64,
    duration: f64,
}

impl HttpRouteProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    fn trip_url(&self, origin: GeoPoint, stops: &[GeoPoint]) -> String {
        let mut coords = format!("{},{}", origin.lon, origin.lat);
        for s in stops {
            coords.push_str(&format!(";{},{}", s.lon, s.lat));
        }
        format!(
            "{}/trip/v1/driving/{coords}?source=first&roundtrip=false&overview=false",
            self.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl RouteProvider for HttpRouteProvider {
    async fn plan(&self, origin: GeoPoint, stops: &[GeoPoint]) -> Result<ProviderPlan, EngineError> {
        let url = self.trip_url(origin, stops);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| EngineError::ProviderUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EngineError::ProviderUnavailable(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let body: OsrmTripResponse = response
            .json()
            .await
            .map_err(|e| EngineError::ProviderUnavailable(e.to_string()))?;

        if body.code != "Ok" {
            return Err(EngineError::ProviderUnavailable(format!(
                "OSRM code {}",
                body.code
            )));
        }
        let trip = body
            .trips
            .first()
            .ok_or_else(|| EngineError::ProviderUnavailable("empty trips".to_string()))?;
        if body.waypoints.len() != stops.len() + 1 || trip.legs.len() != stops.len() {
            return Err(EngineError::ProviderUnavailable(
                "malformed trip response".to_string(),
            ));
        }

        // waypoints[0] is the origin; the rest map submitted stop k to its
        // position in the trip. Invert that into visit order.
        let mut order = vec![usize::MAX; stops.len()];
        for (stop_idx, wp) in body.waypoints.iter().enumerate().skip(1) {
            let trip_pos = wp.waypoint_index;
            if trip_pos == 0 || trip_pos > stops.len() {
                return Err(EngineError::ProviderUnavailable(
                    "waypoint index out of range".to_string(),
                ));
            }
            order[trip_pos - 1] = stop_idx - 1;
        }
        if order.iter().any(|&i| i == usize::MAX) {
            return Err(EngineError::ProviderUnavailable(
                "incomplete waypoint mapping".to_string(),
            ));
        }

        let legs = trip
            .legs
            .iter()
            .map(|l| ProviderLeg {
                distance_m: l.distance,
                duration_s: l.duration,
            })
            .collect();

        Ok(ProviderPlan { order, legs })
    }
}
