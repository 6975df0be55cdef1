//! Field Day Simulation
//!
//! Drives a scripted field day through the engine: one agent, a handful of
//! assigned targets, an optimized route, and a GPS trace that walks the route
//! stop by stop. Useful for eyeballing geofence events, route progress and
//! navigation distance without a live device.
//!
//! # Usage
//! ```bash
//! ./simulation --stops 4 --step-m 50
//! ```

use chrono::{Duration, Utc};
use clap::Parser;
use std::sync::Arc;
use tracing::info;

use fieldtrack::{
    config, Archive, AgentPosition, EngineConfig, FieldEngine, GeoPoint, RouteOptions, Target,
    TargetLocation, TargetOrigin,
};

#[derive(Parser, Debug)]
#[command(name = "simulation", about = "Scripted field day against the tracking engine")]
struct CliArgs {
    /// Number of targets to assign
    #[arg(long, default_value_t = 4)]
    stops: usize,

    /// Distance between simulated GPS samples, meters
    #[arg(long, default_value_t = 50.0)]
    step_m: f64,

    /// GPS accuracy attached to every sample, meters
    #[arg(long, default_value_t = 8.0)]
    accuracy_m: f64,
}

const AGENT: &str = "sim-agent";
const COMPANY: &str = "sim-company";

// Base coordinates: central Bengaluru.
const BASE_LAT: f64 = 12.9716;
const BASE_LON: f64 = 77.5946;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = CliArgs::parse();
    config::init(EngineConfig::load());

    let engine = Arc::new(FieldEngine::new(config::get().clone(), Archive::temp()?));
    engine.register_agent(AGENT, COMPANY);

    // Spread targets on a rough arc north-east of the base.
    for i in 0..args.stops {
        let target = Target {
            id: format!("target-{i}"),
            name: format!("Customer {i}"),
            location: TargetLocation {
                point: GeoPoint::new(
                    BASE_LAT + 0.008 * (i as f64 + 1.0),
                    BASE_LON + 0.004 * ((i % 3) as f64),
                ),
                address: None,
            },
            created_by: "sim-admin".to_string(),
            origin: TargetOrigin::AdminAssigned {
                assigned_by: "sim-admin".to_string(),
            },
            archived: false,
            created_at: Utc::now(),
        };
        engine.assign_visit(AGENT, COMPANY, &target).await?;
    }
    info!(stops = args.stops, "targets assigned");

    // Seed the agent's position at base.
    let mut clock = Utc::now();
    let origin = GeoPoint::new(BASE_LAT, BASE_LON);
    engine
        .report_position(sample(origin, args.accuracy_m, clock))
        .await?;

    let creation = engine
        .create_optimized_route(AGENT, None, RouteOptions::default())
        .await?;
    info!(
        route_id = %creation.route.id,
        waypoints = creation.route.waypoints.len(),
        degraded = creation.route.degraded,
        total_km = creation.route.total_distance_m / 1000.0,
        "route created"
    );
    engine.start_route(AGENT).await?;

    // Walk the route: straight-line march to each waypoint, completing it on
    // arrival.
    let mut position = origin;
    let route = creation.route;
    for wp in &route.waypoints {
        engine
            .start_navigation(AGENT, wp.visit_id, position)
            .await?;

        while fieldtrack::geo::haversine_meters(position, wp.location)? > args.step_m {
            position = step_toward(position, wp.location, args.step_m);
            clock += Duration::seconds(15);
            let outcome = engine
                .report_position(sample(position, args.accuracy_m, clock))
                .await?;
            for event in &outcome.geofence_events {
                info!(?event, "geofence");
            }
        }

        position = wp.location;
        clock += Duration::seconds(15);
        engine
            .report_position(sample(position, args.accuracy_m, clock))
            .await?;

        let traveled_km = engine
            .stop_navigation(AGENT, true)
            .await?
            .map_or(0.0, |nav| nav.total_distance_km);
        let updated = engine
            .complete_route_waypoint(AGENT, wp.id, Some("simulated".to_string()))
            .await?;
        info!(
            stop = %wp.target_name,
            traveled_km,
            route_status = %updated.status,
            "stop completed"
        );
    }

    let day = engine.today_navigation_distance(AGENT).await?;
    info!(
        total_km = day.total_km,
        sessions = day.navigation_count,
        "simulation finished"
    );
    Ok(())
}

fn sample(point: GeoPoint, accuracy_m: f64, at: chrono::DateTime<Utc>) -> AgentPosition {
    AgentPosition {
        agent_id: AGENT.to_string(),
        point,
        accuracy_m,
        captured_at: at,
    }
}

/// Move `step_m` meters from `from` toward `to` along the flat-earth chord —
/// fine at city scale for a simulation.
fn step_toward(from: GeoPoint, to: GeoPoint, step_m: f64) -> GeoPoint {
    let d_lat = to.lat - from.lat;
    let d_lon = to.lon - from.lon;
    let total_m = fieldtrack::geo::haversine_meters(from, to).unwrap_or(0.0);
    if total_m <= step_m {
        return to;
    }
    let f = step_m / total_m;
    GeoPoint::new(from.lat + d_lat * f, from.lon + d_lon * f)
}
