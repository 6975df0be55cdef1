//! Engine configuration - all tracking/routing tunables as TOML values
//!
//! Each struct implements `Default` with the values the engine ships with,
//! so behavior is unchanged when no config file is present.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for an engine deployment.
///
/// Load with `EngineConfig::load()` which searches:
/// 1. `$FIELDTRACK_CONFIG` env var
/// 2. `./fieldtrack.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Position sample validation and history retention
    #[serde(default)]
    pub ingest: IngestConfig,

    /// Arrival/departure geofencing
    #[serde(default)]
    pub geofence: GeofenceConfig,

    /// Route optimization and external provider
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Navigation distance tracking
    #[serde(default)]
    pub navigation: NavigationConfig,

    /// Live subscription feed
    #[serde(default)]
    pub feed: FeedConfig,
}

impl EngineConfig {
    /// Load configuration using the standard search order.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var("FIELDTRACK_CONFIG") {
            match Self::from_file(&path) {
                Ok(cfg) => {
                    info!(path = %path, "Loaded engine config from FIELDTRACK_CONFIG");
                    return cfg;
                }
                Err(e) => {
                    warn!(path = %path, error = %e, "Failed to load FIELDTRACK_CONFIG — falling back");
                }
            }
        }

        let local = Path::new("fieldtrack.toml");
        if local.exists() {
            match Self::from_file(local) {
                Ok(cfg) => {
                    info!("Loaded engine config from ./fieldtrack.toml");
                    return cfg;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to parse ./fieldtrack.toml — using defaults");
                }
            }
        }

        info!("No config file found — using built-in defaults");
        Self::default()
    }

    /// Parse a TOML config file. Unknown keys are ignored; missing keys take
    /// their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let cfg: Self = toml::from_str(&text)?;
        Ok(cfg)
    }
}

// ============================================================================
// Ingestion
// ============================================================================

/// Position sample validation and per-day history retention.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Samples with a reported accuracy radius above this are rejected
    /// (logged, never surfaced) to keep noisy fixes out of geofencing.
    pub accuracy_ceiling_m: f64,
    /// Ring-buffer capacity of the per-agent per-day trail.
    pub history_capacity: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            accuracy_ceiling_m: 100.0,
            history_capacity: 150,
        }
    }
}

// ============================================================================
// Geofencing
// ============================================================================

/// Arrival/departure radius and hysteresis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeofenceConfig {
    /// Arrival triggers when distance to the target first drops below this.
    pub radius_m: f64,
    /// Departure triggers when distance exceeds `radius_m * hysteresis_factor`.
    /// The band between the two suppresses flapping at the boundary.
    pub hysteresis_factor: f64,
}

impl Default for GeofenceConfig {
    fn default() -> Self {
        Self {
            radius_m: 150.0,
            hysteresis_factor: 1.5,
        }
    }
}

impl GeofenceConfig {
    pub fn departure_radius_m(&self) -> f64 {
        self.radius_m * self.hysteresis_factor
    }
}

// ============================================================================
// Routing
// ============================================================================

/// Route optimization and external provider behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Hard cap on waypoints per route; excess visits are reported back
    /// unrouted, never silently dropped.
    pub max_waypoints: usize,
    /// Skip the 2-opt improvement pass above this many waypoints so route
    /// creation stays bounded.
    pub two_opt_cutoff: usize,
    /// Assumed travel speed for the straight-line ETA fallback (km/h).
    pub fallback_speed_kmh: f64,
    /// Per-attempt timeout for external provider calls (seconds).
    pub provider_timeout_secs: u64,
    /// Retries after the first failed provider attempt.
    pub provider_retries: u32,
    /// Base URL of the external routing service; `None` disables provider
    /// routing entirely and every route uses the local heuristic.
    #[serde(default)]
    pub provider_url: Option<String>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            max_waypoints: 10,
            two_opt_cutoff: 12,
            fallback_speed_kmh: 40.0,
            provider_timeout_secs: 8,
            provider_retries: 1,
            provider_url: None,
        }
    }
}

// ============================================================================
// Navigation
// ============================================================================

/// Navigation distance tracking.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Samples closer than this to the previous trail point are ignored so
    /// GPS jitter while stationary does not inflate the traveled distance.
    pub min_movement_m: f64,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self { min_movement_m: 10.0 }
    }
}

// ============================================================================
// Feed
// ============================================================================

/// Live subscription feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Per-topic broadcast buffer. A subscriber that falls further behind
    /// than this observes dropped snapshots instead of blocking the writer.
    pub channel_capacity: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self { channel_capacity: 64 }
    }
}
