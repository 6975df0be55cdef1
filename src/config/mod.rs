//! Engine Configuration Module
//!
//! Every operational tunable (geofence radius, accuracy ceiling, provider
//! timeout, ...) is a TOML field with a built-in default, so deployments can
//! adjust behavior without code changes.
//!
//! ## Loading Order
//!
//! 1. `FIELDTRACK_CONFIG` environment variable (path to TOML file)
//! 2. `fieldtrack.toml` in the current working directory
//! 3. Built-in defaults
//!
//! ## Usage
//!
//! Call `config::init()` once at startup, then `config::get()` anywhere:
//!
//! ```ignore
//! // In main():
//! config::init(EngineConfig::load());
//!
//! // Anywhere in the codebase:
//! let radius = config::get().geofence.radius_m;
//! ```
//!
//! Components also accept their config section directly (for example
//! `GeofenceEvaluator::new(GeofenceConfig { .. })`), so tests can parametrize
//! over tunables without touching the global.

mod engine_config;

pub use engine_config::*;

use std::sync::OnceLock;

/// Global engine configuration, initialized once at startup.
static ENGINE_CONFIG: OnceLock<EngineConfig> = OnceLock::new();

/// Initialize the global engine configuration.
///
/// Must be called exactly once before any calls to `get()`. A second call is
/// ignored with a warning.
pub fn init(config: EngineConfig) {
    if ENGINE_CONFIG.set(config).is_err() {
        tracing::warn!("config::init() called more than once — ignoring");
    }
}

/// Get a reference to the global engine configuration.
///
/// Panics if `init()` has not been called — a missing config is a fatal
/// startup error, not a recoverable condition.
pub fn get() -> &'static EngineConfig {
    ENGINE_CONFIG
        .get()
        .expect("config::get() called before config::init() — this is a startup bug")
}

/// Check whether the config has been initialized.
pub fn is_initialized() -> bool {
    ENGINE_CONFIG.get().is_some()
}
