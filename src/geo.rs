//! Great-circle distance and bearing primitives
//!
//! Every other component measures the world through this module. Distances
//! use the haversine formula on a spherical Earth (mean radius 6 371 000 m),
//! which is accurate to ~0.5 % — more than enough for geofencing and route
//! ordering at city scale.

use crate::error::EngineError;
use crate::types::GeoPoint;

/// Mean Earth radius, meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Reject NaN/infinite or out-of-range coordinates before any math runs.
///
/// Malformed input fails fast here instead of producing NaN distances that
/// would silently poison geofence and routing decisions downstream.
pub fn validate(p: GeoPoint) -> Result<(), EngineError> {
    let in_range = p.lat.is_finite()
        && p.lon.is_finite()
        && (-90.0..=90.0).contains(&p.lat)
        && (-180.0..=180.0).contains(&p.lon);
    if in_range {
        Ok(())
    } else {
        Err(EngineError::InvalidCoordinate {
            lat: p.lat,
            lon: p.lon,
        })
    }
}

/// Haversine great-circle distance in meters.
pub fn haversine_meters(a: GeoPoint, b: GeoPoint) -> Result<f64, EngineError> {
    validate(a)?;
    validate(b)?;

    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();

    let h = (d_lat * 0.5).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon * 0.5).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    Ok(EARTH_RADIUS_M * c)
}

/// Initial great-circle bearing from `a` to `b`, degrees in `[0, 360)`.
pub fn bearing_degrees(a: GeoPoint, b: GeoPoint) -> Result<f64, EngineError> {
    validate(a)?;
    validate(b)?;

    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let d_lon = (b.lon - a.lon).to_radians();

    let y = d_lon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lon.cos();

    Ok((y.atan2(x).to_degrees() + 360.0) % 360.0)
}

/// Straight-line travel time estimate, seconds.
///
/// Used only as the fallback ETA model when the routing provider is
/// unavailable; a non-positive speed yields zero rather than dividing by it.
pub fn eta_seconds(distance_m: f64, assumed_speed_kmh: f64) -> f64 {
    if assumed_speed_kmh <= 0.0 || distance_m <= 0.0 {
        return 0.0;
    }
    distance_m / (assumed_speed_kmh * 1000.0 / 3600.0)
}
