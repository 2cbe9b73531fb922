pub mod routing;

use serde::{Deserialize, Serialize};

pub use routing::{RouteResolver, RouteSource};

const EARTH_RADIUS_KM: f64 = 6_371.0;

/// Markup applied to the straight-line distance to approximate road distance.
const ROAD_FACTOR: f64 = 1.2;

/// Assumed average urban driving speed for duration estimates.
const AVERAGE_URBAN_SPEED_KMH: f64 = 30.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RouteSummary {
    /// Road distance in meters.
    pub distance: f64,
    /// Travel time in seconds.
    pub duration: f64,
    #[serde(rename = "distanceKm")]
    pub distance_km: f64,
}

pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let sin_lat = (delta_lat / 2.0).sin();
    let sin_lng = (delta_lng / 2.0).sin();

    let haversine = sin_lat * sin_lat + lat1.cos() * lat2.cos() * sin_lng * sin_lng;
    let central_angle = 2.0 * haversine.sqrt().asin();

    EARTH_RADIUS_KM * central_angle
}

/// Straight-line estimate used when the routing provider is unreachable or
/// unconfigured. Deterministic for identical inputs and never fails.
pub fn fallback_route(start: &GeoPoint, end: &GeoPoint) -> RouteSummary {
    let distance_km = round2(haversine_km(start, end) * ROAD_FACTOR);
    let duration = distance_km / AVERAGE_URBAN_SPEED_KMH * 3600.0;

    RouteSummary {
        distance: distance_km * 1000.0,
        duration,
        distance_km,
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
