use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::error::AppError;
use crate::geo::{fallback_route, GeoPoint, RouteSummary};

/// HTTP timeout for a single provider call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Geocoding results are restricted to this country, matching the market the
/// platform operates in.
const GEOCODE_COUNTRY: &str = "PL";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteSource {
    Provider,
    Fallback,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct Geocoded {
    pub lat: f64,
    pub lng: f64,
    pub formatted: String,
}

/// Client for the external routing provider. Distance resolution degrades to
/// a haversine estimate when the provider is unreachable or no API key is
/// configured; geocoding has no fallback.
pub struct RouteResolver {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

#[derive(Deserialize)]
struct DirectionsResponse {
    routes: Vec<Route>,
}

#[derive(Deserialize)]
struct Route {
    summary: RouteLeg,
}

#[derive(Deserialize)]
struct RouteLeg {
    distance: f64,
    duration: f64,
}

#[derive(Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    geometry: Geometry,
    properties: FeatureProperties,
}

#[derive(Deserialize)]
struct Geometry {
    /// Provider order is [lng, lat].
    coordinates: [f64; 2],
}

#[derive(Deserialize)]
struct FeatureProperties {
    label: Option<String>,
}

impl RouteResolver {
    pub fn new(api_key: Option<String>, base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("valid http client");

        Self {
            client,
            api_key,
            base_url,
        }
    }

    /// Best-effort road distance and duration between two points. Never
    /// fails: any provider problem falls back to the haversine estimate.
    pub async fn resolve(&self, start: &GeoPoint, end: &GeoPoint) -> (RouteSummary, RouteSource) {
        let Some(api_key) = &self.api_key else {
            return (fallback_route(start, end), RouteSource::Fallback);
        };

        match self.fetch_directions(api_key, start, end).await {
            Ok(summary) => (summary, RouteSource::Provider),
            Err(err) => {
                warn!(error = %err, "routing provider unavailable; using haversine fallback");
                (fallback_route(start, end), RouteSource::Fallback)
            }
        }
    }

    async fn fetch_directions(
        &self,
        api_key: &str,
        start: &GeoPoint,
        end: &GeoPoint,
    ) -> Result<RouteSummary, AppError> {
        let url = format!("{}/directions/driving-car", self.base_url);
        let body = serde_json::json!({
            "coordinates": [[start.lng, start.lat], [end.lng, end.lat]],
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| AppError::Upstream(format!("routing request failed: {err}")))?;

        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "routing provider returned {}",
                response.status()
            )));
        }

        let parsed: DirectionsResponse = response
            .json()
            .await
            .map_err(|err| AppError::Upstream(format!("malformed routing response: {err}")))?;

        let route = parsed
            .routes
            .first()
            .ok_or_else(|| AppError::Upstream("routing response had no routes".to_string()))?;

        Ok(RouteSummary {
            distance: route.summary.distance,
            duration: route.summary.duration,
            distance_km: crate::geo::round2(route.summary.distance / 1000.0),
        })
    }

    /// Resolve a street address to coordinates. Errors are surfaced rather
    /// than recovered: a misconfigured key is a deployment fault and an
    /// unreachable provider is retryable by the caller.
    pub async fn geocode(&self, address: &str) -> Result<Geocoded, AppError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            AppError::Misconfigured("routing provider API key not configured".to_string())
        })?;

        let url = format!("{}/geocode/search", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("api_key", api_key),
                ("text", address),
                ("boundary.country", GEOCODE_COUNTRY),
                ("size", "1"),
            ])
            .send()
            .await
            .map_err(|err| AppError::Upstream(format!("geocoding request failed: {err}")))?;

        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "geocoding provider returned {}",
                response.status()
            )));
        }

        let parsed: GeocodeResponse = response
            .json()
            .await
            .map_err(|err| AppError::Upstream(format!("malformed geocoding response: {err}")))?;

        let feature = parsed
            .features
            .first()
            .ok_or_else(|| AppError::NotFound(format!("address not found: {address}")))?;

        Ok(Geocoded {
            lat: feature.geometry.coordinates[1],
            lng: feature.geometry.coordinates[0],
            formatted: feature
                .properties
                .label
                .clone()
                .unwrap_or_else(|| address.to_string()),
        })
    }
}
