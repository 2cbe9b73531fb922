use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::Json;
use axum::Router;
use serde::Deserialize;

use crate::error::AppError;
use crate::geo::routing::Geocoded;
use crate::geo::{GeoPoint, RouteSource, RouteSummary};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/geocode", post(geocode))
        .route("/calculate-distance", post(calculate_distance))
}

#[derive(Deserialize)]
pub struct GeocodeRequest {
    pub address: Option<String>,
}

async fn geocode(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<GeocodeRequest>,
) -> Result<Json<Geocoded>, AppError> {
    let address = payload
        .address
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .ok_or_else(|| AppError::BadRequest("address is required".to_string()))?;

    let geocoded = state.resolver.geocode(address).await?;
    Ok(Json(geocoded))
}

#[derive(Deserialize)]
pub struct CalculateDistanceRequest {
    pub start: Option<GeoPoint>,
    pub end: Option<GeoPoint>,
}

async fn calculate_distance(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CalculateDistanceRequest>,
) -> Result<Json<RouteSummary>, AppError> {
    let (Some(start), Some(end)) = (payload.start, payload.end) else {
        return Err(AppError::BadRequest(
            "start and end coordinates are required".to_string(),
        ));
    };

    let (summary, source) = state.resolver.resolve(&start, &end).await;
    if source == RouteSource::Fallback {
        state.metrics.route_fallbacks_total.inc();
    }

    Ok(Json(summary))
}
