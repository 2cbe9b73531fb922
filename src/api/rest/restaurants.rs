use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::geo::{GeoPoint, RouteSource};
use crate::lifecycle::{self, NewDeliveryRequest};
use crate::models::party::{Restaurant, VerificationStatus};
use crate::models::request::DeliveryRequest;
use crate::state::AppState;
use crate::verification::{validate_iban, validate_nip};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/restaurants", post(create_restaurant))
        .route("/restaurants/:id", get(get_restaurant))
        .route("/restaurants/:id/quote", post(quote_delivery))
        .route("/restaurants/:id/requests", post(create_request))
}

#[derive(Deserialize)]
pub struct CreateRestaurantRequest {
    pub business_name: String,
    pub nip: String,
    pub address: String,
    pub location: Option<GeoPoint>,
    pub contact_person: String,
    pub iban: String,
}

async fn create_restaurant(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateRestaurantRequest>,
) -> Result<Json<Restaurant>, AppError> {
    if payload.business_name.trim().is_empty() {
        return Err(AppError::Validation(
            "business name cannot be empty".to_string(),
        ));
    }
    if payload.address.trim().is_empty() {
        return Err(AppError::Validation("address cannot be empty".to_string()));
    }

    let nip = validate_nip(&payload.nip)?;
    let iban = validate_iban(&payload.iban)?;

    let now = Utc::now();
    let restaurant = Restaurant {
        id: Uuid::new_v4(),
        business_name: payload.business_name,
        nip,
        address: payload.address,
        location: payload.location,
        contact_person: payload.contact_person,
        iban,
        status: VerificationStatus::PendingVerification,
        rejection_reason: None,
        is_high_volume: false,
        monthly_delivery_count: 0,
        created_at: now,
        updated_at: now,
    };

    state.restaurants.insert(restaurant.id, restaurant.clone());
    Ok(Json(restaurant))
}

async fn get_restaurant(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Restaurant>, AppError> {
    let restaurant = state
        .restaurants
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("restaurant {id} not found")))?;

    Ok(Json(restaurant.value().clone()))
}

#[derive(Deserialize)]
pub struct QuoteRequest {
    pub delivery: GeoPoint,
}

#[derive(Serialize)]
pub struct QuoteResponse {
    pub distance_km: f64,
    pub duration_seconds: f64,
    pub delivery_fee: f64,
    pub restaurant_commission: f64,
    pub driver_commission: f64,
    pub platform_commission: f64,
    pub total_cost: f64,
}

/// Cost estimate shown to the restaurant before it commits to a request.
/// The eventual request is re-priced at creation time with the same policy.
async fn quote_delivery(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<QuoteRequest>,
) -> Result<Json<QuoteResponse>, AppError> {
    let context = lifecycle::pickup_context(&state, id)?;

    let (route, source) = state
        .resolver
        .resolve(&context.pickup, &payload.delivery)
        .await;
    if source == RouteSource::Fallback {
        state.metrics.route_fallbacks_total.inc();
    }

    let costs = state
        .pricing
        .quote(route.distance_km, context.is_high_volume, None);

    Ok(Json(QuoteResponse {
        distance_km: route.distance_km,
        duration_seconds: route.duration,
        delivery_fee: costs.delivery_fee,
        restaurant_commission: costs.restaurant_commission,
        driver_commission: costs.driver_commission,
        platform_commission: costs.platform_commission,
        total_cost: costs.total_cost,
    }))
}

#[derive(Deserialize)]
pub struct CreateDeliveryRequestBody {
    pub delivery_address: String,
    pub delivery: GeoPoint,
    pub order_reference: Option<String>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub special_instructions: Option<String>,
}

async fn create_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateDeliveryRequestBody>,
) -> Result<Json<DeliveryRequest>, AppError> {
    let request = lifecycle::submit(
        &state,
        id,
        NewDeliveryRequest {
            delivery_address: payload.delivery_address,
            delivery: payload.delivery,
            order_reference: payload.order_reference,
            customer_name: payload.customer_name,
            customer_phone: payload.customer_phone,
            special_instructions: payload.special_instructions,
        },
    )
    .await?;

    Ok(Json(request))
}
