use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::party::{
    Driver, Restaurant, VerificationDocument, VerificationStatus,
};
use crate::state::AppState;
use crate::verification::{self, Decision};

const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/verifications", get(list_verifications))
        .route("/admin/restaurants/:id/verify", post(verify_restaurant))
        .route("/admin/restaurants/:id/reject", post(reject_restaurant))
        .route("/admin/drivers/:id/verify", post(verify_driver))
        .route("/admin/drivers/:id/reject", post(reject_driver))
        .route(
            "/admin/restaurants/:id/commission",
            patch(update_restaurant_commission),
        )
        .route(
            "/admin/drivers/:id/commission",
            patch(update_driver_commission),
        )
}

/// The admin surface is gated by a deployment secret, not a user account.
/// Account-level authentication is delegated to the external auth provider.
pub fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<(), AppError> {
    let presented = headers
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    if !token_matches(presented.as_bytes(), state.admin_token.as_bytes()) {
        return Err(AppError::Unauthorized);
    }

    Ok(())
}

/// Compares the full token without early exit so the comparison time does
/// not leak how many leading bytes matched. Length still short-circuits.
fn token_matches(presented: &[u8], expected: &[u8]) -> bool {
    if presented.len() != expected.len() {
        return false;
    }

    presented
        .iter()
        .zip(expected)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

#[derive(Serialize)]
struct DriverVerification {
    driver: Driver,
    documents: Vec<VerificationDocument>,
}

#[derive(Serialize)]
struct VerificationsResponse {
    restaurants: Vec<Restaurant>,
    drivers: Vec<DriverVerification>,
}

async fn list_verifications(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<VerificationsResponse>, AppError> {
    require_admin(&state, &headers)?;

    let restaurants = state
        .restaurants
        .iter()
        .filter(|entry| entry.value().status == VerificationStatus::PendingVerification)
        .map(|entry| entry.value().clone())
        .collect();

    let drivers = state
        .drivers
        .iter()
        .filter(|entry| entry.value().status == VerificationStatus::PendingVerification)
        .map(|entry| {
            let driver = entry.value().clone();
            let documents = state
                .documents
                .get(&driver.id)
                .map(|docs| docs.value().clone())
                .unwrap_or_default();
            DriverVerification { driver, documents }
        })
        .collect();

    Ok(Json(VerificationsResponse {
        restaurants,
        drivers,
    }))
}

#[derive(Deserialize)]
pub struct RejectRequest {
    pub reason: Option<String>,
}

async fn verify_restaurant(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<Restaurant>, AppError> {
    require_admin(&state, &headers)?;
    verification::decide_restaurant(&state, id, Decision::Approve, None)?;
    restaurant_snapshot(&state, id)
}

async fn reject_restaurant(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(payload): Json<RejectRequest>,
) -> Result<Json<Restaurant>, AppError> {
    require_admin(&state, &headers)?;
    verification::decide_restaurant(&state, id, Decision::Reject, payload.reason)?;
    restaurant_snapshot(&state, id)
}

async fn verify_driver(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<Driver>, AppError> {
    require_admin(&state, &headers)?;
    verification::decide_driver(&state, id, Decision::Approve, None)?;
    driver_snapshot(&state, id)
}

async fn reject_driver(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(payload): Json<RejectRequest>,
) -> Result<Json<Driver>, AppError> {
    require_admin(&state, &headers)?;
    verification::decide_driver(&state, id, Decision::Reject, payload.reason)?;
    driver_snapshot(&state, id)
}

/// Manual tier management. The intended automatic promotion at 100
/// deliveries/month is not wired up yet; admins set the flag by hand.
#[derive(Deserialize)]
pub struct CommissionUpdateRequest {
    pub is_high_volume: Option<bool>,
    pub monthly_delivery_count: Option<u32>,
}

async fn update_restaurant_commission(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(payload): Json<CommissionUpdateRequest>,
) -> Result<Json<Restaurant>, AppError> {
    require_admin(&state, &headers)?;

    let mut restaurant = state
        .restaurants
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("restaurant {id} not found")))?;

    if let Some(flag) = payload.is_high_volume {
        restaurant.is_high_volume = flag;
    }
    if let Some(count) = payload.monthly_delivery_count {
        restaurant.monthly_delivery_count = count;
    }
    restaurant.updated_at = Utc::now();

    Ok(Json(restaurant.clone()))
}

async fn update_driver_commission(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(payload): Json<CommissionUpdateRequest>,
) -> Result<Json<Driver>, AppError> {
    require_admin(&state, &headers)?;

    let mut driver = state
        .drivers
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("driver {id} not found")))?;

    if let Some(flag) = payload.is_high_volume {
        driver.is_high_volume = flag;
    }
    if let Some(count) = payload.monthly_delivery_count {
        driver.monthly_delivery_count = count;
    }
    driver.updated_at = Utc::now();

    Ok(Json(driver.clone()))
}

fn restaurant_snapshot(state: &AppState, id: Uuid) -> Result<Json<Restaurant>, AppError> {
    let restaurant = state
        .restaurants
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("restaurant {id} not found")))?;
    Ok(Json(restaurant.value().clone()))
}

fn driver_snapshot(state: &AppState, id: Uuid) -> Result<Json<Driver>, AppError> {
    let driver = state
        .drivers
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("driver {id} not found")))?;
    Ok(Json(driver.value().clone()))
}
