use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::rest::admin::require_admin;
use crate::error::AppError;
use crate::lifecycle::{self, CancelActor};
use crate::models::request::{DeliveryRequest, DeliveryStatus};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/requests/pending", get(list_pending))
        .route("/requests/:id", get(get_request))
        .route("/requests/:id/accept", post(accept_request))
        .route("/requests/:id/pickup", post(pick_up_request))
        .route("/requests/:id/deliver", post(deliver_request))
        .route("/requests/:id/cancel", post(cancel_request))
}

async fn get_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeliveryRequest>, AppError> {
    let request = state
        .requests
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("request {id} not found")))?;

    Ok(Json(request.value().clone()))
}

/// Driver board: open requests, newest first.
async fn list_pending(State(state): State<Arc<AppState>>) -> Json<Vec<DeliveryRequest>> {
    let mut pending: Vec<DeliveryRequest> = state
        .requests
        .iter()
        .filter(|entry| entry.value().status == DeliveryStatus::Pending)
        .map(|entry| entry.value().clone())
        .collect();

    pending.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Json(pending)
}

#[derive(Deserialize)]
pub struct DriverActionRequest {
    pub driver_id: Uuid,
}

async fn accept_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<DriverActionRequest>,
) -> Result<Json<DeliveryRequest>, AppError> {
    let request = lifecycle::accept(&state, id, payload.driver_id)?;
    Ok(Json(request))
}

async fn pick_up_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<DriverActionRequest>,
) -> Result<Json<DeliveryRequest>, AppError> {
    let request = lifecycle::pick_up(&state, id, payload.driver_id)?;
    Ok(Json(request))
}

async fn deliver_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<DriverActionRequest>,
) -> Result<Json<DeliveryRequest>, AppError> {
    let request = lifecycle::deliver(&state, id, payload.driver_id)?;
    Ok(Json(request))
}

#[derive(Deserialize)]
#[serde(tag = "cancelled_by", rename_all = "snake_case")]
pub enum CancelRequestBody {
    Restaurant { restaurant_id: Uuid },
    Admin,
}

async fn cancel_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(payload): Json<CancelRequestBody>,
) -> Result<Json<DeliveryRequest>, AppError> {
    let actor = match payload {
        CancelRequestBody::Restaurant { restaurant_id } => CancelActor::Restaurant(restaurant_id),
        CancelRequestBody::Admin => {
            require_admin(&state, &headers)?;
            CancelActor::Admin
        }
    };

    let request = lifecycle::cancel(&state, id, actor)?;
    Ok(Json(request))
}
