use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::party::{
    DocumentType, Driver, VerificationDocument, VerificationStatus,
};
use crate::state::AppState;
use crate::verification::{validate_iban, validate_pesel};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/drivers", post(create_driver))
        .route("/drivers/:id", get(get_driver))
        .route("/drivers/:id/availability", patch(update_availability))
        .route("/drivers/:id/documents", post(add_document))
}

#[derive(Deserialize)]
pub struct CreateDriverRequest {
    pub name: String,
    pub pesel: String,
    pub vehicle_type: String,
    pub vehicle_plate: String,
    pub iban: String,
}

async fn create_driver(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateDriverRequest>,
) -> Result<Json<Driver>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::Validation("name cannot be empty".to_string()));
    }
    if payload.vehicle_type.trim().is_empty() {
        return Err(AppError::Validation(
            "vehicle type cannot be empty".to_string(),
        ));
    }

    let pesel = validate_pesel(&payload.pesel)?;
    let iban = validate_iban(&payload.iban)?;

    let now = Utc::now();
    let driver = Driver {
        id: Uuid::new_v4(),
        name: payload.name,
        pesel,
        vehicle_type: payload.vehicle_type,
        vehicle_plate: payload.vehicle_plate,
        iban,
        status: VerificationStatus::PendingVerification,
        rejection_reason: None,
        is_available: false,
        is_high_volume: false,
        monthly_delivery_count: 0,
        active_request: None,
        created_at: now,
        updated_at: now,
    };

    state.drivers.insert(driver.id, driver.clone());
    Ok(Json(driver))
}

async fn get_driver(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Driver>, AppError> {
    let driver = state
        .drivers
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("driver {id} not found")))?;

    Ok(Json(driver.value().clone()))
}

#[derive(Deserialize)]
pub struct UpdateAvailabilityRequest {
    pub is_available: bool,
}

async fn update_availability(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAvailabilityRequest>,
) -> Result<Json<Driver>, AppError> {
    let mut driver = state
        .drivers
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("driver {id} not found")))?;

    if driver.status != VerificationStatus::Verified {
        return Err(AppError::Forbidden("driver is not verified".to_string()));
    }

    driver.is_available = payload.is_available;
    driver.updated_at = Utc::now();

    Ok(Json(driver.clone()))
}

#[derive(Deserialize)]
pub struct AddDocumentRequest {
    pub document_type: DocumentType,
    pub file_url: String,
}

/// Attach an onboarding document reference. Files live in external storage;
/// only the URL is recorded for the admin to review.
async fn add_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddDocumentRequest>,
) -> Result<Json<VerificationDocument>, AppError> {
    if payload.file_url.trim().is_empty() {
        return Err(AppError::Validation("file url cannot be empty".to_string()));
    }

    if !state.drivers.contains_key(&id) {
        return Err(AppError::NotFound(format!("driver {id} not found")));
    }

    let document = VerificationDocument {
        id: Uuid::new_v4(),
        driver_id: id,
        document_type: payload.document_type,
        file_url: payload.file_url,
        uploaded_at: Utc::now(),
    };

    state
        .documents
        .entry(id)
        .or_default()
        .push(document.clone());

    Ok(Json(document))
}
