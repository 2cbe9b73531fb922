use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::geo::{GeoPoint, RouteSource};
use crate::models::event::DeliveryEvent;
use crate::models::party::VerificationStatus;
use crate::models::request::{DeliveryRequest, DeliveryStatus};
use crate::state::AppState;

/// Input for a new delivery request. The delivery address has already been
/// geocoded (via `POST /geocode`); the pickup side comes from the restaurant
/// record.
#[derive(Debug, Clone)]
pub struct NewDeliveryRequest {
    pub delivery_address: String,
    pub delivery: GeoPoint,
    pub order_reference: Option<String>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub special_instructions: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelActor {
    Restaurant(Uuid),
    Admin,
}

/// Pickup side of a delivery, taken from a restaurant that may originate
/// requests: verified, with a geocoded address.
#[derive(Debug, Clone)]
pub struct PickupContext {
    pub pickup_address: String,
    pub pickup: GeoPoint,
    pub is_high_volume: bool,
}

pub fn pickup_context(state: &AppState, restaurant_id: Uuid) -> Result<PickupContext, AppError> {
    let restaurant = state
        .restaurants
        .get(&restaurant_id)
        .ok_or_else(|| AppError::NotFound(format!("restaurant {restaurant_id} not found")))?;

    if restaurant.status != VerificationStatus::Verified {
        return Err(AppError::Forbidden(
            "restaurant is not verified".to_string(),
        ));
    }

    let pickup = restaurant.location.ok_or_else(|| {
        AppError::BadRequest("restaurant address has not been geocoded".to_string())
    })?;

    Ok(PickupContext {
        pickup_address: restaurant.address.clone(),
        pickup,
        is_high_volume: restaurant.is_high_volume,
    })
}

/// Create a `Pending` request on behalf of a verified restaurant: resolves
/// the route, prices the delivery, and announces it to subscribed drivers.
pub async fn submit(
    state: &AppState,
    restaurant_id: Uuid,
    input: NewDeliveryRequest,
) -> Result<DeliveryRequest, AppError> {
    if input.delivery_address.trim().is_empty() {
        return Err(AppError::Validation(
            "delivery address cannot be empty".to_string(),
        ));
    }

    let PickupContext {
        pickup_address,
        pickup,
        is_high_volume,
    } = pickup_context(state, restaurant_id)?;

    let (route, source) = state.resolver.resolve(&pickup, &input.delivery).await;
    if source == RouteSource::Fallback {
        state.metrics.route_fallbacks_total.inc();
    }

    let costs = state.pricing.quote(route.distance_km, is_high_volume, None);

    let now = Utc::now();
    let request = DeliveryRequest {
        id: Uuid::new_v4(),
        restaurant_id,
        driver_id: None,
        pickup_address,
        pickup,
        delivery_address: input.delivery_address,
        delivery: input.delivery,
        distance_km: route.distance_km,
        order_reference: input.order_reference,
        customer_name: input.customer_name,
        customer_phone: input.customer_phone,
        special_instructions: input.special_instructions,
        delivery_fee: costs.delivery_fee,
        restaurant_commission: costs.restaurant_commission,
        driver_commission: costs.driver_commission,
        platform_commission: costs.platform_commission,
        total_cost: costs.total_cost,
        status: DeliveryStatus::Pending,
        created_at: now,
        accepted_at: None,
        picked_up_at: None,
        delivered_at: None,
        cancelled_at: None,
        updated_at: now,
    };

    state.requests.insert(request.id, request.clone());
    state.metrics.pending_requests.inc();
    record_transition(state, &request);

    info!(
        request_id = %request.id,
        restaurant_id = %restaurant_id,
        distance_km = request.distance_km,
        total_cost = request.total_cost,
        "delivery request created"
    );

    Ok(request)
}

/// First-come-first-served acceptance, racing on two fronts: several drivers
/// may contend for one request, and one driver may fire accepts for several
/// requests. Both are settled by conditional updates under a map entry
/// guard. The driver claims its single `active_request` slot first; then the
/// request CAS succeeds only while the request is still `Pending` and
/// unassigned. A losing CAS rolls the claim back and reports a conflict.
pub fn accept(
    state: &AppState,
    request_id: Uuid,
    driver_id: Uuid,
) -> Result<DeliveryRequest, AppError> {
    claim_driver(state, request_id, driver_id)?;

    let snapshot = match assign_request(state, request_id, driver_id) {
        Ok(snapshot) => snapshot,
        Err(err) => {
            release_driver_claim(state, request_id, driver_id);
            return Err(err);
        }
    };

    state.metrics.pending_requests.dec();
    record_transition(state, &snapshot);

    info!(request_id = %request_id, driver_id = %driver_id, "delivery request accepted");

    Ok(snapshot)
}

/// Reserve the driver's single active slot under the driver entry guard, so
/// two same-driver accepts cannot both pass the "no active delivery" check.
fn claim_driver(state: &AppState, request_id: Uuid, driver_id: Uuid) -> Result<(), AppError> {
    let mut driver = state
        .drivers
        .get_mut(&driver_id)
        .ok_or_else(|| AppError::NotFound(format!("driver {driver_id} not found")))?;

    if driver.status != VerificationStatus::Verified {
        return Err(AppError::Forbidden("driver is not verified".to_string()));
    }
    if !driver.is_available {
        return Err(AppError::Forbidden(
            "driver is not marked available".to_string(),
        ));
    }
    if driver.active_request.is_some() {
        return Err(AppError::Conflict(
            "driver already has an active delivery".to_string(),
        ));
    }

    driver.active_request = Some(request_id);
    driver.updated_at = Utc::now();
    Ok(())
}

fn assign_request(
    state: &AppState,
    request_id: Uuid,
    driver_id: Uuid,
) -> Result<DeliveryRequest, AppError> {
    let mut request = state
        .requests
        .get_mut(&request_id)
        .ok_or_else(|| AppError::NotFound(format!("request {request_id} not found")))?;

    if request.status != DeliveryStatus::Pending || request.driver_id.is_some() {
        state.metrics.accept_conflicts_total.inc();
        return Err(AppError::Conflict("request already accepted".to_string()));
    }

    request.driver_id = Some(driver_id);
    request.status = DeliveryStatus::Accepted;
    request.accepted_at = Some(Utc::now());
    request.updated_at = Utc::now();
    Ok(request.clone())
}

fn release_driver_claim(state: &AppState, request_id: Uuid, driver_id: Uuid) {
    if let Some(mut driver) = state.drivers.get_mut(&driver_id) {
        if driver.active_request == Some(request_id) {
            driver.active_request = None;
            driver.updated_at = Utc::now();
        }
    }
}

pub fn pick_up(
    state: &AppState,
    request_id: Uuid,
    driver_id: Uuid,
) -> Result<DeliveryRequest, AppError> {
    let snapshot = {
        let mut request = state
            .requests
            .get_mut(&request_id)
            .ok_or_else(|| AppError::NotFound(format!("request {request_id} not found")))?;

        if request.status != DeliveryStatus::Accepted {
            return Err(AppError::Conflict(format!(
                "cannot pick up a {} request",
                request.status.as_label()
            )));
        }
        ensure_assigned(&request.driver_id, driver_id)?;

        request.status = DeliveryStatus::PickedUp;
        request.picked_up_at = Some(Utc::now());
        request.updated_at = Utc::now();
        request.clone()
    };

    record_transition(state, &snapshot);
    info!(request_id = %request_id, driver_id = %driver_id, "delivery picked up");

    Ok(snapshot)
}

/// Terminal success. Frees the driver and counts the delivery toward both
/// parties' monthly totals, which feed the high-volume commission tier.
pub fn deliver(
    state: &AppState,
    request_id: Uuid,
    driver_id: Uuid,
) -> Result<DeliveryRequest, AppError> {
    let snapshot = {
        let mut request = state
            .requests
            .get_mut(&request_id)
            .ok_or_else(|| AppError::NotFound(format!("request {request_id} not found")))?;

        if request.status != DeliveryStatus::PickedUp {
            return Err(AppError::Conflict(format!(
                "cannot deliver a {} request",
                request.status.as_label()
            )));
        }
        ensure_assigned(&request.driver_id, driver_id)?;

        request.status = DeliveryStatus::Delivered;
        request.delivered_at = Some(Utc::now());
        request.updated_at = Utc::now();
        request.clone()
    };

    if let Some(mut driver) = state.drivers.get_mut(&driver_id) {
        driver.active_request = None;
        driver.monthly_delivery_count += 1;
        driver.updated_at = Utc::now();
    }
    if let Some(mut restaurant) = state.restaurants.get_mut(&snapshot.restaurant_id) {
        restaurant.monthly_delivery_count += 1;
        restaurant.updated_at = Utc::now();
    }

    record_transition(state, &snapshot);
    info!(request_id = %request_id, driver_id = %driver_id, "delivery completed");

    Ok(snapshot)
}

/// Cancellation by the owning restaurant or an admin, allowed from `Pending`
/// or `Accepted`. An assigned driver is released.
pub fn cancel(
    state: &AppState,
    request_id: Uuid,
    actor: CancelActor,
) -> Result<DeliveryRequest, AppError> {
    let (snapshot, released_driver, was_pending) = {
        let mut request = state
            .requests
            .get_mut(&request_id)
            .ok_or_else(|| AppError::NotFound(format!("request {request_id} not found")))?;

        if let CancelActor::Restaurant(restaurant_id) = actor {
            if request.restaurant_id != restaurant_id {
                return Err(AppError::Forbidden(
                    "request belongs to another restaurant".to_string(),
                ));
            }
        }

        if !matches!(
            request.status,
            DeliveryStatus::Pending | DeliveryStatus::Accepted
        ) {
            return Err(AppError::Conflict(format!(
                "cannot cancel a {} request",
                request.status.as_label()
            )));
        }

        let was_pending = request.status == DeliveryStatus::Pending;
        let released_driver = request.driver_id.take();
        request.status = DeliveryStatus::Cancelled;
        request.cancelled_at = Some(Utc::now());
        request.updated_at = Utc::now();
        (request.clone(), released_driver, was_pending)
    };

    if let Some(driver_id) = released_driver {
        if let Some(mut driver) = state.drivers.get_mut(&driver_id) {
            driver.active_request = None;
            driver.updated_at = Utc::now();
        }
    }

    if was_pending {
        state.metrics.pending_requests.dec();
    }

    record_transition(state, &snapshot);
    info!(request_id = %request_id, "delivery request cancelled");

    Ok(snapshot)
}

fn ensure_assigned(assigned: &Option<Uuid>, driver_id: Uuid) -> Result<(), AppError> {
    if *assigned != Some(driver_id) {
        return Err(AppError::Forbidden(
            "request is assigned to another driver".to_string(),
        ));
    }
    Ok(())
}

fn record_transition(state: &AppState, request: &DeliveryRequest) {
    state
        .metrics
        .delivery_transitions_total
        .with_label_values(&[request.status.as_label()])
        .inc();
    state.publish(DeliveryEvent::new(request.clone()));
}
