use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::request::{DeliveryRequest, DeliveryStatus};

/// Change event published on every delivery request transition. Carries a
/// snapshot of the request so subscribers never have to re-read state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryEvent {
    pub request_id: Uuid,
    pub status: DeliveryStatus,
    pub request: DeliveryRequest,
    pub occurred_at: DateTime<Utc>,
}

impl DeliveryEvent {
    pub fn new(request: DeliveryRequest) -> Self {
        Self {
            request_id: request.id,
            status: request.status,
            occurred_at: Utc::now(),
            request,
        }
    }
}
