use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::GeoPoint;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum VerificationStatus {
    PendingVerification,
    Verified,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: Uuid,
    pub business_name: String,
    pub nip: String,
    pub address: String,
    pub location: Option<GeoPoint>,
    pub contact_person: String,
    pub iban: String,
    pub status: VerificationStatus,
    pub rejection_reason: Option<String>,
    pub is_high_volume: bool,
    pub monthly_delivery_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Driver {
    pub id: Uuid,
    pub name: String,
    pub pesel: String,
    pub vehicle_type: String,
    pub vehicle_plate: String,
    pub iban: String,
    pub status: VerificationStatus,
    pub rejection_reason: Option<String>,
    pub is_available: bool,
    pub is_high_volume: bool,
    pub monthly_delivery_count: u32,
    /// Delivery request currently held by this driver, if any. A driver may
    /// hold at most one active request at a time.
    pub active_request: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DocumentType {
    IdCard,
    DriversLicense,
}

/// Reference to an externally stored onboarding document. The file itself
/// lives in object storage; only the URL is kept here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationDocument {
    pub id: Uuid,
    pub driver_id: Uuid,
    pub document_type: DocumentType,
    pub file_url: String,
    pub uploaded_at: DateTime<Utc>,
}
