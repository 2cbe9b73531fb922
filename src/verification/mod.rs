use chrono::Utc;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::party::VerificationStatus;
use crate::state::AppState;

const NIP_WEIGHTS: [u32; 9] = [6, 5, 7, 2, 3, 4, 5, 6, 7];
const PESEL_WEIGHTS: [u32; 10] = [1, 3, 7, 9, 1, 3, 7, 9, 1, 3];

/// Polish tax identifier: 10 digits with a mod-11 checksum. Spaces and
/// dashes are tolerated on input.
pub fn validate_nip(raw: &str) -> Result<String, AppError> {
    let cleaned: String = raw.chars().filter(|c| *c != ' ' && *c != '-').collect();

    let digits = parse_digits(&cleaned, 10)
        .ok_or_else(|| AppError::Validation("NIP must be exactly 10 digits".to_string()))?;

    let sum: u32 = NIP_WEIGHTS
        .iter()
        .zip(&digits)
        .map(|(weight, digit)| weight * digit)
        .sum();

    if sum % 11 != digits[9] {
        return Err(AppError::Validation("NIP checksum is invalid".to_string()));
    }

    Ok(cleaned)
}

/// Polish national identity number: 11 digits with a weighted checksum.
pub fn validate_pesel(raw: &str) -> Result<String, AppError> {
    let digits = parse_digits(raw, 11)
        .ok_or_else(|| AppError::Validation("PESEL must be exactly 11 digits".to_string()))?;

    let sum: u32 = PESEL_WEIGHTS
        .iter()
        .zip(&digits)
        .map(|(weight, digit)| weight * digit)
        .sum();

    if (10 - sum % 10) % 10 != digits[10] {
        return Err(AppError::Validation("PESEL checksum is invalid".to_string()));
    }

    Ok(raw.to_string())
}

/// Polish IBAN: "PL" followed by 26 digits. Spaces are tolerated on input.
pub fn validate_iban(raw: &str) -> Result<String, AppError> {
    let cleaned: String = raw.chars().filter(|c| *c != ' ').collect();

    let digits_ok = cleaned.len() == 28
        && cleaned.starts_with("PL")
        && cleaned[2..].chars().all(|c| c.is_ascii_digit());

    if !digits_ok {
        return Err(AppError::Validation(
            "IBAN must be PL followed by 26 digits".to_string(),
        ));
    }

    Ok(cleaned)
}

fn parse_digits(raw: &str, expected_len: usize) -> Option<Vec<u32>> {
    if raw.len() != expected_len || !raw.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(raw.chars().filter_map(|c| c.to_digit(10)).collect())
}

#[derive(Debug, Clone, Copy)]
pub enum Decision {
    Approve,
    Reject,
}

/// Admin verification decision for a restaurant. Rejection stores the given
/// reason; there is no transition out of `Rejected`.
pub fn decide_restaurant(
    state: &AppState,
    restaurant_id: Uuid,
    decision: Decision,
    reason: Option<String>,
) -> Result<(), AppError> {
    let mut restaurant = state
        .restaurants
        .get_mut(&restaurant_id)
        .ok_or_else(|| AppError::NotFound(format!("restaurant {restaurant_id} not found")))?;
    let restaurant = &mut *restaurant;

    apply_decision(
        &mut restaurant.status,
        &mut restaurant.rejection_reason,
        decision,
        reason,
    )?;
    restaurant.updated_at = Utc::now();

    state
        .metrics
        .parties_verified_total
        .with_label_values(&["restaurant", outcome_label(decision)])
        .inc();

    tracing::info!(
        restaurant_id = %restaurant_id,
        outcome = outcome_label(decision),
        "restaurant verification decided"
    );

    Ok(())
}

pub fn decide_driver(
    state: &AppState,
    driver_id: Uuid,
    decision: Decision,
    reason: Option<String>,
) -> Result<(), AppError> {
    let mut driver = state
        .drivers
        .get_mut(&driver_id)
        .ok_or_else(|| AppError::NotFound(format!("driver {driver_id} not found")))?;
    let driver = &mut *driver;

    apply_decision(
        &mut driver.status,
        &mut driver.rejection_reason,
        decision,
        reason,
    )?;
    driver.updated_at = Utc::now();

    state
        .metrics
        .parties_verified_total
        .with_label_values(&["driver", outcome_label(decision)])
        .inc();

    tracing::info!(
        driver_id = %driver_id,
        outcome = outcome_label(decision),
        "driver verification decided"
    );

    Ok(())
}

fn apply_decision(
    status: &mut VerificationStatus,
    rejection_reason: &mut Option<String>,
    decision: Decision,
    reason: Option<String>,
) -> Result<(), AppError> {
    if *status == VerificationStatus::Rejected {
        // No resubmission path exists for rejected parties; the record
        // stays rejected until a product decision says otherwise.
        return Err(AppError::Conflict(
            "party has been rejected and cannot be re-verified".to_string(),
        ));
    }

    match decision {
        Decision::Approve => {
            *status = VerificationStatus::Verified;
            *rejection_reason = None;
        }
        Decision::Reject => {
            *status = VerificationStatus::Rejected;
            *rejection_reason = reason;
        }
    }

    Ok(())
}

fn outcome_label(decision: Decision) -> &'static str {
    match decision {
        Decision::Approve => "verified",
        Decision::Reject => "rejected",
    }
}
