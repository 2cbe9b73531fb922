use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::geo::round2;

// Per-delivery commission rates in PLN. The platform has shipped two policy
// revisions; both stay selectable until the legacy one is retired.
const V2_STANDARD: f64 = 2.00;
const V2_HIGH_VOLUME: f64 = 1.50;
const V1_RESTAURANT_STANDARD: f64 = 4.00;
const V1_RESTAURANT_HIGH_VOLUME: f64 = 3.00;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartyType {
    Restaurant,
    Driver,
}

/// Commission policy revision.
///
/// `V1FlatRestaurant` charged the restaurant only (4.00 standard, 3.00
/// high-volume). `V2Tiered` charges both parties symmetrically (2.00 / 1.50
/// each). Which revision is live is a deployment decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyVersion {
    V1FlatRestaurant,
    V2Tiered,
}

impl FromStr for PolicyVersion {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_ascii_lowercase().as_str() {
            "v1" => Ok(PolicyVersion::V1FlatRestaurant),
            "v2" => Ok(PolicyVersion::V2Tiered),
            other => Err(format!("unknown commission policy: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CostBreakdown {
    pub delivery_fee: f64,
    pub restaurant_commission: f64,
    pub driver_commission: f64,
    pub platform_commission: f64,
    pub total_cost: f64,
}

#[derive(Debug, Clone)]
pub struct PricingPolicy {
    pub version: PolicyVersion,
    pub base_fee: f64,
    pub per_km_rate: f64,
}

impl PricingPolicy {
    pub fn new(version: PolicyVersion, base_fee: f64, per_km_rate: f64) -> Self {
        Self {
            version,
            base_fee,
            per_km_rate,
        }
    }

    /// Per-delivery commission for one party. The tier is resolved purely
    /// from the high-volume flag; absent flag means standard rate.
    pub fn commission(&self, party: PartyType, is_high_volume: bool) -> f64 {
        match (self.version, party) {
            (PolicyVersion::V2Tiered, _) => {
                if is_high_volume {
                    V2_HIGH_VOLUME
                } else {
                    V2_STANDARD
                }
            }
            (PolicyVersion::V1FlatRestaurant, PartyType::Restaurant) => {
                if is_high_volume {
                    V1_RESTAURANT_HIGH_VOLUME
                } else {
                    V1_RESTAURANT_STANDARD
                }
            }
            (PolicyVersion::V1FlatRestaurant, PartyType::Driver) => 0.0,
        }
    }

    pub fn delivery_fee(&self, distance_km: f64) -> f64 {
        round2(self.base_fee + self.per_km_rate * distance_km)
    }

    /// Full cost breakdown for a delivery over `distance_km`. Tiers are
    /// resolved independently per party; `driver_high_volume` is `None`
    /// until a driver accepts, which prices the driver at the standard rate.
    pub fn quote(
        &self,
        distance_km: f64,
        restaurant_high_volume: bool,
        driver_high_volume: Option<bool>,
    ) -> CostBreakdown {
        let delivery_fee = self.delivery_fee(distance_km);
        let restaurant_commission = self.commission(PartyType::Restaurant, restaurant_high_volume);
        let driver_commission =
            self.commission(PartyType::Driver, driver_high_volume.unwrap_or(false));
        let platform_commission = round2(restaurant_commission + driver_commission);

        CostBreakdown {
            delivery_fee,
            restaurant_commission,
            driver_commission,
            platform_commission,
            total_cost: round2(delivery_fee + platform_commission),
        }
    }
}
