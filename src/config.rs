use std::env;

use crate::error::AppError;
use crate::pricing::PolicyVersion;

const DEFAULT_ROUTING_BASE_URL: &str = "https://api.openrouteservice.org/v2";

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub event_buffer_size: usize,
    /// Routing provider key; absence switches distance resolution to the
    /// haversine fallback and disables geocoding.
    pub routing_api_key: Option<String>,
    pub routing_base_url: String,
    pub admin_token: String,
    pub commission_policy: PolicyVersion,
    pub base_delivery_fee: f64,
    pub per_km_rate: f64,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        let commission_policy = env::var("COMMISSION_POLICY")
            .unwrap_or_else(|_| "v2".to_string())
            .parse::<PolicyVersion>()
            .map_err(AppError::Misconfigured)?;

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
            routing_api_key: env::var("ROUTING_API_KEY").ok().filter(|k| !k.is_empty()),
            routing_base_url: env::var("ROUTING_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_ROUTING_BASE_URL.to_string()),
            admin_token: env::var("ADMIN_TOKEN").unwrap_or_else(|_| "dev-admin-token".to_string()),
            commission_policy,
            base_delivery_fee: parse_or_default("BASE_DELIVERY_FEE", 5.00)?,
            per_km_rate: parse_or_default("PER_KM_RATE", 2.00)?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 3000,
            log_level: "info".to_string(),
            event_buffer_size: 1024,
            routing_api_key: None,
            routing_base_url: DEFAULT_ROUTING_BASE_URL.to_string(),
            admin_token: "dev-admin-token".to_string(),
            commission_policy: PolicyVersion::V2Tiered,
            base_delivery_fee: 5.00,
            per_km_rate: 2.00,
        }
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Misconfigured(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
