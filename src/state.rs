use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::config::Config;
use crate::geo::RouteResolver;
use crate::models::event::DeliveryEvent;
use crate::models::party::{Driver, Restaurant, VerificationDocument};
use crate::models::request::DeliveryRequest;
use crate::observability::metrics::Metrics;
use crate::pricing::PricingPolicy;

pub struct AppState {
    pub restaurants: DashMap<Uuid, Restaurant>,
    pub drivers: DashMap<Uuid, Driver>,
    pub requests: DashMap<Uuid, DeliveryRequest>,
    /// Onboarding documents keyed by driver id.
    pub documents: DashMap<Uuid, Vec<VerificationDocument>>,
    pub delivery_events_tx: broadcast::Sender<DeliveryEvent>,
    pub pricing: PricingPolicy,
    pub resolver: RouteResolver,
    pub admin_token: String,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        let (delivery_events_tx, _unused_rx) = broadcast::channel(config.event_buffer_size);

        Self {
            restaurants: DashMap::new(),
            drivers: DashMap::new(),
            requests: DashMap::new(),
            documents: DashMap::new(),
            delivery_events_tx,
            pricing: PricingPolicy::new(
                config.commission_policy,
                config.base_delivery_fee,
                config.per_km_rate,
            ),
            resolver: RouteResolver::new(
                config.routing_api_key.clone(),
                config.routing_base_url.clone(),
            ),
            admin_token: config.admin_token.clone(),
            metrics: Metrics::new(),
        }
    }

    /// Publish a transition event; send errors just mean nobody is listening.
    pub fn publish(&self, event: DeliveryEvent) {
        let _ = self.delivery_events_tx.send(event);
    }
}
