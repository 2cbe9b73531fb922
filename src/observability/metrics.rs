use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub delivery_transitions_total: IntCounterVec,
    pub accept_conflicts_total: IntCounter,
    pub route_fallbacks_total: IntCounter,
    pub pending_requests: IntGauge,
    pub parties_verified_total: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let delivery_transitions_total = IntCounterVec::new(
            Opts::new(
                "delivery_transitions_total",
                "Delivery request transitions by resulting status",
            ),
            &["status"],
        )
        .expect("valid delivery_transitions_total metric");

        let accept_conflicts_total = IntCounter::new(
            "accept_conflicts_total",
            "Acceptance attempts that lost the race for a pending request",
        )
        .expect("valid accept_conflicts_total metric");

        let route_fallbacks_total = IntCounter::new(
            "route_fallbacks_total",
            "Distance resolutions that fell back to the haversine estimate",
        )
        .expect("valid route_fallbacks_total metric");

        let pending_requests = IntGauge::new(
            "pending_requests",
            "Delivery requests currently awaiting a driver",
        )
        .expect("valid pending_requests metric");

        let parties_verified_total = IntCounterVec::new(
            Opts::new(
                "parties_verified_total",
                "Verification decisions by party type and outcome",
            ),
            &["party_type", "outcome"],
        )
        .expect("valid parties_verified_total metric");

        registry
            .register(Box::new(delivery_transitions_total.clone()))
            .expect("register delivery_transitions_total");
        registry
            .register(Box::new(accept_conflicts_total.clone()))
            .expect("register accept_conflicts_total");
        registry
            .register(Box::new(route_fallbacks_total.clone()))
            .expect("register route_fallbacks_total");
        registry
            .register(Box::new(pending_requests.clone()))
            .expect("register pending_requests");
        registry
            .register(Box::new(parties_verified_total.clone()))
            .expect("register parties_verified_total");

        Self {
            registry,
            delivery_transitions_total,
            accept_conflicts_total,
            route_fallbacks_total,
            pending_requests,
            parties_verified_total,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}
