use prometheus::{
    Encoder, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub assignments_total: IntCounterVec,
    pub assignment_latency_seconds: HistogramVec,
    pub delivery_transitions_total: IntCounterVec,
    pub drivers_on_shift: IntGauge,
    pub token_rejections_total: IntCounter,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let assignments_total = IntCounterVec::new(
            Opts::new("assignments_total", "Total auto-assignments by outcome"),
            &["outcome"],
        )
        .expect("valid assignments_total metric");

        let assignment_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "assignment_latency_seconds",
                "Latency of auto-assignment in seconds",
            ),
            &["outcome"],
        )
        .expect("valid assignment_latency_seconds metric");

        let delivery_transitions_total = IntCounterVec::new(
            Opts::new(
                "delivery_transitions_total",
                "Delivery lifecycle transitions by target status",
            ),
            &["status"],
        )
        .expect("valid delivery_transitions_total metric");

        let drivers_on_shift = IntGauge::new("drivers_on_shift", "Couriers with an open shift")
            .expect("valid drivers_on_shift metric");

        let token_rejections_total = IntCounter::new(
            "token_rejections_total",
            "Public requests rejected for an invalid delivery link",
        )
        .expect("valid token_rejections_total metric");

        registry
            .register(Box::new(assignments_total.clone()))
            .expect("register assignments_total");
        registry
            .register(Box::new(assignment_latency_seconds.clone()))
            .expect("register assignment_latency_seconds");
        registry
            .register(Box::new(delivery_transitions_total.clone()))
            .expect("register delivery_transitions_total");
        registry
            .register(Box::new(drivers_on_shift.clone()))
            .expect("register drivers_on_shift");
        registry
            .register(Box::new(token_rejections_total.clone()))
            .expect("register token_rejections_total");

        Self {
            registry,
            assignments_total,
            assignment_latency_seconds,
            delivery_transitions_total,
            drivers_on_shift,
            token_rejections_total,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
