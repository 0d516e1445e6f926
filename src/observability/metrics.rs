use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub matches_total: IntCounterVec,
    pub ride_transitions_total: IntCounterVec,
    pub active_rides: IntGauge,
    pub match_distance_meters: Histogram,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let matches_total = IntCounterVec::new(
            Opts::new("matches_total", "Total ride match attempts by outcome"),
            &["outcome"],
        )
        .expect("valid matches_total metric");

        let ride_transitions_total = IntCounterVec::new(
            Opts::new(
                "ride_transitions_total",
                "Total ride state transitions by action",
            ),
            &["action"],
        )
        .expect("valid ride_transitions_total metric");

        let active_rides = IntGauge::new(
            "active_rides",
            "Rides currently in a non-terminal state",
        )
        .expect("valid active_rides metric");

        let match_distance_meters = Histogram::with_opts(
            HistogramOpts::new(
                "match_distance_meters",
                "Pickup distance of matched drivers in meters",
            )
            .buckets(vec![250.0, 500.0, 1000.0, 2000.0, 3000.0, 4000.0, 5000.0]),
        )
        .expect("valid match_distance_meters metric");

        registry
            .register(Box::new(matches_total.clone()))
            .expect("register matches_total");
        registry
            .register(Box::new(ride_transitions_total.clone()))
            .expect("register ride_transitions_total");
        registry
            .register(Box::new(active_rides.clone()))
            .expect("register active_rides");
        registry
            .register(Box::new(match_distance_meters.clone()))
            .expect("register match_distance_meters");

        Self {
            registry,
            matches_total,
            ride_transitions_total,
            active_rides,
            match_distance_meters,
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

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
