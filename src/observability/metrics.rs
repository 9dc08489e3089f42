use prometheus::{
    Encoder, HistogramVec, IntCounter, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder,
};

use crate::models::driver::RuntimeStatus;

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub reconciliations_total: IntCounterVec,
    pub reconcile_latency_seconds: HistogramVec,
    pub drivers_by_runtime_status: IntGaugeVec,
    pub notifications_total: IntCounterVec,
    pub map_refresh_ticks_total: IntCounter,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let reconciliations_total = IntCounterVec::new(
            Opts::new("reconciliations_total", "Driver status reconciliations by outcome"),
            &["outcome"],
        )
        .expect("valid reconciliations_total metric");

        let reconcile_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "reconcile_latency_seconds",
                "Latency of a full roster reconciliation in seconds",
            ),
            &["outcome"],
        )
        .expect("valid reconcile_latency_seconds metric");

        let drivers_by_runtime_status = IntGaugeVec::new(
            Opts::new(
                "drivers_by_runtime_status",
                "Drivers per runtime status after the last reconciliation",
            ),
            &["status"],
        )
        .expect("valid drivers_by_runtime_status metric");

        let notifications_total = IntCounterVec::new(
            Opts::new("notifications_total", "Console notifications by level"),
            &["level"],
        )
        .expect("valid notifications_total metric");

        let map_refresh_ticks_total =
            IntCounter::new("map_refresh_ticks_total", "Periodic map refresh ticks")
                .expect("valid map_refresh_ticks_total metric");

        registry
            .register(Box::new(reconciliations_total.clone()))
            .expect("register reconciliations_total");
        registry
            .register(Box::new(reconcile_latency_seconds.clone()))
            .expect("register reconcile_latency_seconds");
        registry
            .register(Box::new(drivers_by_runtime_status.clone()))
            .expect("register drivers_by_runtime_status");
        registry
            .register(Box::new(notifications_total.clone()))
            .expect("register notifications_total");
        registry
            .register(Box::new(map_refresh_ticks_total.clone()))
            .expect("register map_refresh_ticks_total");

        Self {
            registry,
            reconciliations_total,
            reconcile_latency_seconds,
            drivers_by_runtime_status,
            notifications_total,
            map_refresh_ticks_total,
        }
    }

    pub fn record_runtime_counts(&self, online: usize, offline: usize, booked: usize) {
        for (status, count) in [
            (RuntimeStatus::Online, online),
            (RuntimeStatus::Offline, offline),
            (RuntimeStatus::Booked, booked),
        ] {
            self.drivers_by_runtime_status
                .with_label_values(&[status.as_str()])
                .set(count as i64);
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
